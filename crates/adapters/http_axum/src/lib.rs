//! # valvehub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the **WebSocket observer endpoint** (`/ws`): push `init` on
//!   connect and `update` on every valve change, accept `toggle`,
//!   `startAuto` and `stopAuto` commands
//! - Serve a **JSON REST API** for scripts (`/api/valves`, `/api/auto`,
//!   `/api/commands`, `/api/events`, …) and an SSE event stream
//! - Optionally serve the static control page
//! - Map application results into HTTP responses
//! - Serve with graceful shutdown: stop auto-control, close long-lived
//!   responses, bound the drain
//!
//! ## Dependency rule
//! Depends on `valvehub-app` (for port traits and services) and `valvehub-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

#[cfg(test)]
pub(crate) mod testing;
