//! # valvehub-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `ValveDriver` — pushes the relay image to hardware
//!   - `EventStore` — append & query events
//!   - `EventPublisher` — fan events out to observers
//! - Define **driving/inbound** use-cases:
//!   - `ValveService` — the valve registry
//!   - `AutoControl` — the auto-control timer
//!   - `CommandDispatcher` — validates and applies client commands
//! - Provide **in-process infrastructure** (event bus, event recorder) that
//!   doesn't need IO
//!
//! ## Dependency rule
//! Depends on `valvehub-domain` only (plus `tokio` for locks, timers, tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod auto_control;
pub mod dispatcher;
pub mod event_bus;
pub mod event_recorder;
pub mod ports;
pub mod services;
