//! # valvehub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the [`EventStore`](valvehub_app::ports::EventStore) port
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain events and database rows
//!
//! ## Dependency rule
//! Depends on `valvehub-app` (for port traits) and `valvehub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod error;
mod event_store;
mod pool;

pub use error::StorageError;
pub use event_store::SqliteEventStore;
pub use pool::{Config, Database};
