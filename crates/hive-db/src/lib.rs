//! Data layer for the sector event relay.
//!
//! Defines the [`EntityStore`] contract the relay and the HTTP surface are
//! written against, and two implementations of it:
//!
//! - [`MemoryStore`]: ordered maps behind a `tokio` lock, for local runs and
//!   tests.
//! - [`PostgresStore`]: a [`sqlx`] connection pool over the schema in
//!   `migrations/`.

pub mod error;
pub mod faction_store;
pub mod hive_store;
mod mapping;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::DbError;
pub use faction_store::FactionStore;
pub use hive_store::HiveStore;
pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresStore};
pub use store::EntityStore;
