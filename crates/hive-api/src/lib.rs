//! HTTP surface of the hive relay.
//!
//! Serves the management API for hives, sectors and factions, and the
//! `WebSocket` endpoint every sector connects to.
//!
//! # Modules
//!
//! - [`error`] -- error types with HTTP response mapping
//! - [`handlers`] -- REST endpoint handlers
//! - [`router`] -- Axum router construction
//! - [`server`] -- server startup and shutdown
//! - [`state`] -- shared application state
//! - [`ws`] -- sector `WebSocket` adapter

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, SocketConfig};
