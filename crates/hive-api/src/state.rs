//! Shared application state for the HTTP and `WebSocket` handlers.

use std::sync::Arc;
use std::time::Duration;

use hive_db::EntityStore;
use hive_relay::{Dispatcher, HubHandle};

/// Default largest inbound frame a sector may send.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 524_288;

/// Default interval between keep-alive pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Per-connection socket settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketConfig {
    /// Frames larger than this are rejected.
    pub max_message_bytes: usize,
    /// How often the write pump pings the sector.
    pub ping_interval: Duration,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            ping_interval: DEFAULT_PING_INTERVAL,
        }
    }
}

/// Everything a handler needs.
#[derive(Clone)]
pub struct AppState {
    /// Entity store for the management API.
    pub store: Arc<dyn EntityStore>,
    /// Applies inbound sector events.
    pub dispatcher: Dispatcher,
    /// Front end of the connection hub.
    pub hub: HubHandle,
    /// Socket settings.
    pub socket: SocketConfig,
}

impl AppState {
    /// Build state around a dispatcher and a running hub.
    pub fn new(dispatcher: Dispatcher, hub: HubHandle) -> Self {
        Self {
            store: Arc::clone(dispatcher.store()),
            dispatcher,
            hub,
            socket: SocketConfig::default(),
        }
    }

    /// Override the socket settings.
    #[must_use]
    pub const fn with_socket_config(mut self, socket: SocketConfig) -> Self {
        self.socket = socket;
        self
    }
}
