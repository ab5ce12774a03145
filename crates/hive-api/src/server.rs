//! Listener lifecycle for the relay.
//!
//! [`start_server`] serves the HTTP routes and the sector sockets until its
//! shutdown future resolves. It only stops accepting: upgraded sector
//! sockets outlive it. The caller then shuts the hub down, which closes
//! every outbound queue and records each sector `Offline`, and lets the
//! presence queue drain before closing the store.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Where the relay listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0`.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl ServerConfig {
    /// The socket address sectors and operators connect to.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if `host` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ServerError::Bind(format!("invalid address {}: {e}", self.host)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

/// Accept relay traffic until `shutdown` resolves.
///
/// Hub shutdown and presence draining are left to the caller, since live
/// sector sockets are still registered when this returns.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or accepting fails.
pub async fn start_server<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "Relay listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("Relay stopped accepting connections");
    Ok(())
}

/// Listener failures.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The address was invalid or could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// Accepting connections failed.
    #[error("serve error: {0}")]
    Serve(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_listens_on_all_interfaces() {
        let addr = ServerConfig::default().socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn hostname_is_rejected() {
        let config = ServerConfig {
            host: String::from("relay.local"),
            port: 9000,
        };
        assert!(matches!(config.socket_addr(), Err(ServerError::Bind(_))));
    }
}
