//! Hive sector relay server.
//!
//! Binary entry point. Loads configuration, connects the entity store,
//! starts the hub and the presence writer, and serves the HTTP and
//! `WebSocket` surface until Ctrl-C.

mod config;
mod error;

use std::sync::Arc;
use std::time::Duration;

use hive_api::{AppState, start_server};
use hive_db::{EntityStore, MemoryStore, PostgresConfig, PostgresStore};
use hive_relay::{Dispatcher, Hub, presence_channel, spawn_presence_writer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, HiveConfig, LoggingConfig, StoreBackend, StoreConfig};
use crate::error::ServerError;

/// How long shutdown waits for queued presence writes to drain.
const PRESENCE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Application entry point for the relay.
///
/// # Errors
///
/// Returns an error if configuration, the store, or the listener fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so failures surface
    //    through the returned error.
    let config = HiveConfig::load(|name| std::env::var(name).ok()).map_err(ServerError::from)?;

    // 2. Initialize tracing.
    init_tracing(&config.logging);
    info!("hive-server starting");
    info!(
        host = config.server.host,
        port = config.server.port,
        backend = ?config.store.backend,
        outbound_queue_capacity = config.relay.outbound_queue_capacity,
        "Configuration loaded"
    );

    // 3. Connect the entity store.
    let (store, postgres) = connect_store(&config.store).await?;

    // 4. Start the presence writer and the hub.
    let (presence_tx, presence_rx) = presence_channel();
    let presence_writer = spawn_presence_writer(Arc::clone(&store), presence_rx);
    let (hub, hub_task) = Hub::spawn(config.hub_config(), presence_tx.clone());
    info!("Hub started");

    // 5. Build shared state.
    let dispatcher = Dispatcher::new(store).with_presence(presence_tx);
    let state = Arc::new(
        AppState::new(dispatcher, hub.clone()).with_socket_config(config.socket_config()),
    );

    // 6. Serve until Ctrl-C.
    let served = start_server(&config.server_config(), state, shutdown_signal()).await;

    // 7. Tear down: dropping every connection records them offline before
    //    the presence queue drains.
    if let Err(e) = hub.shutdown().await {
        warn!(error = %e, "Hub already stopped");
    }
    drop(hub);
    if let Err(e) = hub_task.await {
        warn!(error = %e, "Hub task panicked");
    }
    match tokio::time::timeout(PRESENCE_DRAIN_TIMEOUT, presence_writer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Presence writer panicked"),
        Err(_elapsed) => warn!("Presence writer did not drain in time"),
    }
    if let Some(postgres) = postgres {
        postgres.close().await;
    }

    served.map_err(ServerError::from)?;
    info!("hive-server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Build the configured store. The `PostgreSQL` handle is returned
/// separately so its pool can be closed on shutdown.
async fn connect_store(
    config: &StoreConfig,
) -> Result<(Arc<dyn EntityStore>, Option<PostgresStore>), ServerError> {
    match (config.backend, config.url.as_deref()) {
        (StoreBackend::Postgres, Some(url)) => {
            let pg_config = PostgresConfig::new(url)
                .with_max_connections(config.max_connections)
                .with_connect_timeout(Duration::from_secs(config.connect_timeout_secs));
            let postgres = PostgresStore::connect(&pg_config).await?;
            postgres.run_migrations().await?;
            Ok((Arc::new(postgres.clone()), Some(postgres)))
        }
        (StoreBackend::Postgres, None) => Err(ServerError::Config {
            source: ConfigError::Invalid("postgres backend requires a url".to_owned()),
        }),
        (StoreBackend::Memory, _) => {
            info!("Using in-memory store; state is lost on restart");
            Ok((Arc::new(MemoryStore::new()), None))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
