//! Configuration loading and typed config structures for the relay.
//!
//! The configuration lives in `hive-config.yaml` (or the path named by
//! `HIVE_CONFIG`). Every section and field has a default, so a missing file
//! or a partial one is fine. A handful of environment variables override
//! the file:
//!
//! | Variable | Overrides |
//! |---|---|
//! | `DATABASE_URL` | `store.url`, and selects the `postgres` backend |
//! | `HIVE_HOST` | `server.host` |
//! | `HIVE_PORT` | `server.port` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use hive_api::{ServerConfig, SocketConfig};
use hive_relay::HubConfig;
use serde::Deserialize;

/// Config file used when `HIVE_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "hive-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {name}: {message}")]
    Env {
        /// The variable.
        name: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The configuration is internally inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HiveConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Entity store backend.
    #[serde(default)]
    pub store: StoreConfig,

    /// Hub and socket tuning.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HiveConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if it is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Resolve the config path, load it (or defaults if it does not exist),
    /// apply environment overrides and validate the result.
    ///
    /// `lookup` resolves an environment variable by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if loading, an override, or validation fails.
    pub fn load<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup("HIVE_CONFIG").map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `HIVE_PORT` is not a port number.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.store.url = Some(url);
            self.store.backend = StoreBackend::Postgres;
        }
        if let Some(host) = lookup("HIVE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("HIVE_PORT") {
            self.server.port = port.parse().map_err(|e| ConfigError::Env {
                name: "HIVE_PORT",
                message: format!("{port:?}: {e}"),
            })?;
        }
        Ok(())
    }

    /// Reject settings the relay cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Postgres && self.store.url.is_none() {
            return Err(ConfigError::Invalid(
                "store.backend is postgres but no store.url or DATABASE_URL is set".to_owned(),
            ));
        }
        for (name, value) in [
            ("relay.command_queue_capacity", self.relay.command_queue_capacity),
            ("relay.outbound_queue_capacity", self.relay.outbound_queue_capacity),
            ("relay.max_message_bytes", self.relay.max_message_bytes),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        if self.relay.ping_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "relay.ping_interval_secs must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Listener settings for the HTTP server.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
        }
    }

    /// Queue sizes for the hub.
    pub const fn hub_config(&self) -> HubConfig {
        HubConfig {
            command_queue_capacity: self.relay.command_queue_capacity,
            outbound_queue_capacity: self.relay.outbound_queue_capacity,
        }
    }

    /// Per-connection socket settings.
    pub const fn socket_config(&self) -> SocketConfig {
        SocketConfig {
            max_message_bytes: self.relay.max_message_bytes,
            ping_interval: Duration::from_secs(self.relay.ping_interval_secs),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which [`hive_db::EntityStore`] implementation to run with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Everything in process memory; lost on restart.
    #[default]
    Memory,
    /// `PostgreSQL` via `store.url`.
    Postgres,
}

/// Entity store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StoreBackend,

    /// `PostgreSQL` connection URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Maximum pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Pool acquire timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Hub and socket tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelayConfig {
    /// Capacity of the hub command queue.
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,

    /// Capacity of each connection's outbound queue. A sector that falls
    /// this far behind is disconnected.
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,

    /// Seconds between keep-alive pings.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Largest accepted inbound frame in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            command_queue_capacity: default_command_queue_capacity(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            ping_interval_secs: default_ping_interval_secs(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (trace, debug, info, warn,
    /// error, or a full directive).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

const fn default_command_queue_capacity() -> usize {
    hive_relay::hub::DEFAULT_COMMAND_QUEUE_CAPACITY
}

const fn default_outbound_queue_capacity() -> usize {
    hive_relay::hub::DEFAULT_OUTBOUND_QUEUE_CAPACITY
}

const fn default_ping_interval_secs() -> u64 {
    30
}

const fn default_max_message_bytes() -> usize {
    hive_api::state::DEFAULT_MAX_MESSAGE_BYTES
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = HiveConfig::parse("{}").unwrap();
        assert_eq!(config, HiveConfig::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.relay.command_queue_capacity, 512);
        config.validate().unwrap();
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = HiveConfig::parse(
            r"
server:
  port: 9000
relay:
  outbound_queue_capacity: 8
logging:
  json: true
",
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.relay.outbound_queue_capacity, 8);
        assert_eq!(config.relay.ping_interval_secs, 30);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn database_url_selects_postgres() {
        let mut config = HiveConfig::default();
        config
            .apply_env_overrides(env(&[
                ("DATABASE_URL", "postgresql://u:p@db/hive"),
                ("HIVE_PORT", "7777"),
            ]))
            .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.store.url.as_deref(), Some("postgresql://u:p@db/hive"));
        assert_eq!(config.server.port, 7777);
        config.validate().unwrap();
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut config = HiveConfig::default();
        let err = config
            .apply_env_overrides(env(&[("HIVE_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: "HIVE_PORT", .. }));
    }

    #[test]
    fn postgres_without_url_is_invalid() {
        let config = HiveConfig::parse("store:\n  backend: postgres\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let config = HiveConfig::parse("relay:\n  outbound_queue_capacity: 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config =
            HiveConfig::load(env(&[("HIVE_CONFIG", "/nonexistent/hive-config.yaml")])).unwrap();
        assert_eq!(config, HiveConfig::default());
    }
}
