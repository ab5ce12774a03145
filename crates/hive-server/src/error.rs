//! Error types for the relay server binary.

use crate::config::ConfigError;

/// Fatal errors that stop the relay during startup or while serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The entity store could not be reached or migrated.
    #[error("store error: {source}")]
    Store {
        /// The underlying database error.
        #[from]
        source: hive_db::DbError,
    },

    /// The HTTP listener failed.
    #[error("http error: {source}")]
    Http {
        /// The underlying server error.
        #[from]
        source: hive_api::ServerError,
    },
}
