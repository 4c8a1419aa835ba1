//! Unified error handling for the client.

use crate::config::ConfigError;

/// Errors from the remote mirror.
///
/// Every variant means the same thing to the catalog service: the remote did
/// not confirm the change, so it is rolled back.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode remote response: {0}")]
    Decode(String),
}

/// Errors from the local persisted slot.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode catalog: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("local store is unavailable")]
    Unavailable,
}

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Engine(#[from] shelf_engine::Error),

    #[error("Remote error: {0}")]
    Mirror(#[from] MirrorError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
