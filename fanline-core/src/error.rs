//! Error types for fanline-core

use thiserror::Error;

/// Main error type for the fanline-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation attempted before (or after a failed) initialize
    #[error("provider {0} is not initialized")]
    NotInitialized(String),

    /// Network or validation error surfaced by a vendor call
    #[error("vendor call failed: {0}")]
    Vendor(String),

    /// Authentication error
    #[error("authentication error: {0}")]
    Auth(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for fanline-core
pub type Result<T> = std::result::Result<T, Error>;
