//! Storage and configuration errors
//!
//! Registry failures are not represented here; they belong to the client
//! crate's `ServiceError`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Cache database failure (wraps sqlx::Error)
    #[error("Cache database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder, config or log file access
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed config file or override
    #[error("Configuration error: {0}")]
    Config(String),
}
