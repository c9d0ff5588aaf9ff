//! Error types for vehdata-client
//!
//! Every registry adapter fails with [`ServiceError`], which always names the
//! originating registry. The facade adds VIN validation failures on top.

use crate::vin::VinError;
use thiserror::Error;

/// What went wrong talking to a registry
#[derive(Debug, Error)]
pub enum ServiceFailure {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// Error reported inside a nominally successful response body
    #[error("Registry error {code}: {message}")]
    Registry { code: String, message: String },

    #[error("Registry returned no results")]
    EmptyResult,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Failure of a single registry call
#[derive(Debug, Error)]
#[error("{service} request failed: {cause}")]
pub struct ServiceError {
    pub service: &'static str,
    #[source]
    pub cause: ServiceFailure,
    /// Whether a degraded response could be synthesized instead. Always false
    /// for now; nothing builds partial responses yet.
    pub fallback_available: bool,
}

impl ServiceError {
    pub fn new(service: &'static str, cause: ServiceFailure) -> Self {
        Self {
            service,
            cause,
            fallback_available: false,
        }
    }
}

/// Error returned by [`crate::VehicleDataClient`]
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] VinError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ClientError {
    /// Registry name when the failure came from a registry
    pub fn service(&self) -> Option<&'static str> {
        match self {
            ClientError::Validation(_) => None,
            ClientError::Service(e) => Some(e.service),
        }
    }
}

/// Result type for facade operations
pub type ClientResult<T> = Result<T, ClientError>;
