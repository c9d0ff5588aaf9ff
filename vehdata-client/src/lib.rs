//! vehdata-client library interface
//!
//! Normalized, cached access to public vehicle registries: VIN decoding,
//! recalls, complaints, crash-test ratings and fuel economy.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod matching;
pub mod models;
pub mod sources;
pub mod vin;

pub use crate::client::VehicleDataClient;
pub use crate::config::ClientConfig;
pub use crate::error::{ClientError, ClientResult, ServiceError, ServiceFailure};
