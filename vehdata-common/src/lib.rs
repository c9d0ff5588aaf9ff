//! # vehdata common library
//!
//! Shared code for the vehdata crates:
//! - Error type used by storage and configuration
//! - TOML configuration model and root folder resolution
//! - SQLite initialisation for the durable cache tier

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
