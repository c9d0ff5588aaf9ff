//! Durable cache database

pub mod init;

pub use init::*;
