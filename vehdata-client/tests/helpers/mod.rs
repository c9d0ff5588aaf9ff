//! Test Helper Utilities
//!
//! Shared utilities for testing vehdata-client

#![allow(dead_code)]

pub mod db_utils;
pub mod mock_registry;

pub use db_utils::{create_test_db, memory_store};
pub use mock_registry::{test_client, test_config, MockRegistry};
