//! Shared test utilities for integration, property and chaos tests.
//!
//! This module provides:
//! - Mock HistoryLog serving paged history and recording reads
//! - Mock ExecutionStore with a real CAS check and range ID fencing
//! - Static domain directory and shard helpers
//! - History event builders
#![allow(dead_code)]

pub mod history;
pub mod mock_domains;
pub mod mock_log;
pub mod mock_store;

pub use history::*;
pub use mock_domains::*;
pub use mock_log::*;
pub use mock_store::*;
