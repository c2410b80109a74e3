//! Catalog Fetcher Library
//!
//! A concurrent content-acquisition engine: discoverers register catalog
//! items in a durable job ledger, and a bounded worker pool downloads them
//! with per-host rate limiting, retries and size guards.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
