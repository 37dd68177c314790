//! Common utilities used across the evmc connector crates.
//!
//! This crate provides small shared helpers: hexadecimal encoding used when displaying
//! addresses and words, environment lookups, and file helpers used by the configuration layer.

/// General utility functions and types for common tasks.
pub mod utils;
