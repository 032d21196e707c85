//! Command implementations for the CLI
//!
//! - start: Start the console server
//! - test: Test configuration validity and optionally AWS access
//! - config: Configuration display and validation

pub mod config;
pub mod start;
