//! CLI tool for the ketama node locator.
//!
//! Provides commands for:
//! - Locating the primary node of keys
//! - Printing a key's failover sequence
//! - Inspecting ring balance
//! - Replaying control-event scripts, including migrations

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
