//! Shared utilities for agent-rs
//!
//! This crate provides common functionality used across the agent-rs workspace:
//! tracing setup and its configuration.

pub mod config;
pub mod logging;

pub use config::LogConfig;
pub use logging::init_tracing_with;
