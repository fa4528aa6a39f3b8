//! Core abstractions for agent-rs
//!
//! This crate defines the execution context and error types shared by the
//! pipeline engine and the domain crates.

pub mod context;
pub mod error;

pub use context::ExecContext;
pub use error::{Error, Result};
