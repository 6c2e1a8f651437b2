//! Error handling for the price adjuster
//!
//! This module defines error types and handling patterns used throughout the application.

pub mod types;

pub use types::{Error, FailureStage, Result};
