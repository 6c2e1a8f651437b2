//! Utility functions and helpers
//!
//! This module contains utility functions used throughout the application.

pub mod fs;
pub mod version;

pub use fs::write_atomic;
pub use version::get_version;
