//! Configuration management for the price adjuster
//!
//! This module handles loading and managing configuration settings
//! for the session subsystem, the marketplace client and the CLI.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::Settings;
