//! Version information

/// Crate version as recorded at build time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Human-readable version string
pub fn get_version() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), VERSION)
}
