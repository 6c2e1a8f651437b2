//! Tracing subscriber setup

use crate::config::settings::LoggingSettings;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set
pub fn default_directive(logging: &LoggingSettings, verbose: bool) -> String {
    if verbose || logging.verbose {
        "debug".to_string()
    } else {
        logging.level.clone()
    }
}

/// Install the global subscriber, logging to stderr
///
/// `RUST_LOG` wins over `--verbose`, which wins over the configured level.
pub fn init_logging(logging: &LoggingSettings, verbose: bool) {
    let directive = default_directive(logging, verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    // A subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
