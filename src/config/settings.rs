//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the price adjuster.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory name used under the platform config dir
pub const APP_DIR_NAME: &str = "wallapop-auto-adjust";

/// Main configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Backend endpoint configuration
    pub backend: BackendSettings,
    /// HTTP client configuration
    pub network: NetworkSettings,
    /// Session persistence configuration
    pub session: SessionSettings,
    /// Price adjustment configuration
    pub pricing: PricingSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Backend hosts and the paths of each endpoint role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Web application origin (landing page, auth endpoints)
    pub web_url: String,
    /// REST API origin
    pub api_url: String,
    /// Application landing page used for warm-up
    pub landing_path: String,
    /// Session-check endpoint used for warm-up
    pub session_check_path: String,
    /// Session-exchange endpoint returning the bearer token
    pub exchange_path: String,
    /// "Current user" endpoint used by the nudge fallback
    pub current_user_path: String,
    /// Listing endpoint for the user's products
    pub items_path: String,
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// User agent sent with every request
    pub user_agent: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Directory holding the session record and cookie mirror
    pub dir: PathBuf,
    /// Structured session record file name
    pub session_file: String,
    /// Flattened cookie mirror file name
    pub cookies_file: String,
    /// Identity cookie lifetime in days
    pub lifetime_days: i64,
}

/// Price adjustment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    /// Product configuration file; relative paths resolve against the session dir
    pub products_file: PathBuf,
    /// Currency used for price updates
    pub currency: String,
    /// Lowest price an adjustment may produce
    pub minimum_price: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            network: NetworkSettings::default(),
            session: SessionSettings::default(),
            pricing: PricingSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            web_url: "https://es.wallapop.com".to_string(),
            api_url: "https://api.wallapop.com".to_string(),
            landing_path: "/app/chat".to_string(),
            session_check_path: "/api/auth/session".to_string(),
            exchange_path: "/api/auth/federated-session".to_string(),
            current_user_path: "/api/v3/users/me".to_string(),
            items_path: "/api/v3/user/items".to_string(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36"
                .to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            session_file: "session_data.json".to_string(),
            cookies_file: "cookies.json".to_string(),
            lifetime_days: 30,
        }
    }
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            products_file: PathBuf::from("products_config.json"),
            currency: "EUR".to_string(),
            minimum_price: 1.0,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
        }
    }
}

/// Platform config directory for the application, falling back to `.session`
fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".session"))
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| crate::Error::config(format!("Invalid config file {:?}: {}", path, e)))
    }

    /// Apply environment variable overrides
    pub fn merge_with_env(self) -> crate::Result<Self> {
        self.merge_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn merge_with<F>(mut self, lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(web_url) = lookup("WALLAPOP_WEB_URL") {
            self.backend.web_url = web_url;
        }

        if let Some(api_url) = lookup("WALLAPOP_API_URL") {
            self.backend.api_url = api_url;
        }

        if let Some(dir) = lookup("WALLAPOP_SESSION_DIR") {
            self.session.dir = PathBuf::from(dir);
        }

        if let Some(products_file) = lookup("WALLAPOP_PRODUCTS_FILE") {
            self.pricing.products_file = PathBuf::from(products_file);
        }

        if let Some(timeout) = lookup("WALLAPOP_TIMEOUT_SECS") {
            self.network.timeout_secs = timeout
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid timeout: {}", e)))?;
        }

        if let Some(level) = lookup("WALLAPOP_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Validate the final configuration
    pub fn validate(&self) -> crate::Result<()> {
        for (name, value) in [
            ("backend.web_url", &self.backend.web_url),
            ("backend.api_url", &self.backend.api_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| crate::Error::config(format!("Invalid {}: {} ({})", name, value, e)))?;
        }

        if self.network.timeout_secs == 0 {
            return Err(crate::Error::config("network.timeout_secs must be positive"));
        }

        if self.session.lifetime_days <= 0 {
            return Err(crate::Error::config("session.lifetime_days must be positive"));
        }

        if self.pricing.minimum_price <= 0.0 {
            return Err(crate::Error::config("pricing.minimum_price must be positive"));
        }

        Ok(())
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout_secs)
    }

    /// Full path of the structured session record
    pub fn session_file_path(&self) -> PathBuf {
        self.session.dir.join(&self.session.session_file)
    }

    /// Full path of the flattened cookie mirror
    pub fn cookies_file_path(&self) -> PathBuf {
        self.session.dir.join(&self.session.cookies_file)
    }

    /// Full path of the product configuration file
    pub fn products_file_path(&self) -> PathBuf {
        if self.pricing.products_file.is_absolute() {
            self.pricing.products_file.clone()
        } else {
            self.session.dir.join(&self.pricing.products_file)
        }
    }
}
