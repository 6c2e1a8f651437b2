//! Error type definitions
//!
//! Defines the main error types used throughout the session and pricing layers.

use thiserror::Error;

/// Main error type for the price adjuster
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Identity cookies missing or empty after normalization
    #[error("Invalid identity cookies: {reason}")]
    InvalidCookies { reason: String },

    /// A token acquisition was attempted without usable identity cookies
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    /// Every cascade strategy ran without yielding a bearer token
    #[error("Bearer token unavailable after trying: {attempted}")]
    TokenUnavailable { attempted: String },

    /// The backend kept rejecting the credential after one refresh
    #[error("Authentication expired for {url}")]
    AuthenticationExpired { url: String },

    /// Non-authentication API failures
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Product configuration store errors
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Network/HTTP client errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Date/time parsing errors
    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Which part of the authentication pipeline an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The identity cookies themselves are unusable
    CookieValidation,
    /// Cookies were fine but no bearer token could be obtained
    TokenAcquisition,
    /// A bearer token was obtained but the API keeps rejecting it
    Authorization,
    /// Anything unrelated to authentication
    Other,
}

impl FailureStage {
    /// Operator-facing advice for this stage
    pub fn hint(&self) -> &'static str {
        match self {
            Self::CookieValidation => {
                "cookie validation failed; extract the browser cookies again with `login`"
            }
            Self::TokenAcquisition => {
                "token acquisition failed; retry later or re-run `login` if it persists"
            }
            Self::Authorization => {
                "the API rejected the refreshed token; re-run `login` to capture a fresh session"
            }
            Self::Other => "unexpected failure; re-run with --verbose for details",
        }
    }
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CookieValidation => "cookie validation",
            Self::TokenAcquisition => "token acquisition",
            Self::Authorization => "authorization",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid cookies error
    pub fn invalid_cookies(reason: impl Into<String>) -> Self {
        Self::InvalidCookies {
            reason: reason.into(),
        }
    }

    /// Create an unauthenticated error
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    /// Create a token unavailable error
    pub fn token_unavailable(attempted: impl Into<String>) -> Self {
        Self::TokenUnavailable {
            attempted: attempted.into(),
        }
    }

    /// Create an authentication expired error
    pub fn authentication_expired(url: impl Into<String>) -> Self {
        Self::AuthenticationExpired { url: url.into() }
    }

    /// Create an API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error for operator-facing reporting
    pub fn stage(&self) -> FailureStage {
        match self {
            Self::InvalidCookies { .. } | Self::Unauthenticated(_) => FailureStage::CookieValidation,
            Self::TokenUnavailable { .. } => FailureStage::TokenAcquisition,
            Self::AuthenticationExpired { .. } => FailureStage::Authorization,
            _ => FailureStage::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test config error");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "Configuration error: test config error");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_invalid_cookies_error() {
        let err = Error::invalid_cookies("missing CSRF token");
        assert!(matches!(err, Error::InvalidCookies { .. }));
        assert!(err.to_string().contains("missing CSRF token"));
        assert_eq!(err.stage(), FailureStage::CookieValidation);
    }

    #[test]
    fn test_token_unavailable_error() {
        let err = Error::token_unavailable("exchange, query, nudge");
        assert!(err.to_string().contains("exchange, query, nudge"));
        assert_eq!(err.stage(), FailureStage::TokenAcquisition);
    }

    #[test]
    fn test_authentication_expired_error() {
        let err = Error::authentication_expired("https://api.example.com/items");
        assert!(err.to_string().contains("https://api.example.com/items"));
        assert_eq!(err.stage(), FailureStage::Authorization);
    }

    #[test]
    fn test_unauthenticated_maps_to_cookie_stage() {
        let err = Error::unauthenticated("no identity cookies loaded");
        assert_eq!(err.stage(), FailureStage::CookieValidation);
        assert!(err.stage().hint().contains("login"));
    }

    #[test]
    fn test_other_errors_have_generic_stage() {
        let err = Error::api(500, "boom");
        assert_eq!(err.stage(), FailureStage::Other);
        assert_eq!(err.to_string(), "API error (HTTP 500): boom");
    }

    #[test]
    fn test_date_parse_error() {
        let date_err = chrono::DateTime::parse_from_rfc3339("invalid date");
        assert!(date_err.is_err());

        let err: Error = date_err.unwrap_err().into();
        assert!(matches!(err, Error::DateParse(_)));
    }
}
