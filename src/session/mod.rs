//! Session persistence and bearer token recovery
//!
//! This module normalizes the long-lived identity cookies, exchanges them for
//! short-lived bearer tokens through a cascade of fallback strategies, wraps
//! API calls with a single re-authentication on 401, and persists the session
//! across process runs.

pub mod cascade;
pub mod cookies;
pub mod guide;
pub mod manager;
pub mod network;
pub mod persistence;

pub use cascade::{AcquiredToken, CascadePlan, Extraction, Strategy, TokenCascade, WarmUp};
pub use cookies::CookieJar;
pub use guide::CookieGuide;
pub use manager::{SessionManager, SessionStatus};
pub use network::RequestOptions;
pub use persistence::{SessionRecord, SessionStore};
