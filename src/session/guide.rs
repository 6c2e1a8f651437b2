//! Cookie extraction guide boundary
//!
//! The operator copies the identity cookies out of a logged-in browser. This
//! module turns whatever they hand over into a raw mapping, checks it, and
//! persists it through the [`SessionManager`].

use super::cookies::{CookieJar, parse_cookie_header};
use super::manager::SessionManager;
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// One entry of a browser cookie export
#[derive(Debug, Deserialize)]
struct ExportedCookie {
    name: String,
    value: String,
}

/// Glue between a user-supplied cookie dump and the session
#[derive(Debug, Clone, Copy)]
pub struct CookieGuide<'a> {
    manager: &'a SessionManager,
}

impl<'a> CookieGuide<'a> {
    /// Create a guide feeding `manager`
    pub fn new(manager: &'a SessionManager) -> Self {
        Self { manager }
    }

    /// Read a cookie dump from disk
    pub async fn read_cookie_file(path: &Path) -> Result<HashMap<String, String>> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse_cookie_input(&content)
    }

    /// Parse a cookie dump
    ///
    /// Accepted shapes: a JSON object of name → value, a JSON array of
    /// `{"name", "value"}` records as browser extensions export them, or a
    /// raw `Cookie` header (`a=b; c=d`, optionally prefixed with `Cookie:`).
    pub fn parse_cookie_input(input: &str) -> Result<HashMap<String, String>> {
        let trimmed = input.trim();
        let raw = match trimmed.chars().next() {
            Some('{') => {
                let object: serde_json::Map<String, Value> = serde_json::from_str(trimmed)?;
                object
                    .into_iter()
                    .map(|(name, value)| {
                        let value = match value {
                            Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (name, value)
                    })
                    .collect()
            }
            Some('[') => {
                let records: Vec<ExportedCookie> = serde_json::from_str(trimmed)?;
                records.into_iter().map(|c| (c.name, c.value)).collect()
            }
            _ => {
                let header = trimmed
                    .get(..7)
                    .filter(|prefix| prefix.eq_ignore_ascii_case("cookie:"))
                    .map_or(trimmed, |_| &trimmed[7..]);
                parse_cookie_header(header)
            }
        };

        if raw.is_empty() {
            return Err(Error::invalid_cookies("no cookies found in input"));
        }
        Ok(raw)
    }

    /// Whether `raw` normalizes into a usable identity
    pub fn validate(&self, raw: &HashMap<String, String>) -> bool {
        CookieJar::from_mapping(raw, &self.manager.default_callback()).is_ok()
    }

    /// Whether `raw` actually authenticates against the backend
    pub async fn test_session(&self, raw: &HashMap<String, String>) -> bool {
        match self.manager.probe_cookies(raw).await {
            Ok(acquired) => {
                info!("Cookies authenticate ({:?} strategy)", acquired.strategy);
                true
            }
            Err(e) => {
                warn!("Cookie check failed: {}", e);
                false
            }
        }
    }

    /// Load `raw` into the session and write a fresh durable record
    pub async fn persist(&self, raw: &HashMap<String, String>) -> Result<DateTime<FixedOffset>> {
        self.manager.load_from_cookie_mapping(raw).await?;
        self.manager.save().await
    }
}
