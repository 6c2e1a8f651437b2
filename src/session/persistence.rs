//! Durable session record
//!
//! The record keeps the identity cookies and an absolute expiry roughly one
//! cookie lifetime after creation. A cookies-only mirror is written next to
//! it for tools that expect a plain cookie file.

use crate::{
    Result,
    config::Settings,
    utils::fs::{remove_if_exists, write_atomic},
};
use chrono::{DateTime, Duration, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk shape of the session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Canonical cookie name → value
    pub cookies: BTreeMap<String, String>,
    /// Absolute expiry with the local UTC offset
    pub expires: DateTime<FixedOffset>,
    /// Last bearer token seen; informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// A fresh record read back from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    /// Cookies as stored, still to be normalized by the caller
    pub cookies: BTreeMap<String, String>,
    /// Record expiry
    pub expires: DateTime<FixedOffset>,
}

/// Reads and writes the session record and its cookie mirror
#[derive(Debug, Clone)]
pub struct SessionStore {
    session_file: PathBuf,
    cookies_file: PathBuf,
    lifetime: Duration,
}

impl SessionStore {
    /// Create a store over explicit paths
    pub fn new(session_file: impl Into<PathBuf>, cookies_file: impl Into<PathBuf>, lifetime: Duration) -> Self {
        Self {
            session_file: session_file.into(),
            cookies_file: cookies_file.into(),
            lifetime,
        }
    }

    /// Create a store from the session section of the settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.session_file_path(),
            settings.cookies_file_path(),
            Duration::days(settings.session.lifetime_days),
        )
    }

    /// Path of the structured record
    pub fn session_file(&self) -> &Path {
        &self.session_file
    }

    /// Path of the cookies-only mirror
    pub fn cookies_file(&self) -> &Path {
        &self.cookies_file
    }

    /// Write the record and the mirror
    ///
    /// `expires` keeps an existing record's expiry; `None` starts a new
    /// lifetime from now. Returns the expiry written.
    pub async fn save(
        &self,
        cookies: &BTreeMap<String, String>,
        access_token: Option<&str>,
        expires: Option<DateTime<FixedOffset>>,
    ) -> Result<DateTime<FixedOffset>> {
        let expires = expires.unwrap_or_else(|| Local::now().fixed_offset() + self.lifetime);
        let record = SessionRecord {
            cookies: cookies.clone(),
            expires,
            access_token: access_token.map(str::to_string),
        };

        write_atomic(&self.session_file, &serde_json::to_vec_pretty(&record)?).await?;
        write_atomic(&self.cookies_file, &serde_json::to_vec_pretty(cookies)?).await?;

        debug!("Session saved to {:?} (expires {})", self.session_file, expires.to_rfc3339());
        Ok(expires)
    }

    /// Read the record back
    ///
    /// Absent, unreadable, malformed and expired records all come back as
    /// `None`. The stored bearer token is never returned.
    pub async fn load(&self) -> Option<PersistedSession> {
        let raw = match tokio::fs::read(&self.session_file).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session record at {:?}", self.session_file);
                return None;
            }
            Err(e) => {
                warn!("Failed to read session record {:?}: {}", self.session_file, e);
                return None;
            }
        };

        let record: SessionRecord = match serde_json::from_slice(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring malformed session record {:?}: {}", self.session_file, e);
                return None;
            }
        };

        if record.expires <= Local::now().fixed_offset() {
            debug!("Session record expired at {}", record.expires.to_rfc3339());
            return None;
        }

        Some(PersistedSession {
            cookies: record.cookies,
            expires: record.expires,
        })
    }

    /// Delete the record and the mirror
    pub async fn clear(&self) -> Result<()> {
        remove_if_exists(&self.session_file).await?;
        remove_if_exists(&self.cookies_file).await?;
        Ok(())
    }
}
