//! Identity cookie normalization and the active cookie jar
//!
//! The backend authenticates the user through a small set of long-lived
//! next-auth cookies. Browsers, exports and older session files spell those
//! names in several ways; everything is collapsed to the canonical spelling
//! before it reaches the jar.

use crate::{Error, Result};
use reqwest::header::{HeaderMap, SET_COOKIE};
use std::collections::{BTreeMap, HashMap};

/// Canonical name of the long-lived session cookie
pub const SESSION_TOKEN: &str = "__Secure-next-auth.session-token";

/// Canonical name of the CSRF cookie
pub const CSRF_TOKEN: &str = "__Host-next-auth.csrf-token";

/// Canonical name of the callback-url marker cookie
pub const CALLBACK_URL: &str = "__Secure-next-auth.callback-url";

/// Cookie the backend uses to carry the short-lived bearer token
pub const ACCESS_TOKEN: &str = "accessToken";

/// Canonical names and their accepted aliases, in lookup priority order
const IDENTITY_COOKIES: &[(&str, &[&str])] = &[
    (
        SESSION_TOKEN,
        &[
            "_Secure-next-auth.session-token",
            "Secure-next-auth.session-token",
            "next-auth.session-token",
        ],
    ),
    (
        CSRF_TOKEN,
        &[
            "_Host-next-auth.csrf-token",
            "Host-next-auth.csrf-token",
            "next-auth.csrf-token",
        ],
    ),
    (
        CALLBACK_URL,
        &[
            "_Secure-next-auth.callback-url",
            "Secure-next-auth.callback-url",
            "next-auth.callback-url",
        ],
    ),
];

/// Cookies the session tracks: identity cookies plus the bearer mirror
fn is_tracked(name: &str) -> bool {
    name == ACCESS_TOKEN || IDENTITY_COOKIES.iter().any(|(canonical, _)| *canonical == name)
}

/// Name → value map of the cookies attached to outgoing requests
///
/// Only canonical names are ever stored here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    entries: BTreeMap<String, String>,
}

impl CookieJar {
    /// Create an empty jar
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize an arbitrary raw mapping into a jar of canonical identity cookies
    ///
    /// For each canonical name the canonical key is looked up first, then each
    /// alias in order; the first non-empty hit wins. Values lose surrounding whitespace
    /// and one layer of wrapping quotes. Fails unless both the session and the
    /// CSRF cookie end up non-empty. A missing callback-url is filled in with
    /// `default_callback`.
    pub fn from_mapping(raw: &HashMap<String, String>, default_callback: &str) -> Result<Self> {
        let keyed: HashMap<String, &String> = raw
            .iter()
            .map(|(key, value)| (clean_value(key), value))
            .collect();

        let mut jar = Self::new();
        for (canonical, aliases) in IDENTITY_COOKIES {
            let found = std::iter::once(canonical)
                .chain(aliases.iter())
                .find_map(|name| {
                    keyed
                        .get(*name)
                        .map(|value| clean_value(value))
                        .filter(|value| !value.is_empty())
                });

            if let Some(value) = found {
                jar.set(*canonical, value);
            }
        }

        if !jar.contains(SESSION_TOKEN) {
            return Err(Error::invalid_cookies(format!("{} is missing or empty", SESSION_TOKEN)));
        }
        if !jar.contains(CSRF_TOKEN) {
            return Err(Error::invalid_cookies(format!("{} is missing or empty", CSRF_TOKEN)));
        }
        if !jar.contains(CALLBACK_URL) {
            jar.set(CALLBACK_URL, default_callback);
        }

        Ok(jar)
    }

    /// Whether the session and CSRF cookies are both present
    pub fn has_identity(&self) -> bool {
        self.contains(SESSION_TOKEN) && self.contains(CSRF_TOKEN)
    }

    /// Look up a cookie value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Whether a non-empty value is stored under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| !value.is_empty())
    }

    /// Insert or overwrite a cookie
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Remove a cookie, returning its previous value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    /// Drop every cookie
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cookies held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the jar is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Identity cookies only, without the bearer mirror
    pub fn identity(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter(|(name, _)| name.as_str() != ACCESS_TOKEN)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Render the jar as a `Cookie` request header value
    pub fn header_value(&self) -> Option<String> {
        render_cookie_header(self.iter())
    }

    /// `Cookie` header value carrying the identity cookies but not the bearer mirror
    pub fn identity_header_value(&self) -> Option<String> {
        render_cookie_header(self.iter().filter(|(name, _)| *name != ACCESS_TOKEN))
    }

    /// Apply backend-issued replacements for tracked cookies
    ///
    /// Returns the names that changed. Empty values (deletions) are ignored so
    /// a logout-style `Set-Cookie` never wipes the identity.
    pub fn absorb_set_cookies(&mut self, headers: &HeaderMap) -> Vec<String> {
        let mut changed = Vec::new();
        for header in headers.get_all(SET_COOKIE) {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            let Some((name, value)) = split_set_cookie(raw) else {
                continue;
            };
            if !is_tracked(name) || value.is_empty() {
                continue;
            }
            if self.get(name) != Some(value) {
                self.set(name, value);
                changed.push(name.to_string());
            }
        }
        changed
    }
}

impl From<CookieJar> for BTreeMap<String, String> {
    fn from(jar: CookieJar) -> Self {
        jar.entries
    }
}

fn render_cookie_header<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Option<String> {
    let pairs: Vec<String> = pairs
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    (!pairs.is_empty()).then(|| pairs.join("; "))
}

/// Trim whitespace and strip a single layer of matching quotes
pub fn clean_value(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|quote| {
            trimmed
                .strip_prefix(*quote)
                .and_then(|rest| rest.strip_suffix(*quote))
        })
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

/// Split a `Set-Cookie` value into its name and value
///
/// Everything after the first `;` is attribute noise.
fn split_set_cookie(raw: &str) -> Option<(&str, &str)> {
    let pair = raw.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    Some((name.trim(), value.trim()))
}

/// Extract the value of cookie `name` from any `Set-Cookie` header
pub fn set_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .filter_map(split_set_cookie)
        .find(|(cookie, value)| *cookie == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Parse a raw `Cookie` request header (`a=b; c=d`) into a mapping
pub fn parse_cookie_header(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}
