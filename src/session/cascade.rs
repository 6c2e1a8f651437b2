//! Bearer token acquisition cascade
//!
//! The backend hands out its short-lived bearer token through whichever
//! channel it feels like: a JSON body field, a `Set-Cookie` header, an echo
//! of a query parameter, or only as a side effect of an unrelated call. The
//! cascade walks those channels in a fixed order:
//!
//! 1. warm-up: landing page and session check, responses ignored
//! 2. direct exchange with a cache-busting query value and `If-None-Match`
//! 3. the same exchange with the session token echoed as `?token=`
//! 4. a nudge call to the current-user endpoint, watching `Set-Cookie`
//!
//! Warm-up always precedes the first exchange; the backend ties session
//! context to request order. Each strategy runs at most once per invocation.

use super::cookies::{ACCESS_TOKEN, CookieJar, SESSION_TOKEN, set_cookie_value};
use super::network::{ProbeResponse, join_url};
use crate::{Error, Result, config::settings::BackendSettings};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, IF_NONE_MATCH};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, info, warn};

/// Where in a response a token can be found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// JSON body field holding the token, or an object with a nested `accessToken`
    BodyField(&'static str),
    /// `Set-Cookie` header for the named cookie
    SetCookie(&'static str),
}

impl Extraction {
    /// Pull a non-empty token out of `response`, if this channel carries one
    pub fn extract(&self, response: &ProbeResponse) -> Option<String> {
        match self {
            Self::BodyField(field) => {
                let value = response.body.as_ref()?.get(*field)?;
                let token = match value {
                    Value::String(token) => Some(token.as_str()),
                    Value::Object(nested) => nested.get("accessToken").and_then(Value::as_str),
                    _ => None,
                }?;
                let token = token.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Self::SetCookie(name) => set_cookie_value(&response.headers, name),
        }
    }
}

const EXCHANGE_EXTRACTORS: &[Extraction] = &[
    Extraction::BodyField("token"),
    Extraction::BodyField("accessToken"),
    Extraction::SetCookie(ACCESS_TOKEN),
];

const QUERY_EXTRACTORS: &[Extraction] = &[
    Extraction::BodyField("token"),
    Extraction::BodyField("accessToken"),
];

const NUDGE_EXTRACTORS: &[Extraction] = &[Extraction::SetCookie(ACCESS_TOKEN)];

/// Token-producing strategies, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Plain call to the session-exchange endpoint
    Exchange,
    /// Session-exchange call with the session token as `?token=`
    QueryFallback,
    /// Current-user call that may set the bearer cookie
    Nudge,
}

impl Strategy {
    fn extractors(&self) -> &'static [Extraction] {
        match self {
            Self::Exchange => EXCHANGE_EXTRACTORS,
            Self::QueryFallback => QUERY_EXTRACTORS,
            Self::Nudge => NUDGE_EXTRACTORS,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Exchange => "exchange",
            Self::QueryFallback => "query-parameter",
            Self::Nudge => "nudge",
        }
    }
}

/// How much of the cascade to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadePlan {
    /// Every strategy
    Full,
    /// Warm-up and the direct exchange only, for quick cookie checks
    Probe,
}

impl CascadePlan {
    fn strategies(&self) -> &'static [Strategy] {
        match self {
            Self::Full => &[Strategy::Exchange, Strategy::QueryFallback, Strategy::Nudge],
            Self::Probe => &[Strategy::Exchange],
        }
    }
}

/// Outcome of a warm-up call; none of these abort the cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarmUp {
    /// 2xx/3xx response
    Completed(StatusCode),
    /// 4xx/5xx response
    Rejected(StatusCode),
    /// Transport-level failure
    Unreachable(String),
}

/// Outcome of one token strategy
#[derive(Debug)]
enum Attempt {
    Token(String, Extraction),
    Empty(StatusCode),
    Failed(String),
}

/// A token produced by the cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredToken {
    /// Bearer token value
    pub value: String,
    /// Strategy that produced it
    pub strategy: Strategy,
    /// Channel it arrived through
    pub via: Extraction,
    /// Expiry decoded from the token's `exp` claim, when it is a JWT
    pub expires_at: Option<DateTime<Utc>>,
}

/// Distinct cache-busting values, never repeating within a process
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: AtomicI64,
}

impl CacheBuster {
    /// Create a new cache buster
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time in milliseconds, bumped past the previous value if needed
    pub fn next(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(previous + 1);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => previous = actual,
            }
        }
    }
}

/// One run of the token acquisition strategies against a cookie jar
#[derive(Debug)]
pub struct TokenCascade<'a> {
    client: &'a Client,
    backend: &'a BackendSettings,
    cache_buster: &'a CacheBuster,
}

impl<'a> TokenCascade<'a> {
    /// Create a cascade over the given client and endpoints
    pub fn new(client: &'a Client, backend: &'a BackendSettings, cache_buster: &'a CacheBuster) -> Self {
        Self {
            client,
            backend,
            cache_buster,
        }
    }

    /// Obtain a bearer token using only the identity cookies in `jar`
    ///
    /// On success the token is mirrored into the jar under the bearer-cookie
    /// name, whichever channel it came through. `Set-Cookie` replacements of
    /// identity cookies seen along the way are applied to the jar.
    pub async fn run(&self, jar: &mut CookieJar, plan: CascadePlan) -> Result<AcquiredToken> {
        if !jar.has_identity() {
            return Err(Error::unauthenticated(
                "session and CSRF cookies must be loaded before requesting a token",
            ));
        }

        for outcome in self.warm_up(jar).await {
            debug!("Warm-up outcome: {:?}", outcome);
        }

        let strategies = plan.strategies();
        for strategy in strategies {
            match self.attempt(*strategy, jar).await {
                Attempt::Token(value, via) => {
                    info!("Bearer token acquired via {} strategy ({:?})", strategy.name(), via);
                    jar.set(ACCESS_TOKEN, value.clone());
                    let expires_at = token_expiry(&value);
                    return Ok(AcquiredToken {
                        value,
                        strategy: *strategy,
                        via,
                        expires_at,
                    });
                }
                Attempt::Empty(status) => {
                    debug!("{} strategy returned HTTP {} without a token", strategy.name(), status);
                }
                Attempt::Failed(reason) => {
                    warn!("{} strategy failed: {}", strategy.name(), reason);
                }
            }
        }

        let attempted: Vec<&str> = strategies.iter().map(Strategy::name).collect();
        Err(Error::token_unavailable(attempted.join(", ")))
    }

    /// Landing page then session check; failures are expected and tolerated
    async fn warm_up(&self, jar: &mut CookieJar) -> Vec<WarmUp> {
        let mut outcomes = Vec::with_capacity(2);
        for path in [&self.backend.landing_path, &self.backend.session_check_path] {
            let url = join_url(&self.backend.web_url, path);
            let outcome = match self.get(&url, &[], HeaderMap::new(), jar).await {
                Ok(response) if response.status.is_success() || response.status.is_redirection() => {
                    WarmUp::Completed(response.status)
                }
                Ok(response) => WarmUp::Rejected(response.status),
                Err(e) => WarmUp::Unreachable(e.to_string()),
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn attempt(&self, strategy: Strategy, jar: &mut CookieJar) -> Attempt {
        let (url, query, headers) = match strategy {
            Strategy::Exchange => (
                join_url(&self.backend.web_url, &self.backend.exchange_path),
                vec![("_".to_string(), self.cache_buster.next().to_string())],
                self.no_cache_headers(),
            ),
            Strategy::QueryFallback => {
                let Some(session_token) = jar.get(SESSION_TOKEN).map(str::to_string) else {
                    return Attempt::Failed("session token missing from jar".to_string());
                };
                (
                    join_url(&self.backend.web_url, &self.backend.exchange_path),
                    vec![
                        ("_".to_string(), self.cache_buster.next().to_string()),
                        ("token".to_string(), session_token),
                    ],
                    self.no_cache_headers(),
                )
            }
            Strategy::Nudge => (
                join_url(&self.backend.api_url, &self.backend.current_user_path),
                Vec::new(),
                HeaderMap::new(),
            ),
        };

        let response = match self.get(&url, &query, headers, jar).await {
            Ok(response) => response,
            Err(e) => return Attempt::Failed(e.to_string()),
        };

        strategy
            .extractors()
            .iter()
            .find_map(|extraction| extraction.extract(&response).map(|token| (token, *extraction)))
            .map(|(token, via)| Attempt::Token(token, via))
            .unwrap_or(Attempt::Empty(response.status))
    }

    /// An entity-tag precondition no cache entry can satisfy
    fn no_cache_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let etag = format!("\"{}\"", self.cache_buster.next());
        if let Ok(value) = HeaderValue::from_str(&etag) {
            headers.insert(IF_NONE_MATCH, value);
        }
        headers
    }

    /// GET carrying only the identity cookies; applies `Set-Cookie` replacements to the jar
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        mut headers: HeaderMap,
        jar: &mut CookieJar,
    ) -> std::result::Result<ProbeResponse, reqwest::Error> {
        if let Some(cookie) = jar.identity_header_value()
            && let Ok(value) = HeaderValue::from_str(&cookie)
        {
            headers.insert(COOKIE, value);
        }

        debug!("Cascade request: GET {}", url);
        let response = self.client.get(url).query(query).headers(headers).send().await?;
        let captured = ProbeResponse::capture(response).await?;

        let replaced = jar.absorb_set_cookies(&captured.headers);
        if !replaced.is_empty() {
            debug!("Backend replaced cookies: {:?}", replaced);
        }
        Ok(captured)
    }
}

/// Decode the `exp` claim of a JWT-shaped token
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}
