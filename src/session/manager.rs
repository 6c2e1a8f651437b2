//! # Session Management Module
//!
//! The [`SessionManager`] is the single owner of the session state: the
//! identity cookie jar, the bearer token held in memory and the expiry of the
//! durable record. Every mutation goes through it.
//!
//! ## Lifecycle
//!
//! - created empty
//! - populated by [`SessionManager::restore`] or
//!   [`SessionManager::load_from_cookie_mapping`]
//! - refreshed by the token cascade whenever a bearer token is needed
//! - destroyed by [`SessionManager::reset`]
//!
//! ## Concurrency
//!
//! The state lives behind an async mutex that is held for the full duration
//! of a token cascade, so at most one cascade runs per manager. The 401
//! recovery in [`SessionManager::authenticated_request`] runs in-line and at
//! most once per request.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use wallapop_auto_adjust::{SessionManager, Settings};
//! use reqwest::Method;
//! use wallapop_auto_adjust::session::RequestOptions;
//!
//! # tokio_test::block_on(async {
//! let manager = SessionManager::new(Settings::default())?;
//! if manager.restore().await {
//!     let response = manager
//!         .authenticated_request(Method::GET, "https://api.wallapop.com/api/v3/users/me", RequestOptions::new())
//!         .await?;
//!     println!("HTTP {}", response.status());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

use super::cascade::{AcquiredToken, CacheBuster, CascadePlan, TokenCascade, token_expiry};
use super::cookies::{ACCESS_TOKEN, CookieJar};
use super::network::{RequestOptions, build_client, join_url};
use super::persistence::SessionStore;
use crate::{Error, Result, config::Settings};
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Mutable part of the session
#[derive(Debug, Default)]
struct SessionState {
    cookies: CookieJar,
    access_token: Option<String>,
    token_expires: Option<DateTime<Utc>>,
    record_expires: Option<DateTime<FixedOffset>>,
}

impl SessionState {
    /// The held bearer token, unless its decoded expiry has passed
    fn held_token(&self) -> Option<&str> {
        let token = self.access_token.as_deref()?;
        match self.token_expires {
            Some(expires) if expires <= Utc::now() => None,
            _ => Some(token),
        }
    }
}

/// Point-in-time view of the session for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Session and CSRF cookies are loaded
    pub has_identity: bool,
    /// A non-expired bearer token is held in memory
    pub has_token: bool,
    /// Decoded bearer token expiry
    pub token_expires: Option<DateTime<Utc>>,
    /// Expiry of the durable record backing this session
    pub record_expires: Option<DateTime<FixedOffset>>,
    /// Names of the cookies in the jar
    pub cookie_names: Vec<String>,
}

/// Coordinator owning the session state
#[derive(Debug)]
pub struct SessionManager {
    /// Configuration settings
    settings: Arc<Settings>,
    /// HTTP client for every backend call
    http_client: Client,
    /// Durable record
    store: SessionStore,
    /// Cookies, bearer token and expiries
    state: Mutex<SessionState>,
    /// Source of cache-busting values for the exchange endpoint
    cache_buster: CacheBuster,
}

impl SessionManager {
    /// Create an empty session manager
    pub fn new(settings: Settings) -> Result<Self> {
        let http_client = build_client(&settings)?;
        let store = SessionStore::from_settings(&settings);
        Ok(Self {
            settings: Arc::new(settings),
            http_client,
            store,
            state: Mutex::new(SessionState::default()),
            cache_buster: CacheBuster::new(),
        })
    }

    /// Configuration this manager was built with
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Value synthesized for a missing callback-url cookie
    pub fn default_callback(&self) -> String {
        let landing = join_url(&self.settings.backend.web_url, &self.settings.backend.landing_path);
        url::form_urlencoded::byte_serialize(landing.as_bytes()).collect()
    }

    /// Replace the identity cookies with a normalized copy of `raw`
    ///
    /// Any held bearer token is dropped. On failure the jar is left empty,
    /// so no cascade can run until valid cookies are supplied.
    pub async fn load_from_cookie_mapping(&self, raw: &HashMap<String, String>) -> Result<()> {
        let parsed = CookieJar::from_mapping(raw, &self.default_callback());
        let mut state = self.state.lock().await;
        *state = SessionState::default();
        let jar = parsed?;
        debug!("Loaded {} identity cookies", jar.len());
        state.cookies = jar;
        Ok(())
    }

    /// Load the durable record, if a fresh one exists
    ///
    /// Returns whether a session was restored. The persisted bearer token is
    /// ignored; the first authenticated call runs the cascade.
    pub async fn restore(&self) -> bool {
        let Some(persisted) = self.store.load().await else {
            return false;
        };

        let raw: HashMap<String, String> = persisted.cookies.into_iter().collect();
        let jar = match CookieJar::from_mapping(&raw, &self.default_callback()) {
            Ok(jar) => jar,
            Err(e) => {
                warn!("Stored session is unusable: {}", e);
                return false;
            }
        };

        let mut state = self.state.lock().await;
        *state = SessionState {
            cookies: jar,
            record_expires: Some(persisted.expires),
            ..SessionState::default()
        };
        info!("Restored session (expires {})", persisted.expires.to_rfc3339());
        true
    }

    /// Write the current session to the durable record
    ///
    /// An already persisted session keeps its expiry; otherwise a new
    /// lifetime starts now.
    pub async fn save(&self) -> Result<DateTime<FixedOffset>> {
        let mut state = self.state.lock().await;
        if !state.cookies.has_identity() {
            return Err(Error::unauthenticated("no identity cookies to save"));
        }
        self.persist(&mut state).await
    }

    /// Drop the session from memory and from disk
    pub async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = SessionState::default();
        self.store.clear().await?;
        info!("Session reset");
        Ok(())
    }

    /// Snapshot of the session for reporting
    pub async fn status(&self) -> SessionStatus {
        let state = self.state.lock().await;
        SessionStatus {
            has_identity: state.cookies.has_identity(),
            has_token: state.held_token().is_some(),
            token_expires: state.token_expires,
            record_expires: state.record_expires,
            cookie_names: state.cookies.iter().map(|(name, _)| name.to_string()).collect(),
        }
    }

    /// The bearer token currently held, if still valid
    pub async fn access_token(&self) -> Option<String> {
        self.state.lock().await.held_token().map(str::to_string)
    }

    /// Copy of the active cookie jar
    pub async fn cookies(&self) -> CookieJar {
        self.state.lock().await.cookies.clone()
    }

    /// Check that `raw` cookies authenticate without touching the held session
    ///
    /// Runs the warm-up and the direct exchange on a scratch jar.
    pub async fn probe_cookies(&self, raw: &HashMap<String, String>) -> Result<AcquiredToken> {
        let mut jar = CookieJar::from_mapping(raw, &self.default_callback())?;
        TokenCascade::new(&self.http_client, &self.settings.backend, &self.cache_buster)
            .run(&mut jar, CascadePlan::Probe)
            .await
    }

    /// Run the full token cascade and hold the new token
    pub async fn refresh_access_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        self.run_cascade(&mut state).await
    }

    /// Issue `method url` with the bearer token attached
    ///
    /// A missing token is acquired first. A 401 triggers one refresh and one
    /// retry; the retry's response is returned whatever its status. Every
    /// other response is returned untouched.
    pub async fn authenticated_request(&self, method: Method, url: &str, options: RequestOptions) -> Result<Response> {
        let mut token = self.ensure_token().await?;
        let mut retries_left = 1u8;

        loop {
            let response = self.send(method.clone(), url, &options, &token).await?;
            if response.status() != StatusCode::UNAUTHORIZED || retries_left == 0 {
                return Ok(response);
            }

            retries_left -= 1;
            info!("{} {} returned 401; refreshing bearer token", method, url);
            token = self.replace_rejected_token(&token).await?;
        }
    }

    /// Replacement for the `rejected` token; runs the cascade unless another caller already did
    ///
    /// Callers queued behind a cascade for the same rejection reuse its result.
    async fn replace_rejected_token(&self, rejected: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        if let Some(token) = state.held_token()
            && token != rejected
        {
            debug!("Bearer token already replaced by a concurrent refresh");
            return Ok(token.to_string());
        }
        self.run_cascade(&mut state).await
    }

    /// Held token, or a fresh one from the cascade
    async fn ensure_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        if let Some(token) = state.held_token() {
            return Ok(token.to_string());
        }
        self.run_cascade(&mut state).await
    }

    /// Cascade against the jar in `state`; the caller holds the lock
    async fn run_cascade(&self, state: &mut SessionState) -> Result<String> {
        let cascade = TokenCascade::new(&self.http_client, &self.settings.backend, &self.cache_buster);
        let acquired = cascade.run(&mut state.cookies, CascadePlan::Full).await?;

        state.access_token = Some(acquired.value.clone());
        state.token_expires = acquired.expires_at;

        if state.record_expires.is_some()
            && let Err(e) = self.persist(state).await
        {
            warn!("Failed to update session record: {}", e);
        }

        Ok(acquired.value)
    }

    async fn persist(&self, state: &mut SessionState) -> Result<DateTime<FixedOffset>> {
        let cookies: BTreeMap<String, String> = state.cookies.clone().into();
        let expires = self
            .store
            .save(&cookies, state.access_token.as_deref(), state.record_expires)
            .await?;
        state.record_expires = Some(expires);
        Ok(expires)
    }

    async fn send(&self, method: Method, url: &str, options: &RequestOptions, token: &str) -> Result<Response> {
        let mut headers = options.headers.clone();
        if !headers.contains_key(COOKIE)
            && let Some(cookie) = self.state.lock().await.cookies.header_value()
        {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(&cookie)
                    .map_err(|e| Error::internal(format!("Unencodable cookie header: {}", e)))?,
            );
        }
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::internal(format!("Unencodable bearer token: {}", e)))?,
        );

        let mut request = self
            .http_client
            .request(method.clone(), url)
            .headers(headers)
            .query(&options.query);
        if let Some(body) = &options.json {
            request = request.json(body);
        }

        debug!("Authenticated request: {} {}", method, url);
        let response = request.send().await?;

        let mut state = self.state.lock().await;
        let replaced = state.cookies.absorb_set_cookies(response.headers());
        if !replaced.is_empty() {
            debug!("Backend replaced cookies: {:?}", replaced);
        }
        if replaced.iter().any(|name| name == ACCESS_TOKEN)
            && let Some(rotated) = state.cookies.get(ACCESS_TOKEN).map(str::to_string)
        {
            debug!("Backend rotated the bearer token");
            state.token_expires = token_expiry(&rotated);
            state.access_token = Some(rotated);
        }
        drop(state);
        Ok(response)
    }
}
