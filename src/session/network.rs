//! HTTP plumbing shared by the token cascade and the request wrapper

use crate::{Result, config::Settings};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Build the HTTP client used for every backend call
///
/// Redirects are not followed: the auth endpoints answer with `Set-Cookie`
/// on 3xx responses and those headers must be observed.
pub fn build_client(settings: &Settings) -> Result<Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    default_headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let client = Client::builder()
        .user_agent(settings.network.user_agent.clone())
        .default_headers(default_headers)
        .timeout(settings.request_timeout())
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(client)
}

/// Caller-controlled parts of an authenticated request
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers; these win over defaults except for `Authorization`
    pub headers: HeaderMap,
    /// Query string parameters
    pub query: Vec<(String, String)>,
    /// JSON request body
    pub json: Option<Value>,
}

impl RequestOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header; invalid names or values are rejected
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| crate::Error::internal(format!("Invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| crate::Error::internal(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Add a query parameter
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body
    pub fn with_json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }
}

/// Everything the token extractors need from a response, read once
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    /// Response status
    pub status: StatusCode,
    /// Response headers, `Set-Cookie` included
    pub headers: HeaderMap,
    /// Parsed JSON body, if the body was JSON
    pub body: Option<Value>,
}

impl ProbeResponse {
    /// Consume a response, keeping headers and the body parsed as JSON
    pub async fn capture(response: reqwest::Response) -> reqwest::Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&text).ok()
        };
        Ok(Self {
            status,
            headers,
            body,
        })
    }
}

/// Join a configured origin and an endpoint path
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
