//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

/// Test helper functions
pub mod helpers {
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use wallapop_auto_adjust::Settings;
    use wallapop_auto_adjust::session::cookies::{CSRF_TOKEN, SESSION_TOKEN};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const EXCHANGE_PATH: &str = "/api/auth/federated-session";
    pub const CURRENT_USER_PATH: &str = "/api/v3/users/me";

    /// Settings pointing both backends at `server` and the session at `dir`
    pub fn create_test_settings(server: &MockServer, dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.backend.web_url = server.uri();
        settings.backend.api_url = server.uri();
        settings.session.dir = dir.path().to_path_buf();
        settings
    }

    /// A raw cookie mapping with both identity cookies
    pub fn identity_cookies() -> HashMap<String, String> {
        raw_cookies(&[(SESSION_TOKEN, "session-value"), (CSRF_TOKEN, "csrf-value")])
    }

    pub fn raw_cookies(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    /// Serve `tokens` from the exchange endpoint, one per call, repeating the last
    pub async fn mount_exchange_tokens(server: &MockServer, tokens: &[&str]) {
        for (i, token) in tokens.iter().enumerate() {
            let mock = Mock::given(method("GET"))
                .and(path(EXCHANGE_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": token })));
            if i + 1 < tokens.len() {
                mock.up_to_n_times(1).with_priority(1).mount(server).await;
            } else {
                mock.mount(server).await;
            }
        }
    }

    /// Number of requests `server` received on `request_path`
    pub async fn calls_to(server: &MockServer, request_path: &str) -> usize {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }
}
