//! Session lifecycle tests against a mock backend

mod common;

use common::helpers::*;
use pretty_assertions::assert_eq;
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use tempfile::TempDir;
use wallapop_auto_adjust::session::cookies::{ACCESS_TOKEN, CSRF_TOKEN, SESSION_TOKEN};
use wallapop_auto_adjust::session::{CookieGuide, RequestOptions};
use wallapop_auto_adjust::{Error, MarketplaceClient, SessionManager};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_restore_refresh_and_reset() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let settings = create_test_settings(&server, &dir);
    mount_exchange_tokens(&server, &["FIRST", "SECOND"]).await;

    // Capture the cookies once
    let login = SessionManager::new(settings.clone()).unwrap();
    let guide = CookieGuide::new(&login);
    assert!(guide.validate(&identity_cookies()));
    let record_expires = guide.persist(&identity_cookies()).await.unwrap();

    // A later process picks them up without a bearer token
    let manager = SessionManager::new(settings.clone()).unwrap();
    assert!(manager.restore().await);
    let status = manager.status().await;
    assert!(status.has_identity);
    assert!(!status.has_token);
    assert_eq!(status.record_expires, Some(record_expires));

    Mock::given(method("GET"))
        .and(path(CURRENT_USER_PATH))
        .and(header("authorization", "Bearer FIRST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CURRENT_USER_PATH))
        .and(header("authorization", "Bearer SECOND"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let url = format!("{}{}", server.uri(), CURRENT_USER_PATH);
    let response = manager
        .authenticated_request(Method::GET, &url, RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(manager.access_token().await.as_deref(), Some("SECOND"));
    assert_eq!(manager.cookies().await.get(ACCESS_TOKEN), Some("SECOND"));
    assert_eq!(calls_to(&server, CURRENT_USER_PATH).await, 2);
    assert_eq!(calls_to(&server, EXCHANGE_PATH).await, 2);

    // Refreshing never pushes the record expiry out
    let reloaded = SessionManager::new(settings.clone()).unwrap();
    assert!(reloaded.restore().await);
    assert_eq!(reloaded.status().await.record_expires, Some(record_expires));

    manager.reset().await.unwrap();
    assert!(!settings.session_file_path().exists());
    assert!(!settings.cookies_file_path().exists());
    assert!(!SessionManager::new(settings).unwrap().restore().await);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_cascade() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path(EXCHANGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "SHARED"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CURRENT_USER_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let manager = Arc::new(SessionManager::new(create_test_settings(&server, &dir)).unwrap());
    manager.load_from_cookie_mapping(&identity_cookies()).await.unwrap();

    let url = format!("{}{}", server.uri(), CURRENT_USER_PATH);
    let (first, second) = tokio::join!(
        manager.authenticated_request(Method::GET, &url, RequestOptions::new()),
        manager.authenticated_request(Method::GET, &url, RequestOptions::new()),
    );

    assert_eq!(first.unwrap().status(), StatusCode::OK);
    assert_eq!(second.unwrap().status(), StatusCode::OK);
    assert_eq!(manager.access_token().await.as_deref(), Some("SHARED"));
}

#[tokio::test]
async fn test_incomplete_cookies_leave_no_session() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let manager = SessionManager::new(create_test_settings(&server, &dir)).unwrap();

    let err = manager
        .load_from_cookie_mapping(&raw_cookies(&[(SESSION_TOKEN, "only-the-session")]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidCookies { .. }));
    assert!(!manager.status().await.has_identity);
    assert!(matches!(manager.save().await, Err(Error::Unauthenticated(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_aliased_cookie_names_are_normalized() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let manager = SessionManager::new(create_test_settings(&server, &dir)).unwrap();

    manager
        .load_from_cookie_mapping(&raw_cookies(&[
            ("Secure-next-auth.session-token", " 'aliased' "),
            ("next-auth.csrf-token", "\"csrf\""),
        ]))
        .await
        .unwrap();

    let jar = manager.cookies().await;
    assert_eq!(jar.get(SESSION_TOKEN), Some("aliased"));
    assert_eq!(jar.get(CSRF_TOKEN), Some("csrf"));
}

#[tokio::test]
async fn test_marketplace_lists_products_through_session() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_exchange_tokens(&server, &["TOKEN"]).await;
    Mock::given(method("GET"))
        .and(path("/api/v3/user/items"))
        .and(header("authorization", "Bearer TOKEN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": [
            {"id": 42, "title": "Chair", "price": {"amount": "35.5", "currency": "EUR"}},
            {"id": "43", "name": "Desk", "price": 80}
        ]})))
        .mount(&server)
        .await;

    let manager = Arc::new(SessionManager::new(create_test_settings(&server, &dir)).unwrap());
    manager.load_from_cookie_mapping(&identity_cookies()).await.unwrap();
    let products = MarketplaceClient::new(manager).list_products().await.unwrap();

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].id, "42");
    assert_eq!(products[0].price, 35.5);
    assert_eq!(products[1].name, "Desk");
    assert_eq!(products[1].currency, "EUR");
}
