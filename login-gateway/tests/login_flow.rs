//! End-to-end login flow through the router

mod common;

use axum::http::{header::SET_COOKIE, StatusCode};
use common::{location, FailingStore, FakeProvider, TestApp, GOOD_CODE, STORE_FAILURE};
use login_gateway::prelude::*;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread")]
async fn test_profile_requires_login() {
    let app = TestApp::github().await;

    let response = app.server.get("/profile").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_successful_login_shows_profile() {
    let app = TestApp::github().await;

    let response = app.login("github").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    assert_eq!(app.store.len(), 1);

    let profile = app.server.get("/profile").await;
    profile.assert_status_ok();
    let html = profile.text();
    assert!(html.contains("Ada"));
    assert!(html.contains("42"));
    assert!(html.contains("a@x.com"));
    assert!(!html.contains("fake-access-token"));

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_facebook_lands_on_profile() {
    let app = TestApp::with_providers(vec![FakeProvider::new(
        Provider::Facebook,
        ExternalProfile {
            provider_id: "10001".to_string(),
            display_name: "Grace".to_string(),
            emails: vec![],
        },
    )])
    .await;

    let response = app.login("facebook").await;
    assert_eq!(location(&response), "/profile");

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_logout_then_profile_redirects() {
    let app = TestApp::github().await;
    app.login("github").await;
    app.server.get("/profile").await.assert_status_ok();

    let response = app.server.get("/logout").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let profile = app.server.get("/profile").await;
    profile.assert_status(StatusCode::FOUND);
    assert_eq!(location(&profile), "/login");

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_exchange_creates_nothing() {
    let app = TestApp::github().await;

    let state = app.begin("github").await;
    let response = app.callback("github", "bad-code", &state).await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    assert!(app.store.is_empty());

    let profile = app.server.get("/profile").await;
    assert_eq!(location(&profile), "/login");

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_denied_at_provider() {
    let app = TestApp::github().await;

    let state = app.begin("github").await;
    let response = app
        .server
        .get("/auth/github/callback")
        .add_query_param("error", "access_denied")
        .add_query_param("state", &state)
        .await;
    assert_eq!(location(&response), "/login");
    assert!(app.store.is_empty());

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_state_mismatch_is_rejected() {
    let app = TestApp::github().await;

    app.begin("github").await;
    let response = app.callback("github", GOOD_CODE, "forged-state").await;
    assert_eq!(location(&response), "/login");
    assert!(app.store.is_empty());

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_callback_without_login_attempt() {
    let app = TestApp::github().await;

    let response = app.callback("github", GOOD_CODE, "never-issued").await;
    assert_eq!(location(&response), "/login");
    assert!(app.store.is_empty());

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_state_token_is_single_use() {
    let app = TestApp::github().await;

    let state = app.begin("github").await;
    assert_eq!(location(&app.callback("github", GOOD_CODE, &state).await), "/");

    app.server.get("/logout").await;
    let replay = app.callback("github", GOOD_CODE, &state).await;
    assert_eq!(location(&replay), "/login");

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_instagram_is_disabled() {
    let app = TestApp::github().await;

    let response = app.server.get("/auth/instagram").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    let callback = app.callback("instagram", GOOD_CODE, "anything").await;
    assert_eq!(location(&callback), "/login");

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unconfigured_provider_redirects_to_login() {
    let app = TestApp::github().await;

    let response = app.server.get("/auth/google").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_provider_is_not_found() {
    let app = TestApp::github().await;

    app.server
        .get("/auth/myspace")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .get("/auth/myspace/callback")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_second_login_reuses_identity() {
    let app = TestApp::github().await;

    app.login("github").await;
    app.server.get("/logout").await;
    app.login("github").await;

    assert_eq!(app.store.len(), 1);
    app.server.get("/profile").await.assert_status_ok();

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_email_list() {
    let app = TestApp::with_providers(vec![FakeProvider::new(
        Provider::GitHub,
        ExternalProfile {
            provider_id: "7".to_string(),
            display_name: "Linus".to_string(),
            emails: vec![],
        },
    )])
    .await;

    app.login("github").await;

    let identity = app
        .store
        .find_by_provider_identity(Provider::GitHub, "7")
        .await
        .expect("store available")
        .expect("identity created");
    assert_eq!(identity.email, "");
    assert_eq!(identity.display_name, "Linus");

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_page_lists_enabled_providers() {
    let app = TestApp::github().await;

    let html = app.server.get("/login").await.text();
    assert!(html.contains("/auth/github"));
    assert!(!html.contains("/auth/instagram"));

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health() {
    let app = TestApp::github().await;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("ok");

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_anonymous_requests_get_no_session_cookie() {
    let app = TestApp::github().await;

    for _ in 0..50 {
        let response = app.server.get("/health").await;
        response.assert_status_ok();
        assert!(!response.headers().contains_key(SET_COOKIE));
    }
    for path in ["/", "/login", "/profile", "/logout"] {
        let response = app.server.get(path).await;
        assert!(
            !response.headers().contains_key(SET_COOKIE),
            "{path} set a session cookie"
        );
    }

    let begin = app.server.get("/auth/github").await;
    assert!(begin.headers().contains_key(SET_COOKIE));

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_store_outage_fails_login_quietly() {
    let app = TestApp::with_backing_store(Arc::new(FailingStore)).await;

    let state = app.begin("github").await;
    let response = app.callback("github", GOOD_CODE, &state).await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    assert!(!response.text().contains(STORE_FAILURE));

    let profile = app.server.get("/profile").await;
    profile.assert_status(StatusCode::FOUND);
    assert_eq!(location(&profile), "/login");

    let login_page = app.server.get("/login").await.text();
    assert!(!login_page.contains(STORE_FAILURE));

    app.shutdown().await;
}
