//! Shared fixtures for integration tests

#![allow(dead_code)]

use acton_reactive::prelude::{ActonApp, AgentRuntime};
use async_trait::async_trait;
use axum::http::header;
use axum_test::{TestResponse, TestServer};
use login_gateway::oauth2::AuthorizationRequest;
use login_gateway::prelude::*;
use std::sync::Arc;

/// Code the fake provider accepts
pub const GOOD_CODE: &str = "good-code";

const VERIFIER: &str = "fake-verifier";

/// Provider client that never leaves the process
#[derive(Debug, Clone)]
pub struct FakeProvider {
    provider: Provider,
    profile: ExternalProfile,
}

impl FakeProvider {
    /// GitHub user `42` named Ada with one email
    pub fn github_ada() -> Self {
        Self::new(
            Provider::GitHub,
            ExternalProfile {
                provider_id: "42".to_string(),
                display_name: "Ada".to_string(),
                emails: vec!["a@x.com".to_string()],
            },
        )
    }

    pub const fn new(provider: Provider, profile: ExternalProfile) -> Self {
        Self { provider, profile }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn authorization_url(&self, state_token: &str) -> AuthorizationRequest {
        AuthorizationRequest {
            url: format!("https://provider.test/authorize?state={state_token}"),
            pkce_verifier: VERIFIER.to_string(),
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<OAuthToken, OAuthError> {
        if code == GOOD_CODE && pkce_verifier == VERIFIER {
            Ok(OAuthToken::bearer("fake-access-token"))
        } else {
            Err(OAuthError::TokenExchangeFailed("bad_verification_code".to_string()))
        }
    }

    async fn fetch_profile(&self, _token: &OAuthToken) -> Result<ExternalProfile, OAuthError> {
        Ok(self.profile.clone())
    }
}

/// Error text a [`FailingStore`] reports; must never reach a browser
pub const STORE_FAILURE: &str = "connection refused by db.internal:5432";

/// Identity store that is always down
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl IdentityStore for FailingStore {
    async fn find_by_provider_identity(
        &self,
        _provider: Provider,
        _provider_id: &str,
    ) -> Result<Option<UserIdentity>, StoreError> {
        Err(StoreError::Persistence(STORE_FAILURE.to_string()))
    }

    async fn create(&self, _draft: &UserIdentityDraft) -> Result<UserIdentity, StoreError> {
        Err(StoreError::Persistence(STORE_FAILURE.to_string()))
    }

    async fn refresh_profile(
        &self,
        _id: i64,
        _draft: &UserIdentityDraft,
    ) -> Result<UserIdentity, StoreError> {
        Err(StoreError::Persistence(STORE_FAILURE.to_string()))
    }
}

/// A running gateway backed by an in-memory store
pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryIdentityStore>,
    runtime: AgentRuntime,
}

impl TestApp {
    /// Gateway with the given provider clients registered
    pub async fn with_providers(providers: Vec<FakeProvider>) -> Self {
        let store = Arc::new(InMemoryIdentityStore::new());
        let (server, runtime) = launch(store.clone(), providers).await;

        Self {
            server,
            store,
            runtime,
        }
    }

    /// GitHub gateway whose identity lookups go to `backing` instead
    ///
    /// `store` stays empty.
    pub async fn with_backing_store(backing: Arc<dyn IdentityStore>) -> Self {
        let (server, runtime) = launch(backing, vec![FakeProvider::github_ada()]).await;

        Self {
            server,
            store: Arc::new(InMemoryIdentityStore::new()),
            runtime,
        }
    }

    /// Gateway with only the GitHub fake registered
    pub async fn github() -> Self {
        Self::with_providers(vec![FakeProvider::github_ada()]).await
    }

    /// Start a login and return the state token sent to the provider
    pub async fn begin(&self, provider: &str) -> String {
        let response = self.server.get(&format!("/auth/{provider}")).await;
        response.assert_status(axum::http::StatusCode::FOUND);

        let location = location(&response);
        location
            .split_once("state=")
            .map(|(_, state)| state.to_string())
            .expect("authorization URL carries a state")
    }

    /// Deliver a callback with `code` and `state`
    pub async fn callback(&self, provider: &str, code: &str, state: &str) -> TestResponse {
        self.server
            .get(&format!("/auth/{provider}/callback"))
            .add_query_param("code", code)
            .add_query_param("state", state)
            .await
    }

    /// Run a full successful login through `provider`
    pub async fn login(&self, provider: &str) -> TestResponse {
        let state = self.begin(provider).await;
        self.callback(provider, GOOD_CODE, &state).await
    }

    pub async fn shutdown(mut self) {
        self.runtime
            .shutdown_all()
            .await
            .expect("Failed to shutdown");
    }
}

async fn launch(
    store: Arc<dyn IdentityStore>,
    providers: Vec<FakeProvider>,
) -> (TestServer, AgentRuntime) {
    let mut runtime = ActonApp::launch();

    let mut config = GatewayConfig::default();
    config.session.secret = "integration-test-secret".to_string();

    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(Arc::new(provider));
    }

    let state = AppState::from_parts(&mut runtime, config, store, registry)
        .await
        .expect("Failed to create state");

    let server = TestServer::builder()
        .save_cookies()
        .build(login_gateway::routes::router(state))
        .expect("Failed to create test server");

    (server, runtime)
}

/// `Location` header of a redirect
pub fn location(response: &TestResponse) -> String {
    response
        .header(header::LOCATION)
        .to_str()
        .expect("Location is ASCII")
        .to_string()
}
