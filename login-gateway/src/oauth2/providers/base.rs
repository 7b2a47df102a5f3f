//! Shared OAuth2 client logic
//!
//! [`BaseOAuthProvider`] owns the configured `oauth2` client and one HTTP
//! client shared by the token exchange and profile requests. Provider
//! modules only add endpoints and profile normalization.

use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use std::time::{Duration, SystemTime};

use super::AuthorizationRequest;
use crate::oauth2::http::{http_client, send_token_request};
use crate::oauth2::types::{ConfiguredClient, OAuthError, OAuthToken, Provider, ProviderConfig};

/// Base OAuth2 provider containing the logic shared by all providers
pub struct BaseOAuthProvider {
    provider: Provider,
    client: ConfiguredClient,
    http_client: reqwest::Client,
    scopes: Vec<String>,
}

impl std::fmt::Debug for BaseOAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseOAuthProvider")
            .field("provider", &self.provider)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl BaseOAuthProvider {
    /// Create a base provider
    ///
    /// The callback URL comes from `config.redirect_uri`, or is derived from
    /// `public_url` when unset.
    ///
    /// # Errors
    ///
    /// Returns error if any URL is invalid
    pub fn new(
        provider: Provider,
        auth_url: &str,
        token_url: &str,
        config: &ProviderConfig,
        public_url: &str,
    ) -> Result<Self, OAuthError> {
        let redirect_uri = config.redirect_uri_for(provider, public_url);

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(auth_url.to_string())
                    .map_err(|e| OAuthError::Generic(format!("Invalid auth URL: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(token_url.to_string())
                    .map_err(|e| OAuthError::Generic(format!("Invalid token URL: {e}")))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(redirect_uri)
                    .map_err(|e| OAuthError::Generic(format!("Invalid redirect URI: {e}")))?,
            );

        Ok(Self {
            provider,
            client,
            http_client: http_client()?,
            scopes: config.scopes_for(provider),
        })
    }

    /// Provider this client talks to
    #[must_use]
    pub const fn provider(&self) -> Provider {
        self.provider
    }

    /// Build the authorization URL for `state_token` with a fresh PKCE challenge
    #[must_use]
    pub fn authorization_url(&self, state_token: &str) -> AuthorizationRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_url_builder = self
            .client
            .authorize_url(|| CsrfToken::new(state_token.to_string()));

        for scope in &self.scopes {
            auth_url_builder = auth_url_builder.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, _csrf_state) = auth_url_builder.set_pkce_challenge(pkce_challenge).url();

        AuthorizationRequest {
            url: auth_url.to_string(),
            pkce_verifier: pkce_verifier.secret().clone(),
        }
    }

    /// Exchange an authorization code for an access token
    ///
    /// # Errors
    ///
    /// Returns error if the token endpoint rejects the code or is unreachable
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<OAuthToken, OAuthError> {
        let http_client = self.http_client.clone();
        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&|request| {
                let http_client = http_client.clone();
                async move { send_token_request(&http_client, request).await }
            })
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(e.to_string()))?;

        Ok(OAuthToken {
            access_token: token_response.access_token().secret().clone(),
            refresh_token: token_response
                .refresh_token()
                .map(|t| t.secret().clone()),
            token_type: "Bearer".to_string(),
            expires_at: token_response
                .expires_in()
                .map(|duration| SystemTime::now() + Duration::from_secs(duration.as_secs())),
            scopes: token_response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.to_string()).collect()),
        })
    }

    /// GET `url` with the bearer token and optional extra headers, parsed as JSON
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::TokenExpired`] without a request if the token has
    /// expired, otherwise error if the request fails, returns a non-success
    /// status, or the body is not the expected JSON
    pub async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        token: &OAuthToken,
        headers: &[(&str, &str)],
    ) -> Result<T, OAuthError> {
        if token.is_expired() {
            return Err(OAuthError::TokenExpired);
        }

        let mut request = self.http_client.get(url).bearer_auth(&token.access_token);
        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::UserInfoFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(format!("Failed to parse JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BaseOAuthProvider {
        BaseOAuthProvider::new(
            Provider::GitHub,
            "https://example.com/oauth/authorize",
            "https://example.com/oauth/token",
            &ProviderConfig::new("test-client-id", "test-client-secret"),
            "http://localhost:3000",
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_auth_url() {
        let result = BaseOAuthProvider::new(
            Provider::GitHub,
            "not a url",
            "https://example.com/oauth/token",
            &ProviderConfig::new("id", "secret"),
            "http://localhost:3000",
        );
        assert!(matches!(result, Err(OAuthError::Generic(_))));
    }

    #[test]
    fn test_authorization_url_carries_state_and_pkce() {
        let request = base().authorization_url("state-token-123");

        assert!(request.url.starts_with("https://example.com/oauth/authorize"));
        assert!(request.url.contains("client_id=test-client-id"));
        assert!(request.url.contains("state=state-token-123"));
        assert!(request.url.contains("scope=user%3Aemail"));
        assert!(request.url.contains("code_challenge_method=S256"));
        assert!(request
            .url
            .contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fgithub%2Fcallback"));
        assert!(!request.pkce_verifier.is_empty());
    }

    #[test]
    fn test_each_authorization_gets_its_own_verifier() {
        let provider = base();
        let first = provider.authorization_url("a");
        let second = provider.authorization_url("b");
        assert_ne!(first.pkce_verifier, second.pkce_verifier);
    }

    #[tokio::test]
    async fn test_expired_token_is_not_sent() {
        let token = OAuthToken {
            expires_at: Some(SystemTime::now() - Duration::from_secs(60)),
            ..OAuthToken::bearer("stale")
        };

        // Unroutable on purpose: the call must fail before any request is made
        let result: Result<serde_json::Value, _> = base()
            .fetch_json("http://127.0.0.1:9/user", &token, &[])
            .await;
        assert!(matches!(result, Err(OAuthError::TokenExpired)));
    }
}
