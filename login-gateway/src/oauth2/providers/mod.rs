//! OAuth2 provider clients
//!
//! Each supported provider implements [`IdentityProvider`]. The
//! [`ProviderRegistry`] maps a [`Provider`] to its client; Instagram is never
//! registered.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::types::{
    ExternalProfile, OAuthConfig, OAuthError, OAuthToken, Provider, ProviderConfig,
};

pub mod base;
pub mod facebook;
pub mod github;
pub mod google;

pub use base::BaseOAuthProvider;
pub use facebook::FacebookProvider;
pub use github::GitHubProvider;
pub use google::GoogleProvider;

/// Where to send the browser, plus the PKCE verifier to keep for the callback
#[derive(Clone)]
pub struct AuthorizationRequest {
    /// Provider authorization URL
    pub url: String,
    /// PKCE verifier matching the challenge embedded in `url`
    pub pkce_verifier: String,
}

impl fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("url", &self.url)
            .field("pkce_verifier", &"<redacted>")
            .finish()
    }
}

/// A provider able to run the authorization-code flow
#[async_trait]
pub trait IdentityProvider: Send + Sync + fmt::Debug {
    /// Which provider this client talks to
    fn provider(&self) -> Provider;

    /// Build the authorization redirect for `state_token`
    fn authorization_url(&self, state_token: &str) -> AuthorizationRequest;

    /// Exchange the callback code for an access token
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::TokenExchangeFailed`] if the provider rejects the
    /// code or cannot be reached
    async fn exchange_code(&self, code: &str, pkce_verifier: &str)
        -> Result<OAuthToken, OAuthError>;

    /// Fetch and normalize the user's profile
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::UserInfoFailed`] if the profile request fails
    async fn fetch_profile(&self, token: &OAuthToken) -> Result<ExternalProfile, OAuthError>;
}

/// Enabled provider clients, keyed by provider
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<Provider, Arc<dyn IdentityProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build clients for every configured, enabled provider
    ///
    /// # Errors
    ///
    /// Returns error if a configured provider has invalid URLs
    pub fn from_config(config: &OAuthConfig, public_url: &str) -> Result<Self, OAuthError> {
        let mut registry = Self::new();

        for provider in Provider::ALL {
            let provider_config = match config.get_provider(provider) {
                Ok(provider_config) => provider_config,
                Err(OAuthError::ProviderNotConfigured(_)) => continue,
                Err(e) => return Err(e),
            };

            match client_for(provider, provider_config, public_url) {
                Ok(client) => {
                    registry.register(client);
                }
                Err(OAuthError::ProviderDisabled(provider)) => tracing::warn!(
                    provider = %provider,
                    "Provider is disabled, ignoring its configuration"
                ),
                Err(e) => return Err(e),
            }
        }

        tracing::info!(providers = ?registry.enabled(), "OAuth2 providers registered");
        Ok(registry)
    }

    /// Register a provider client
    ///
    /// Returns `false`, leaving the registry unchanged, for disabled providers.
    pub fn register(&mut self, client: Arc<dyn IdentityProvider>) -> bool {
        let provider = client.provider();
        if !provider.is_enabled() {
            tracing::warn!(provider = %provider, "Refusing to register disabled provider");
            return false;
        }
        self.providers.insert(provider, client);
        true
    }

    /// Client for `provider`, if registered
    #[must_use]
    pub fn get(&self, provider: Provider) -> Option<Arc<dyn IdentityProvider>> {
        self.providers.get(&provider).cloned()
    }

    /// Registered providers in display order
    #[must_use]
    pub fn enabled(&self) -> Vec<Provider> {
        self.providers.keys().copied().collect()
    }
}

/// Build the client for `provider`
///
/// # Errors
///
/// Returns [`OAuthError::ProviderDisabled`] for providers with no client, or
/// error if the configuration has invalid URLs
fn client_for(
    provider: Provider,
    config: &ProviderConfig,
    public_url: &str,
) -> Result<Arc<dyn IdentityProvider>, OAuthError> {
    Ok(match provider {
        Provider::Facebook => Arc::new(FacebookProvider::new(config, public_url)?),
        Provider::Google => Arc::new(GoogleProvider::new(config, public_url)?),
        Provider::GitHub => Arc::new(GitHubProvider::new(config, public_url)?),
        Provider::Instagram => return Err(OAuthError::ProviderDisabled(provider)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct StubProvider(Provider);

    #[async_trait]
    impl IdentityProvider for StubProvider {
        fn provider(&self) -> Provider {
            self.0
        }

        fn authorization_url(&self, state_token: &str) -> AuthorizationRequest {
            AuthorizationRequest {
                url: format!("https://stub.test/?state={state_token}"),
                pkce_verifier: "verifier".to_string(),
            }
        }

        async fn exchange_code(&self, _: &str, _: &str) -> Result<OAuthToken, OAuthError> {
            Err(OAuthError::TokenExchangeFailed("stub".to_string()))
        }

        async fn fetch_profile(&self, _: &OAuthToken) -> Result<ExternalProfile, OAuthError> {
            Err(OAuthError::UserInfoFailed("stub".to_string()))
        }
    }

    #[test]
    fn test_from_config_registers_configured_providers() {
        let mut config = OAuthConfig::new();
        config.github = Some(ProviderConfig::new("gh", "secret"));
        config.facebook = Some(ProviderConfig::new("fb", "secret"));
        config.instagram = Some(ProviderConfig::new("ig", "secret"));

        let registry = ProviderRegistry::from_config(&config, "http://localhost:3000").unwrap();

        assert_eq!(registry.enabled(), vec![Provider::Facebook, Provider::GitHub]);
        assert!(registry.get(Provider::Google).is_none());
        assert!(registry.get(Provider::Instagram).is_none());
    }

    #[test]
    fn test_from_config_with_only_instagram_is_empty() {
        let mut config = OAuthConfig::new();
        config.instagram = Some(ProviderConfig::new("ig", "secret"));

        let registry = ProviderRegistry::from_config(&config, "http://localhost:3000").unwrap();
        assert!(registry.enabled().is_empty());
    }

    #[test]
    fn test_client_for_instagram_is_disabled() {
        let result = client_for(
            Provider::Instagram,
            &ProviderConfig::new("ig", "secret"),
            "http://localhost:3000",
        );
        assert!(matches!(
            result,
            Err(OAuthError::ProviderDisabled(Provider::Instagram))
        ));
    }

    #[test]
    fn test_from_config_rejects_bad_redirect_uri() {
        let mut config = OAuthConfig::new();
        let mut github = ProviderConfig::new("gh", "secret");
        github.redirect_uri = Some("not a url".to_string());
        config.github = Some(github);

        assert!(ProviderRegistry::from_config(&config, "http://localhost:3000").is_err());
    }

    #[test]
    fn test_register_rejects_disabled_provider() {
        let mut registry = ProviderRegistry::new();
        assert!(!registry.register(Arc::new(StubProvider(Provider::Instagram))));
        assert!(registry.register(Arc::new(StubProvider(Provider::Google))));
        assert_eq!(registry.enabled(), vec![Provider::Google]);
    }

    #[test]
    fn test_authorization_request_debug_redacts_verifier() {
        let request = StubProvider(Provider::Google).authorization_url("s");
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("\"verifier\""));
        assert!(rendered.contains("<redacted>"));
    }
}
