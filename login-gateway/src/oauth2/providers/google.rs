//! Google OAuth2 provider

use async_trait::async_trait;
use serde::Deserialize;

use super::base::BaseOAuthProvider;
use super::{AuthorizationRequest, IdentityProvider};
use crate::oauth2::types::{ExternalProfile, OAuthError, OAuthToken, Provider, ProviderConfig};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Google OAuth2 provider
#[derive(Debug)]
pub struct GoogleProvider {
    base: BaseOAuthProvider,
}

impl GoogleProvider {
    /// Create a new Google provider
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub fn new(config: &ProviderConfig, public_url: &str) -> Result<Self, OAuthError> {
        Ok(Self {
            base: BaseOAuthProvider::new(Provider::Google, AUTH_URL, TOKEN_URL, config, public_url)?,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn authorization_url(&self, state_token: &str) -> AuthorizationRequest {
        self.base.authorization_url(state_token)
    }

    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<OAuthToken, OAuthError> {
        self.base.exchange_code(code, pkce_verifier).await
    }

    async fn fetch_profile(&self, token: &OAuthToken) -> Result<ExternalProfile, OAuthError> {
        let user: GoogleUser = self.base.fetch_json(USERINFO_URL, token, &[]).await?;
        Ok(user.into())
    }
}

/// Google userinfo v2 response
///
/// `email` is only present when the `email` scope was granted.
#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<GoogleUser> for ExternalProfile {
    fn from(user: GoogleUser) -> Self {
        Self {
            provider_id: user.id,
            display_name: user.name.unwrap_or_default(),
            emails: user.email.into_iter().filter(|e| !e.is_empty()).collect(),
        }
    }
}
