//! Facebook Login provider

use async_trait::async_trait;
use serde::Deserialize;

use super::base::BaseOAuthProvider;
use super::{AuthorizationRequest, IdentityProvider};
use crate::oauth2::types::{ExternalProfile, OAuthError, OAuthToken, Provider, ProviderConfig};

const AUTH_URL: &str = "https://www.facebook.com/v19.0/dialog/oauth";
const TOKEN_URL: &str = "https://graph.facebook.com/v19.0/oauth/access_token";
const ME_URL: &str = "https://graph.facebook.com/v19.0/me?fields=id,name,email";

/// Facebook Login provider
#[derive(Debug)]
pub struct FacebookProvider {
    base: BaseOAuthProvider,
}

impl FacebookProvider {
    /// Create a new Facebook provider
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub fn new(config: &ProviderConfig, public_url: &str) -> Result<Self, OAuthError> {
        Ok(Self {
            base: BaseOAuthProvider::new(
                Provider::Facebook,
                AUTH_URL,
                TOKEN_URL,
                config,
                public_url,
            )?,
        })
    }
}

#[async_trait]
impl IdentityProvider for FacebookProvider {
    fn provider(&self) -> Provider {
        Provider::Facebook
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
        let user: FacebookUser = self.base.fetch_json(ME_URL, token, &[]).await?;
        Ok(user.into())
    }
}

/// Graph API `/me` response
#[derive(Debug, Deserialize)]
struct FacebookUser {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<FacebookUser> for ExternalProfile {
    fn from(user: FacebookUser) -> Self {
        Self {
            provider_id: user.id,
            display_name: user.name.unwrap_or_default(),
            emails: user.email.into_iter().filter(|e| !e.is_empty()).collect(),
        }
    }
}
