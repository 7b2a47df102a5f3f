//! GitHub OAuth2 provider

use async_trait::async_trait;
use serde::Deserialize;

use super::base::BaseOAuthProvider;
use super::{AuthorizationRequest, IdentityProvider};
use crate::oauth2::types::{ExternalProfile, OAuthError, OAuthToken, Provider, ProviderConfig};

const AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";
const EMAILS_URL: &str = "https://api.github.com/user/emails";
const API_HEADERS: &[(&str, &str)] = &[("Accept", "application/vnd.github+json")];

/// GitHub OAuth2 provider
#[derive(Debug)]
pub struct GitHubProvider {
    base: BaseOAuthProvider,
}

impl GitHubProvider {
    /// Create a new GitHub provider
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub fn new(config: &ProviderConfig, public_url: &str) -> Result<Self, OAuthError> {
        Ok(Self {
            base: BaseOAuthProvider::new(Provider::GitHub, AUTH_URL, TOKEN_URL, config, public_url)?,
        })
    }
}

#[async_trait]
impl IdentityProvider for GitHubProvider {
    fn provider(&self) -> Provider {
        Provider::GitHub
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
        let user: GitHubUser = self.base.fetch_json(USER_URL, token, API_HEADERS).await?;

        // The emails endpoint needs the user:email scope; without it the
        // profile's public email is all there is.
        let emails = match self
            .base
            .fetch_json::<Vec<GitHubEmail>>(EMAILS_URL, token, API_HEADERS)
            .await
        {
            Ok(emails) => emails,
            Err(e) => {
                tracing::debug!(error = %e, "GitHub email list unavailable");
                Vec::new()
            }
        };

        Ok(user.into_profile(emails))
    }
}

/// GitHub `/user` response
#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
}

/// GitHub `/user/emails` entry
#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

impl GitHubUser {
    /// Normalize, ordering the primary verified address first
    fn into_profile(self, mut emails: Vec<GitHubEmail>) -> ExternalProfile {
        emails.sort_by_key(|e| (!e.primary, !e.verified));

        let mut addresses: Vec<String> = emails.into_iter().map(|e| e.email).collect();
        if let Some(public) = self.email.filter(|e| !e.is_empty()) {
            if !addresses.contains(&public) {
                addresses.push(public);
            }
        }

        ExternalProfile {
            provider_id: self.id.to_string(),
            display_name: self
                .name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(self.login),
            emails: addresses,
        }
    }
}
