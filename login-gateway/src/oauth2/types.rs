//! Core OAuth2 types and configuration
//!
//! Provider identifiers, per-provider client configuration, access tokens,
//! the normalized external profile and the OAuth2 error type.

use oauth2::basic::BasicClient;
use oauth2::{EndpointNotSet, EndpointSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// Type alias for a configured OAuth2 client with auth and token endpoints set
///
/// - `EndpointSet` for `HasAuthUrl`
/// - `EndpointNotSet` for device auth, introspection and revocation
/// - `EndpointSet` for `HasTokenUrl`
pub type ConfiguredClient = BasicClient<
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

/// Identity provider
///
/// Selected from the `/auth/{provider}` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Facebook Login
    Facebook,
    /// Google OAuth2
    Google,
    /// GitHub OAuth2
    GitHub,
    /// Instagram Basic Display (disabled, never registered)
    Instagram,
}

impl Provider {
    /// Every provider variant, in login-page order
    pub const ALL: [Self; 4] = [Self::Facebook, Self::Google, Self::GitHub, Self::Instagram];

    /// Get the provider as a string (lowercase)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Google => "google",
            Self::GitHub => "github",
            Self::Instagram => "instagram",
        }
    }

    /// Human readable provider name for the login page
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Facebook => "Facebook",
            Self::Google => "Google",
            Self::GitHub => "GitHub",
            Self::Instagram => "Instagram",
        }
    }

    /// Whether the provider can be registered at all
    ///
    /// Instagram is kept as a variant so `/auth/instagram` resolves to a known
    /// provider, but it has no client implementation.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Instagram)
    }

    /// Scopes requested when the configuration does not override them
    #[must_use]
    pub const fn default_scopes(&self) -> &'static [&'static str] {
        match self {
            Self::Facebook => &["email"],
            Self::Google => &["profile"],
            Self::GitHub => &["user:email"],
            Self::Instagram => &["user_profile"],
        }
    }

    /// Where the browser goes after a successful login
    #[must_use]
    pub const fn success_redirect(&self) -> &'static str {
        match self {
            Self::Facebook => "/profile",
            Self::Google | Self::GitHub | Self::Instagram => "/",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "facebook" => Ok(Self::Facebook),
            "google" => Ok(Self::Google),
            "github" => Ok(Self::GitHub),
            "instagram" => Ok(Self::Instagram),
            _ => Err(OAuthError::UnknownProvider(s.to_string())),
        }
    }
}

// SQLx type conversion for Provider
impl TryFrom<String> for Provider {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value).map_err(|e| e.to_string())
    }
}

/// Configuration for an OAuth2 provider
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OAuth2 client ID
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Redirect URI (callback URL); derived from the public URL when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// Scopes to request; provider defaults when empty
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl ProviderConfig {
    /// Create a provider configuration with default redirect URI and scopes
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: None,
            scopes: Vec::new(),
        }
    }

    /// Callback URL for `provider`, relative to the gateway's public URL
    #[must_use]
    pub fn redirect_uri_for(&self, provider: Provider, public_url: &str) -> String {
        self.redirect_uri.clone().unwrap_or_else(|| {
            format!(
                "{}/auth/{}/callback",
                public_url.trim_end_matches('/'),
                provider.as_str()
            )
        })
    }

    /// Scopes for `provider`, falling back to its defaults
    #[must_use]
    pub fn scopes_for(&self, provider: Provider) -> Vec<String> {
        if self.scopes.is_empty() {
            provider
                .default_scopes()
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        } else {
            self.scopes.clone()
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Complete OAuth2 configuration for all providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Facebook configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<ProviderConfig>,
    /// Google configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google: Option<ProviderConfig>,
    /// GitHub configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<ProviderConfig>,
    /// Instagram configuration (accepted but ignored while the provider is disabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<ProviderConfig>,
    /// Upper bound for the token exchange plus profile fetch, in seconds
    pub exchange_timeout_secs: u64,
    /// Overwrite display name, email and access token on every login
    pub refresh_on_login: bool,
}

impl OAuthConfig {
    /// Create a new empty OAuth2 configuration
    #[must_use]
    pub const fn new() -> Self {
        Self {
            facebook: None,
            google: None,
            github: None,
            instagram: None,
            exchange_timeout_secs: 10,
            refresh_on_login: false,
        }
    }

    const fn provider_config(&self, provider: Provider) -> Option<&ProviderConfig> {
        match provider {
            Provider::Facebook => self.facebook.as_ref(),
            Provider::Google => self.google.as_ref(),
            Provider::GitHub => self.github.as_ref(),
            Provider::Instagram => self.instagram.as_ref(),
        }
    }

    /// Get configuration for a specific provider
    ///
    /// # Errors
    ///
    /// Returns error if the provider is not configured
    pub fn get_provider(&self, provider: Provider) -> Result<&ProviderConfig, OAuthError> {
        self.provider_config(provider)
            .ok_or(OAuthError::ProviderNotConfigured(provider))
    }

    /// Check if a provider is configured
    #[must_use]
    pub const fn is_provider_configured(&self, provider: Provider) -> bool {
        self.provider_config(provider).is_some()
    }

    /// Exchange timeout as a [`Duration`]
    #[must_use]
    pub const fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs)
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// OAuth2 CSRF state token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    /// The state token
    pub token: String,
    /// Provider for this state
    pub provider: Provider,
    /// When the state expires
    pub expires_at: SystemTime,
}

impl OAuthState {
    /// How long a state token stays valid
    pub const TTL: Duration = Duration::from_secs(600);

    /// Generate a new state token
    #[must_use]
    pub fn generate(provider: Provider) -> Self {
        use rand::Rng;

        let random_bytes: [u8; 32] = rand::rng().random();
        let token = hex::encode(random_bytes);

        Self {
            token,
            provider,
            expires_at: SystemTime::now() + Self::TTL,
        }
    }

    /// Check if the state token has expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        SystemTime::now() > self.expires_at
    }
}

/// OAuth2 access token
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    /// Access token
    pub access_token: String,
    /// Refresh token (if provided)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// When the token expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<SystemTime>,
    /// OAuth2 scopes granted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl OAuthToken {
    /// Bearer token without expiry or scopes
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_at: None,
            scopes: None,
        }
    }

    /// Check if the access token has expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires| SystemTime::now() > expires)
    }
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Profile returned by a provider, normalized across providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProfile {
    /// Provider's subject identifier
    pub provider_id: String,
    /// Display name
    pub display_name: String,
    /// Email addresses disclosed by the provider, preferred first
    #[serde(default)]
    pub emails: Vec<String>,
}

impl ExternalProfile {
    /// First disclosed email, or an empty string
    #[must_use]
    pub fn primary_email(&self) -> &str {
        self.emails.first().map_or("", String::as_str)
    }
}

/// OAuth2 errors
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Unknown provider
    #[error("Unknown OAuth2 provider: {0}")]
    UnknownProvider(String),

    /// Provider not configured
    #[error("OAuth2 provider not configured: {0}")]
    ProviderNotConfigured(Provider),

    /// Provider disabled
    #[error("OAuth2 provider disabled: {0}")]
    ProviderDisabled(Provider),

    /// Invalid state token
    #[error("Invalid or expired OAuth2 state token")]
    InvalidState,

    /// State token mismatch (potential CSRF attack)
    #[error("OAuth2 state token mismatch (potential CSRF attack)")]
    StateMismatch,

    /// Authorization code exchange failed
    #[error("Failed to exchange authorization code for token: {0}")]
    TokenExchangeFailed(String),

    /// Failed to fetch user info
    #[error("Failed to fetch user information: {0}")]
    UserInfoFailed(String),

    /// Token expired
    #[error("OAuth2 token has expired")]
    TokenExpired,

    /// Generic OAuth2 error
    #[error("OAuth2 error: {0}")]
    Generic(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_as_str() {
        assert_eq!(Provider::Facebook.as_str(), "facebook");
        assert_eq!(Provider::Google.as_str(), "google");
        assert_eq!(Provider::GitHub.as_str(), "github");
        assert_eq!(Provider::Instagram.as_str(), "instagram");
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("github".parse::<Provider>().unwrap(), Provider::GitHub);
        assert_eq!("GitHub".parse::<Provider>().unwrap(), Provider::GitHub);
        assert_eq!("facebook".parse::<Provider>().unwrap(), Provider::Facebook);
        assert_eq!("instagram".parse::<Provider>().unwrap(), Provider::Instagram);
        assert!("myspace".parse::<Provider>().is_err());
    }

    #[test]
    fn test_instagram_is_disabled() {
        assert!(!Provider::Instagram.is_enabled());
        assert!(Provider::ALL
            .iter()
            .filter(|p| **p != Provider::Instagram)
            .all(Provider::is_enabled));
    }

    #[test]
    fn test_success_redirects() {
        assert_eq!(Provider::Facebook.success_redirect(), "/profile");
        assert_eq!(Provider::Google.success_redirect(), "/");
        assert_eq!(Provider::GitHub.success_redirect(), "/");
    }

    #[test]
    fn test_provider_config_defaults() {
        let config = ProviderConfig::new("id", "secret");
        assert_eq!(
            config.redirect_uri_for(Provider::GitHub, "http://localhost:3000/"),
            "http://localhost:3000/auth/github/callback"
        );
        assert_eq!(config.scopes_for(Provider::GitHub), vec!["user:email"]);
        assert_eq!(config.scopes_for(Provider::Google), vec!["profile"]);

        let custom = ProviderConfig {
            redirect_uri: Some("https://login.example.com/cb".to_string()),
            scopes: vec!["read:user".to_string()],
            ..ProviderConfig::new("id", "secret")
        };
        assert_eq!(
            custom.redirect_uri_for(Provider::GitHub, "http://ignored"),
            "https://login.example.com/cb"
        );
        assert_eq!(custom.scopes_for(Provider::GitHub), vec!["read:user"]);
    }

    #[test]
    fn test_provider_config_debug_redacts_secret() {
        let rendered = format!("{:?}", ProviderConfig::new("id", "very-secret"));
        assert!(!rendered.contains("very-secret"));
    }

    #[test]
    fn test_oauth_config_is_provider_configured() {
        let mut config = OAuthConfig::default();
        assert!(!config.is_provider_configured(Provider::Google));

        config.google = Some(ProviderConfig::new("test", "test"));

        assert!(config.is_provider_configured(Provider::Google));
        assert!(!config.is_provider_configured(Provider::GitHub));
        assert!(config.get_provider(Provider::Facebook).is_err());
    }

    #[test]
    fn test_oauth_state_generation() {
        let state = OAuthState::generate(Provider::Google);
        assert_eq!(state.provider, Provider::Google);
        assert!(!state.is_expired());
        assert_eq!(state.token.len(), 64);
    }

    #[test]
    fn test_oauth_token_is_expired() {
        let token = OAuthToken::bearer("test");
        assert!(!token.is_expired());

        let expired_token = OAuthToken {
            expires_at: Some(SystemTime::now() - Duration::from_secs(3600)),
            ..OAuthToken::bearer("test")
        };
        assert!(expired_token.is_expired());
    }

    #[test]
    fn test_oauth_token_debug_redacts() {
        let rendered = format!("{:?}", OAuthToken::bearer("gho_secret"));
        assert!(!rendered.contains("gho_secret"));
    }

    #[test]
    fn test_primary_email() {
        let mut profile = ExternalProfile {
            provider_id: "42".to_string(),
            display_name: "Ada".to_string(),
            emails: vec!["a@x.com".to_string(), "b@x.com".to_string()],
        };
        assert_eq!(profile.primary_email(), "a@x.com");

        profile.emails.clear();
        assert_eq!(profile.primary_email(), "");
    }
}
