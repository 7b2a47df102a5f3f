//! Local user identity records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::oauth2::{ExternalProfile, OAuthToken, Provider};

/// A persisted local user, keyed by `(provider, provider_id)`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserIdentity {
    /// Store-assigned identifier
    pub id: i64,
    /// Provider that vouched for this user
    #[sqlx(try_from = "String")]
    pub provider: Provider,
    /// Provider-scoped subject identifier (exact match, no case folding)
    pub provider_id: String,
    /// Display name as reported by the provider
    pub display_name: String,
    /// Email, empty when the provider disclosed none
    pub email: String,
    /// Provider access token
    pub access_token: String,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record was last written
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserIdentity")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("provider_id", &self.provider_id)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Fields of a [`UserIdentity`] that has not been stored yet
#[derive(Clone, PartialEq, Eq)]
pub struct UserIdentityDraft {
    /// Provider that vouched for this user
    pub provider: Provider,
    /// Provider-scoped subject identifier
    pub provider_id: String,
    /// Display name
    pub display_name: String,
    /// Email or empty string
    pub email: String,
    /// Provider access token
    pub access_token: String,
}

impl UserIdentityDraft {
    /// Build a draft from a provider profile and the token that fetched it
    #[must_use]
    pub fn from_profile(provider: Provider, profile: &ExternalProfile, token: &OAuthToken) -> Self {
        Self {
            provider,
            provider_id: profile.provider_id.clone(),
            display_name: profile.display_name.clone(),
            email: profile.primary_email().to_string(),
            access_token: token.access_token.clone(),
        }
    }
}

impl fmt::Debug for UserIdentityDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserIdentityDraft")
            .field("provider", &self.provider)
            .field("provider_id", &self.provider_id)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .finish()
    }
}
