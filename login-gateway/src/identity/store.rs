//! Identity store abstraction

use async_trait::async_trait;

use super::types::{UserIdentity, UserIdentityDraft};
use crate::oauth2::Provider;

/// Identity store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store unreachable or write rejected
    #[error("Identity store unavailable: {0}")]
    Persistence(String),

    /// A record with the same `(provider, provider_id)` already exists
    #[error("Identity already exists for {provider}/{provider_id}")]
    DuplicateKey {
        /// Provider of the conflicting record
        provider: Provider,
        /// Subject identifier of the conflicting record
        provider_id: String,
    },

    /// No record with this id
    #[error("Identity {0} not found")]
    NotFound(i64),
}

/// Persistence for [`UserIdentity`] records
///
/// Implementations must guarantee that `(provider, provider_id)` identifies at
/// most one record, including under concurrent `create` calls. The loser of a
/// race receives [`StoreError::DuplicateKey`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Exact-match lookup by provider identity
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be queried
    async fn find_by_provider_identity(
        &self,
        provider: Provider,
        provider_id: &str,
    ) -> Result<Option<UserIdentity>, StoreError>;

    /// Persist a new record and return it with its assigned id
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`] if the key is taken, or a
    /// persistence error if the write fails
    async fn create(&self, draft: &UserIdentityDraft) -> Result<UserIdentity, StoreError>;

    /// Overwrite display name, email and access token of an existing record
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `id` is unknown
    async fn refresh_profile(
        &self,
        id: i64,
        draft: &UserIdentityDraft,
    ) -> Result<UserIdentity, StoreError>;
}
