//! In-memory identity store for development and tests

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use super::store::{IdentityStore, StoreError};
use super::types::{UserIdentity, UserIdentityDraft};
use crate::oauth2::Provider;

/// Process-local identity store
///
/// Records live until the process exits. The map key carries the uniqueness
/// constraint, and inserts check it under the write lock.
#[derive(Debug)]
pub struct InMemoryIdentityStore {
    records: RwLock<HashMap<(Provider, String), UserIdentity>>,
    next_id: AtomicI64,
}

impl InMemoryIdentityStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored identities
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_provider_identity(
        &self,
        provider: Provider,
        provider_id: &str,
    ) -> Result<Option<UserIdentity>, StoreError> {
        Ok(self
            .records
            .read()
            .get(&(provider, provider_id.to_string()))
            .cloned())
    }

    async fn create(&self, draft: &UserIdentityDraft) -> Result<UserIdentity, StoreError> {
        let key = (draft.provider, draft.provider_id.clone());
        let mut records = self.records.write();

        if records.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                provider: draft.provider,
                provider_id: draft.provider_id.clone(),
            });
        }

        let now = Utc::now();
        let identity = UserIdentity {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            provider: draft.provider,
            provider_id: draft.provider_id.clone(),
            display_name: draft.display_name.clone(),
            email: draft.email.clone(),
            access_token: draft.access_token.clone(),
            created_at: now,
            updated_at: now,
        };
        records.insert(key, identity.clone());
        drop(records);

        Ok(identity)
    }

    async fn refresh_profile(
        &self,
        id: i64,
        draft: &UserIdentityDraft,
    ) -> Result<UserIdentity, StoreError> {
        let mut records = self.records.write();
        let identity = records
            .values_mut()
            .find(|identity| identity.id == id)
            .ok_or(StoreError::NotFound(id))?;

        identity.display_name.clone_from(&draft.display_name);
        identity.email.clone_from(&draft.email);
        identity.access_token.clone_from(&draft.access_token);
        identity.updated_at = Utc::now();

        Ok(identity.clone())
    }
}
