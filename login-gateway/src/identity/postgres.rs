//! PostgreSQL identity store

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::store::{IdentityStore, StoreError};
use super::types::{UserIdentity, UserIdentityDraft};
use crate::oauth2::Provider;

/// Identity store backed by the `user_identities` table
///
/// Uniqueness is enforced by the table's `UNIQUE (provider, provider_id)`
/// constraint, so concurrent first logins cannot produce two rows.
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    /// Wrap an existing pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect, run embedded migrations and return the store
    ///
    /// # Errors
    ///
    /// Returns error if the database is unreachable or a migration fails
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Persistence(format!("migration failed: {e}")))?;

        tracing::info!("Identity store migrations applied");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_provider_identity(
        &self,
        provider: Provider,
        provider_id: &str,
    ) -> Result<Option<UserIdentity>, StoreError> {
        let identity = sqlx::query_as::<_, UserIdentity>(
            r"
            SELECT id, provider, provider_id, display_name, email, access_token,
                   created_at, updated_at
            FROM user_identities
            WHERE provider = $1 AND provider_id = $2
            ",
        )
        .bind(provider.as_str())
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    async fn create(&self, draft: &UserIdentityDraft) -> Result<UserIdentity, StoreError> {
        let inserted = sqlx::query_as::<_, UserIdentity>(
            r"
            INSERT INTO user_identities (provider, provider_id, display_name, email, access_token)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (provider, provider_id) DO NOTHING
            RETURNING id, provider, provider_id, display_name, email, access_token,
                      created_at, updated_at
            ",
        )
        .bind(draft.provider.as_str())
        .bind(&draft.provider_id)
        .bind(&draft.display_name)
        .bind(&draft.email)
        .bind(&draft.access_token)
        .fetch_optional(&self.pool)
        .await?;

        inserted.ok_or_else(|| StoreError::DuplicateKey {
            provider: draft.provider,
            provider_id: draft.provider_id.clone(),
        })
    }

    async fn refresh_profile(
        &self,
        id: i64,
        draft: &UserIdentityDraft,
    ) -> Result<UserIdentity, StoreError> {
        sqlx::query_as::<_, UserIdentity>(
            r"
            UPDATE user_identities
            SET display_name = $2, email = $3, access_token = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, provider, provider_id, display_name, email, access_token,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&draft.display_name)
        .bind(&draft.email)
        .bind(&draft.access_token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))
    }
}
