//! Callback resolution
//!
//! Turns an authorization code into a local [`UserIdentity`]: exchange the
//! code, fetch the profile, then find or create the identity.

use std::sync::Arc;
use std::time::Duration;

use super::login::{AuthFailure, AuthFailureReason};
use super::providers::IdentityProvider;
use super::types::{ExternalProfile, OAuthConfig, OAuthToken, Provider};
use crate::identity::{IdentityStore, StoreError, UserIdentity, UserIdentityDraft};

/// Resolves provider callbacks to local identities
#[derive(Clone)]
pub struct CallbackResolver {
    store: Arc<dyn IdentityStore>,
    exchange_timeout: Duration,
    refresh_on_login: bool,
}

impl std::fmt::Debug for CallbackResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackResolver")
            .field("exchange_timeout", &self.exchange_timeout)
            .field("refresh_on_login", &self.refresh_on_login)
            .finish_non_exhaustive()
    }
}

impl CallbackResolver {
    /// Create a resolver using the OAuth2 timeout and refresh settings
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, config: &OAuthConfig) -> Self {
        Self {
            store,
            exchange_timeout: config.exchange_timeout(),
            refresh_on_login: config.refresh_on_login,
        }
    }

    /// Exchange `code`, fetch the profile and resolve it to an identity
    ///
    /// The exchange and profile fetch together are bounded by the configured
    /// timeout. No store lock is held while the provider is awaited.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailureReason::ExchangeFailed`] if the provider calls fail
    /// or time out, and [`AuthFailureReason::StorageError`] if the store fails
    pub async fn handle_callback(
        &self,
        client: &dyn IdentityProvider,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<UserIdentity, AuthFailure> {
        let provider = client.provider();

        let exchange = async {
            let token = client.exchange_code(code, pkce_verifier).await?;
            let profile = client.fetch_profile(&token).await?;
            Ok::<_, super::OAuthError>((token, profile))
        };

        let (token, profile) = match tokio::time::timeout(self.exchange_timeout, exchange).await {
            Ok(Ok(exchanged)) => exchanged,
            Ok(Err(e)) => {
                tracing::warn!(%provider, error = %e, "Provider exchange failed");
                return Err(AuthFailure::new(provider, AuthFailureReason::ExchangeFailed));
            }
            Err(_) => {
                tracing::warn!(
                    %provider,
                    timeout_secs = self.exchange_timeout.as_secs(),
                    "Provider exchange timed out"
                );
                return Err(AuthFailure::new(provider, AuthFailureReason::ExchangeFailed));
            }
        };

        self.resolve_identity(provider, &profile, &token).await
    }

    /// Find the identity for `profile`, creating it on first login
    ///
    /// A concurrent first login for the same subject makes `create` fail with
    /// [`StoreError::DuplicateKey`]; the lookup is then repeated and the
    /// winner's record returned.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailureReason::StorageError`] if the store fails
    pub async fn resolve_identity(
        &self,
        provider: Provider,
        profile: &ExternalProfile,
        token: &OAuthToken,
    ) -> Result<UserIdentity, AuthFailure> {
        let storage_error = |e: &StoreError| {
            tracing::error!(%provider, error = %e, "Identity store failed");
            AuthFailure::new(provider, AuthFailureReason::StorageError)
        };

        let draft = UserIdentityDraft::from_profile(provider, profile, token);

        let existing = self
            .store
            .find_by_provider_identity(provider, &draft.provider_id)
            .await
            .map_err(|e| storage_error(&e))?;

        if let Some(identity) = existing {
            if !self.refresh_on_login {
                tracing::debug!(%provider, identity_id = identity.id, "Existing identity");
                return Ok(identity);
            }

            let refreshed = self
                .store
                .refresh_profile(identity.id, &draft)
                .await
                .map_err(|e| storage_error(&e))?;
            tracing::debug!(%provider, identity_id = refreshed.id, "Refreshed identity");
            return Ok(refreshed);
        }

        match self.store.create(&draft).await {
            Ok(identity) => {
                tracing::info!(%provider, identity_id = identity.id, "Created identity");
                Ok(identity)
            }
            Err(StoreError::DuplicateKey { .. }) => {
                tracing::debug!(%provider, "Lost first-login race, re-reading identity");
                self.store
                    .find_by_provider_identity(provider, &draft.provider_id)
                    .await
                    .map_err(|e| storage_error(&e))?
                    .ok_or_else(|| {
                        storage_error(&StoreError::Persistence(
                            "duplicate key reported but identity not found".to_string(),
                        ))
                    })
            }
            Err(e) => Err(storage_error(&e)),
        }
    }
}
