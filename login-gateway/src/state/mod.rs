//! Application state management
//!
//! Combines configuration, the identity store, provider clients and the
//! acton-reactive agents holding sessions and OAuth2 state tokens.

use acton_reactive::prelude::{AgentHandle, AgentRuntime};
use std::sync::Arc;
use std::time::Duration;

use crate::agents::SessionManagerAgent;
use crate::auth::{JsonSessionCodec, SessionCodec};
use crate::config::GatewayConfig;
use crate::identity::{IdentityStore, InMemoryIdentityStore, PgIdentityStore};
use crate::middleware::SessionSigner;
use crate::oauth2::{agent::OAuth2Agent, CallbackResolver, ProviderRegistry};

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    config: Arc<GatewayConfig>,
    providers: Arc<ProviderRegistry>,
    resolver: CallbackResolver,
    codec: Arc<dyn SessionCodec>,
    signer: SessionSigner,
    session_manager: AgentHandle,
    oauth2_manager: AgentHandle,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("providers", &self.providers.enabled())
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create state from configuration
    ///
    /// Uses PostgreSQL when `database.url` is set and an in-memory store
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the database is unreachable, a provider client cannot
    /// be built or an agent fails to spawn
    pub async fn new(runtime: &mut AgentRuntime, config: GatewayConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn IdentityStore> = match &config.database.url {
            Some(url) => {
                let store = PgIdentityStore::connect(url, config.database.max_connections).await?;
                tracing::info!("Using PostgreSQL identity store");
                Arc::new(store)
            }
            None => {
                tracing::warn!("No database configured, identities are kept in memory");
                Arc::new(InMemoryIdentityStore::new())
            }
        };

        let registry = ProviderRegistry::from_config(&config.oauth2, &config.server.public_url)?;

        Self::from_parts(runtime, config, store, registry).await
    }

    /// Create state from an explicit store and provider registry
    ///
    /// # Errors
    ///
    /// Returns error if the session key is rejected or an agent fails to spawn
    pub async fn from_parts(
        runtime: &mut AgentRuntime,
        config: GatewayConfig,
        store: Arc<dyn IdentityStore>,
        registry: ProviderRegistry,
    ) -> anyhow::Result<Self> {
        let signer = SessionSigner::new(config.session.secret.as_bytes())?;
        let session_manager =
            SessionManagerAgent::spawn(runtime, config.session.max_age()).await?;
        let oauth2_manager = OAuth2Agent::spawn(runtime).await?;
        let resolver = CallbackResolver::new(store, &config.oauth2);

        Ok(Self {
            config: Arc::new(config),
            providers: Arc::new(registry),
            resolver,
            codec: Arc::new(JsonSessionCodec),
            signer,
            session_manager,
            oauth2_manager,
        })
    }

    /// Get configuration reference
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Registered provider clients
    #[must_use]
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Callback resolver
    #[must_use]
    pub const fn resolver(&self) -> &CallbackResolver {
        &self.resolver
    }

    /// Codec for the identity stored in sessions
    #[must_use]
    pub fn codec(&self) -> &dyn SessionCodec {
        self.codec.as_ref()
    }

    /// Session cookie signer
    #[must_use]
    pub const fn session_signer(&self) -> &SessionSigner {
        &self.signer
    }

    /// Session manager agent handle
    #[must_use]
    pub const fn session_manager(&self) -> &AgentHandle {
        &self.session_manager
    }

    /// OAuth2 state agent handle
    #[must_use]
    pub const fn oauth2_manager(&self) -> &AgentHandle {
        &self.oauth2_manager
    }

    /// How long to wait for an agent reply
    #[must_use]
    pub fn agent_timeout(&self) -> Duration {
        self.config.session.agent_timeout()
    }
}
