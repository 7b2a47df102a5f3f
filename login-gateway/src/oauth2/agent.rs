//! OAuth2 state token agent
//!
//! Issues the CSRF state tokens sent to providers and checks them when the
//! callback arrives. Tokens are single use and expire after ten minutes.

use acton_reactive::prelude::*;
use std::collections::HashMap;
use std::time::SystemTime;
use tokio::sync::oneshot;

use super::types::{OAuthState, Provider};
use crate::agents::{create_request_reply, default_agent_config, send_response, ResponseChannel};

/// OAuth2 state management agent
#[derive(Debug, Default, Clone)]
pub struct OAuth2Agent {
    /// Outstanding state tokens
    states: HashMap<String, OAuthState>,
}

impl OAuth2Agent {
    fn cleanup_expired(&mut self) -> usize {
        let before = self.states.len();
        let now = SystemTime::now();
        self.states.retain(|_, state| state.expires_at > now);
        before - self.states.len()
    }
}

/// Generate a state token for `provider`
#[derive(Debug, Clone)]
pub struct GenerateState {
    /// Provider for this state
    pub provider: Provider,
    /// Response channel
    pub response_tx: ResponseChannel<OAuthState>,
}

impl GenerateState {
    /// Create a new generate state request with response channel
    #[must_use]
    pub fn new(provider: Provider) -> (Self, oneshot::Receiver<OAuthState>) {
        let (response_tx, rx) = create_request_reply();
        (
            Self {
                provider,
                response_tx,
            },
            rx,
        )
    }
}

/// Look up an unexpired state token
#[derive(Debug, Clone)]
pub struct ValidateState {
    /// State token to validate
    pub token: String,
    /// Response channel
    pub response_tx: ResponseChannel<Option<OAuthState>>,
}

impl ValidateState {
    /// Create a new validate state request with response channel
    #[must_use]
    pub fn new(token: impl Into<String>) -> (Self, oneshot::Receiver<Option<OAuthState>>) {
        let (response_tx, rx) = create_request_reply();
        (
            Self {
                token: token.into(),
                response_tx,
            },
            rx,
        )
    }
}

/// Forget a state token once its callback has been handled
#[derive(Debug, Clone)]
pub struct RemoveState {
    /// State token to remove
    pub token: String,
}

/// Drop expired state tokens
#[derive(Debug, Clone)]
pub struct CleanupExpired;

impl OAuth2Agent {
    /// Spawn the OAuth2 state agent
    ///
    /// # Errors
    ///
    /// Returns error if agent configuration or spawning fails
    pub async fn spawn(runtime: &mut AgentRuntime) -> anyhow::Result<AgentHandle> {
        let config = default_agent_config("oauth2_manager")?;
        let mut builder = runtime.new_agent_with_config::<Self>(config).await;

        builder
            .mutate_on::<GenerateState>(|agent, envelope| {
                let response_tx = envelope.message().response_tx.clone();
                let provider = envelope.message().provider;

                agent.model.cleanup_expired();

                let state = OAuthState::generate(provider);
                agent.model.states.insert(state.token.clone(), state.clone());

                tracing::debug!(%provider, "Issued OAuth2 state token");

                AgentReply::from_async(async move {
                    let _ = send_response(response_tx, state).await;
                })
            })
            .mutate_on::<ValidateState>(|agent, envelope| {
                let token = envelope.message().token.clone();
                let response_tx = envelope.message().response_tx.clone();

                agent.model.cleanup_expired();

                let state = agent.model.states.get(&token).cloned();
                if state.is_none() {
                    tracing::debug!("Unknown or expired OAuth2 state token");
                }

                AgentReply::from_async(async move {
                    let _ = send_response(response_tx, state).await;
                })
            })
            .mutate_on::<RemoveState>(|agent, envelope| {
                if let Some(state) = agent.model.states.remove(&envelope.message().token) {
                    tracing::debug!(provider = %state.provider, "Consumed OAuth2 state token");
                }
                AgentReply::immediate()
            })
            .mutate_on::<CleanupExpired>(|agent, _envelope| {
                let removed = agent.model.cleanup_expired();
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        remaining = agent.model.states.len(),
                        "Cleaned up expired OAuth2 state tokens"
                    );
                }
                AgentReply::immediate()
            })
            .after_start(|_agent| async {
                tracing::info!("OAuth2 state agent started");
            })
            .after_stop(|agent| {
                let tokens = agent.model.states.len();
                async move {
                    tracing::info!(tokens, "OAuth2 state agent stopped");
                }
            });

        Ok(builder.start().await)
    }
}
