//! Login attempt lifecycle
//!
//! Every attempt moves through [`LoginPhase`]:
//!
//! ```text
//! Unauthenticated -> AwaitingProviderRedirect -> AwaitingCallback -> Resolved
//!                                 \                    \
//!                                  `--------------------`-------> Failed(reason)
//! ```
//!
//! `Resolved` and `Failed` are terminal.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::Provider;

/// Why a login attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailureReason {
    /// The user declined at the provider
    Denied,
    /// Code exchange, profile fetch or state check failed
    ExchangeFailed,
    /// The identity store failed during lookup or create
    StorageError,
    /// No session to read the pending login from or attach the identity to
    SessionAttachFailed,
}

impl AuthFailureReason {
    /// Stable name used in logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Denied => "denied",
            Self::ExchangeFailed => "exchange_failed",
            Self::StorageError => "storage_error",
            Self::SessionAttachFailed => "session_error",
        }
    }
}

impl fmt::Display for AuthFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed login attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("login via {provider} failed: {reason}")]
pub struct AuthFailure {
    /// Provider the attempt went through
    pub provider: Provider,
    /// Failure reason
    pub reason: AuthFailureReason,
}

impl AuthFailure {
    /// Create a failure for `provider`
    #[must_use]
    pub const fn new(provider: Provider, reason: AuthFailureReason) -> Self {
        Self { provider, reason }
    }
}

/// Phase of a single login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "reason", rename_all = "snake_case")]
pub enum LoginPhase {
    /// No attempt in progress
    Unauthenticated,
    /// State issued, redirect to the provider being built
    AwaitingProviderRedirect,
    /// Browser sent to the provider, waiting for the callback
    AwaitingCallback,
    /// Identity resolved and attached to the session
    Resolved,
    /// Attempt failed
    Failed(AuthFailureReason),
}

/// Events that move a [`LoginPhase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginEvent {
    /// `/auth/{provider}` requested
    AuthorizationRequested,
    /// Redirect to the provider issued
    RedirectIssued,
    /// Callback resolved an identity
    CallbackSucceeded,
    /// Attempt failed
    Failed(AuthFailureReason),
}

/// Transition not allowed from the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid login transition from {from:?} on {event:?}")]
pub struct InvalidTransition {
    /// Phase the transition was attempted from
    pub from: LoginPhase,
    /// Rejected event
    pub event: LoginEvent,
}

impl LoginPhase {
    /// Apply `event`
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when `event` is not valid in this phase.
    /// Terminal phases reject every event.
    pub const fn transition(self, event: LoginEvent) -> Result<Self, InvalidTransition> {
        match (self, event) {
            (Self::Unauthenticated, LoginEvent::AuthorizationRequested) => {
                Ok(Self::AwaitingProviderRedirect)
            }
            (Self::AwaitingProviderRedirect, LoginEvent::RedirectIssued) => {
                Ok(Self::AwaitingCallback)
            }
            (Self::AwaitingCallback, LoginEvent::CallbackSucceeded) => Ok(Self::Resolved),
            (
                Self::Unauthenticated | Self::AwaitingProviderRedirect | Self::AwaitingCallback,
                LoginEvent::Failed(reason),
            ) => Ok(Self::Failed(reason)),
            (from, event) => Err(InvalidTransition { from, event }),
        }
    }
}

/// Login attempt data kept in the session between redirect and callback
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    /// Provider the browser was sent to
    pub provider: Provider,
    /// CSRF state token embedded in the authorization URL
    pub state: String,
    /// PKCE verifier for the code exchange
    pub pkce_verifier: String,
    /// Current phase
    pub phase: LoginPhase,
}

impl PendingLogin {
    /// Session key holding the pending login
    pub const SESSION_KEY: &'static str = "pending_login";
}

impl fmt::Debug for PendingLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingLogin")
            .field("provider", &self.provider)
            .field("state", &"<redacted>")
            .field("pkce_verifier", &"<redacted>")
            .field("phase", &self.phase)
            .finish()
    }
}
