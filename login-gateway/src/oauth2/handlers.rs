//! OAuth2 HTTP handlers
//!
//! - `GET /auth/{provider}` starts a login attempt
//! - `GET /auth/{provider}/callback` completes it
//!
//! Every failure after the provider has been parsed ends in a 302 to
//! `/login`. The reason is logged, never shown.

use acton_reactive::prelude::AgentHandleInterface;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Extension,
};
use serde::Deserialize;

use super::agent::{GenerateState, RemoveState, ValidateState};
use super::login::{AuthFailure, AuthFailureReason, LoginEvent, LoginPhase, PendingLogin};
use super::types::{OAuthError, Provider};
use crate::auth::{attach_identity, OptionalSession, SessionData};
use crate::error::GatewayError;
use crate::handlers::redirect_found;
use crate::identity::UserIdentity;
use crate::middleware::SessionRotation;
use crate::state::AppState;

/// Where failed attempts are sent
pub const LOGIN_PATH: &str = "/login";

/// OAuth2 callback query parameters
///
/// Every field is optional so a malformed callback still reaches the
/// handler and is reported as a failed login.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code from provider
    pub code: Option<String>,
    /// CSRF state token
    pub state: Option<String>,
    /// Error from provider
    pub error: Option<String>,
    /// Error description from provider
    pub error_description: Option<String>,
}

/// Start a login through `provider`
///
/// Issues a state token, stores the [`PendingLogin`] in the session and
/// redirects to the provider's authorization endpoint.
///
/// # Errors
///
/// Returns 404 for an unknown provider and 500 if the state agent does not
/// answer or the session cannot be written
pub async fn begin_authorization(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
    OptionalSession(session): OptionalSession,
) -> Result<Response, GatewayError> {
    let provider: Provider = provider_name.parse()?;

    if !provider.is_enabled() {
        tracing::info!(%provider, "Login requested for disabled provider");
        return Ok(redirect_found(LOGIN_PATH));
    }

    let Some(client) = state.providers().get(provider) else {
        tracing::warn!(%provider, "Login requested for unconfigured provider");
        return Ok(redirect_found(LOGIN_PATH));
    };

    let Some((_, mut session)) = session else {
        tracing::error!(
            %provider,
            reason = %AuthFailureReason::SessionAttachFailed,
            "No session to hold the login attempt"
        );
        return Ok(redirect_found(LOGIN_PATH));
    };

    let phase = LoginPhase::Unauthenticated.transition(LoginEvent::AuthorizationRequested)?;

    let (request, rx) = GenerateState::new(provider);
    state.oauth2_manager().send(request).await;
    let oauth_state = tokio::time::timeout(state.agent_timeout(), rx)
        .await
        .map_err(|_| GatewayError::Internal("OAuth2 state agent timed out".to_string()))?
        .map_err(|_| GatewayError::Internal("OAuth2 state agent dropped request".to_string()))?;

    let authorization = client.authorization_url(&oauth_state.token);
    let pending = PendingLogin {
        provider,
        state: oauth_state.token,
        pkce_verifier: authorization.pkce_verifier,
        phase: phase.transition(LoginEvent::RedirectIssued)?,
    };
    session.set(PendingLogin::SESSION_KEY, &pending)?;

    tracing::debug!(%provider, "Redirecting to provider");
    Ok((Extension(session), redirect_found(&authorization.url)).into_response())
}

/// Complete a login through `provider`
///
/// On success the identity is attached to the session, the session id is
/// rotated and the browser is sent to the provider's landing page.
///
/// # Errors
///
/// Returns 404 for an unknown provider. All other failures redirect to
/// `/login`.
pub async fn handle_callback(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
    Query(params): Query<CallbackParams>,
    OptionalSession(session): OptionalSession,
) -> Result<Response, GatewayError> {
    let provider: Provider = provider_name.parse()?;

    let Some((_, mut session)) = session else {
        log_failure(&AuthFailure::new(provider, AuthFailureReason::SessionAttachFailed));
        return Ok(redirect_found(LOGIN_PATH));
    };

    let pending: Option<PendingLogin> = session.get(PendingLogin::SESSION_KEY);
    session.remove(PendingLogin::SESSION_KEY);

    match complete_login(&state, provider, &params, pending, &mut session).await {
        Ok(identity) => {
            tracing::info!(%provider, identity_id = identity.id, "Login succeeded");
            Ok((
                Extension(session),
                Extension(SessionRotation),
                redirect_found(provider.success_redirect()),
            )
                .into_response())
        }
        Err(failure) => {
            log_failure(&failure);
            Ok((Extension(session), redirect_found(LOGIN_PATH)).into_response())
        }
    }
}

async fn complete_login(
    state: &AppState,
    provider: Provider,
    params: &CallbackParams,
    pending: Option<PendingLogin>,
    session: &mut SessionData,
) -> Result<UserIdentity, AuthFailure> {
    let fail = |reason: AuthFailureReason| AuthFailure::new(provider, reason);

    if let Some(error) = &params.error {
        if let Some(token) = &params.state {
            forget_state(state, token).await;
        }
        tracing::debug!(
            %provider,
            error = %error,
            description = params.error_description.as_deref().unwrap_or_default(),
            "Provider returned an error"
        );
        return Err(fail(if error == "access_denied" {
            AuthFailureReason::Denied
        } else {
            AuthFailureReason::ExchangeFailed
        }));
    }

    let Some(pending) = pending.filter(|pending| pending.provider == provider) else {
        tracing::warn!(%provider, "Callback without a matching login attempt");
        return Err(fail(AuthFailureReason::ExchangeFailed));
    };

    if let Err(e) = check_state(state, provider, params.state.as_deref(), &pending.state).await {
        tracing::warn!(%provider, error = %e, "OAuth2 state rejected");
        return Err(fail(AuthFailureReason::ExchangeFailed));
    }
    forget_state(state, &pending.state).await;

    let resolved = pending
        .phase
        .transition(LoginEvent::CallbackSucceeded)
        .map_err(|e| {
            tracing::warn!(%provider, error = %e, "Login attempt in unexpected phase");
            fail(AuthFailureReason::ExchangeFailed)
        })?;

    let Some(code) = params.code.as_deref().filter(|code| !code.is_empty()) else {
        tracing::warn!(%provider, "Callback without authorization code");
        return Err(fail(AuthFailureReason::ExchangeFailed));
    };

    let Some(client) = state.providers().get(provider) else {
        tracing::warn!(%provider, "Callback for unconfigured provider");
        return Err(fail(AuthFailureReason::ExchangeFailed));
    };

    let identity = state
        .resolver()
        .handle_callback(client.as_ref(), code, &pending.pkce_verifier)
        .await?;

    attach_identity(session, state.codec(), &identity).map_err(|e| {
        tracing::error!(%provider, error = %e, "Could not attach identity to session");
        fail(AuthFailureReason::SessionAttachFailed)
    })?;

    tracing::debug!(%provider, phase = ?resolved, "Login attempt finished");
    Ok(identity)
}

/// Check the callback's state against the pending attempt and the state agent
///
/// # Errors
///
/// Returns [`OAuthError::StateMismatch`] if the callback carries a different
/// token than the session, and [`OAuthError::InvalidState`] if the agent no
/// longer holds the token for `provider`
async fn check_state(
    state: &AppState,
    provider: Provider,
    received: Option<&str>,
    expected: &str,
) -> Result<(), OAuthError> {
    if received != Some(expected) {
        return Err(OAuthError::StateMismatch);
    }

    let (request, rx) = ValidateState::new(expected);
    state.oauth2_manager().send(request).await;

    match tokio::time::timeout(state.agent_timeout(), rx).await {
        Ok(Ok(Some(issued))) if issued.provider == provider => Ok(()),
        Ok(Ok(Some(_))) => {
            tracing::warn!(%provider, "OAuth2 state issued for another provider");
            Err(OAuthError::InvalidState)
        }
        Ok(Ok(None)) => Err(OAuthError::InvalidState),
        Ok(Err(_)) | Err(_) => {
            tracing::error!(%provider, "OAuth2 state agent did not answer");
            Err(OAuthError::InvalidState)
        }
    }
}

async fn forget_state(state: &AppState, token: &str) {
    state
        .oauth2_manager()
        .send(RemoveState {
            token: token.to_string(),
        })
        .await;
}

fn log_failure(failure: &AuthFailure) {
    let phase = LoginPhase::AwaitingCallback.transition(LoginEvent::Failed(failure.reason));
    match failure.reason {
        AuthFailureReason::Denied => tracing::info!(
            provider = %failure.provider,
            reason = %failure.reason,
            ?phase,
            "Login declined at provider"
        ),
        AuthFailureReason::ExchangeFailed => tracing::warn!(
            provider = %failure.provider,
            reason = %failure.reason,
            ?phase,
            "Login failed"
        ),
        AuthFailureReason::StorageError | AuthFailureReason::SessionAttachFailed => {
            tracing::error!(
                provider = %failure.provider,
                reason = %failure.reason,
                ?phase,
                "Login failed"
            );
        }
    }
}
