//! Session middleware
//!
//! Reads the signed session cookie, loads the session from the
//! `SessionManagerAgent` and exposes it to handlers through request
//! extensions. A session is only saved when the handler returns it in the
//! response extensions or asks for a [`SessionRotation`]. New sessions are
//! saved, and get a cookie, only once they hold data.
//!
//! Cookie format: `{session id}.{hex HMAC-SHA256 of the id}`.

use acton_reactive::prelude::{AgentHandle, AgentHandleInterface};
use axum::{
    body::Body,
    extract::Request,
    http::header::{COOKIE, SET_COOKIE},
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service};

use crate::agents::{DeleteSession, LoadSession, SaveSession};
use crate::auth::session::{SessionData, SessionError, SessionId};
use crate::config::SessionSettings;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Response marker asking the middleware to move the session to a new id
///
/// Handlers add it on login and logout so a session id seen before
/// authentication is never reused after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionRotation;

/// Signs and verifies session cookie values
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner").finish_non_exhaustive()
    }
}

impl SessionSigner {
    /// Create a signer keyed with `secret`
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidKey`] if the key is rejected
    pub fn new(secret: &[u8]) -> Result<Self, SessionError> {
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| SessionError::InvalidKey)?;
        Ok(Self { mac })
    }

    fn signature(&self, session_id: &SessionId) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(session_id.as_str().as_bytes());
        mac
    }

    /// Cookie value for `session_id`
    #[must_use]
    pub fn sign(&self, session_id: &SessionId) -> String {
        let tag = self.signature(session_id).finalize().into_bytes();
        format!("{}.{}", session_id.as_str(), hex::encode(tag))
    }

    /// Session id from a cookie value, if its signature verifies
    ///
    /// # Errors
    ///
    /// Returns error if the value is malformed or the signature is wrong
    pub fn verify(&self, cookie_value: &str) -> Result<SessionId, SessionError> {
        let (id, tag) = cookie_value
            .split_once('.')
            .ok_or(SessionError::InvalidSignature)?;
        let session_id = SessionId::try_from_string(id.to_string())?;
        let tag = hex::decode(tag).map_err(|_| SessionError::InvalidSignature)?;

        self.signature(&session_id)
            .verify_slice(&tag)
            .map_err(|_| SessionError::InvalidSignature)?;

        Ok(session_id)
    }
}

/// Session configuration for middleware
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Cookie name for session ID
    pub cookie_name: String,
    /// Cookie path
    pub cookie_path: String,
    /// Secure cookie (HTTPS only)
    pub secure: bool,
    /// Session lifetime, also sent as the cookie `Max-Age`
    pub max_age: chrono::Duration,
    /// Timeout for agent communication
    pub agent_timeout: Duration,
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            cookie_name: settings.cookie_name.clone(),
            cookie_path: "/".to_string(),
            secure: settings.secure_cookies,
            max_age: settings.max_age(),
            agent_timeout: settings.agent_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&SessionSettings::default())
    }
}

/// Layer for session middleware
#[derive(Clone)]
pub struct SessionLayer {
    config: Arc<SessionConfig>,
    signer: SessionSigner,
    session_manager: AgentHandle,
}

impl std::fmt::Debug for SessionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLayer")
            .field("config", &self.config)
            .field("session_manager", &"AgentHandle")
            .finish_non_exhaustive()
    }
}

impl SessionLayer {
    /// Create the layer from application state
    #[must_use]
    pub fn new(state: &AppState) -> Self {
        Self::from_parts(
            SessionConfig::from(&state.config().session),
            state.session_signer().clone(),
            state.session_manager().clone(),
        )
    }

    /// Create the layer from its parts
    #[must_use]
    pub fn from_parts(
        config: SessionConfig,
        signer: SessionSigner,
        session_manager: AgentHandle,
    ) -> Self {
        Self {
            config: Arc::new(config),
            signer,
            session_manager,
        }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware {
            inner,
            config: self.config.clone(),
            signer: self.signer.clone(),
            session_manager: self.session_manager.clone(),
        }
    }
}

/// Session middleware that handles cookie-based sessions
#[derive(Clone)]
pub struct SessionMiddleware<S> {
    inner: S,
    config: Arc<SessionConfig>,
    signer: SessionSigner,
    session_manager: AgentHandle,
}

impl<S: std::fmt::Debug> std::fmt::Debug for SessionMiddleware<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMiddleware")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .field("session_manager", &"AgentHandle")
            .finish_non_exhaustive()
    }
}

impl<S> Service<Request> for SessionMiddleware<S>
where
    S: Service<Request, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let config = self.config.clone();
        let signer = self.signer.clone();
        let session_manager = self.session_manager.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let existing = extract_cookie(&req, &config.cookie_name)
                .and_then(|value| signer.verify(&value).ok());

            let loaded = match existing {
                Some(id) => {
                    let (request, rx) = LoadSession::with_response(id.clone());
                    session_manager.send(request).await;
                    match tokio::time::timeout(config.agent_timeout, rx).await {
                        Ok(Ok(Some(data))) => Some((id, data)),
                        Ok(Ok(None)) => None,
                        Ok(Err(_)) | Err(_) => {
                            tracing::warn!("Session manager did not answer, starting new session");
                            None
                        }
                    }
                }
                None => None,
            };

            let is_new = loaded.is_none();
            let (session_id, session_data) = loaded.unwrap_or_else(|| {
                (
                    SessionId::generate(),
                    SessionData::with_expiration(config.max_age),
                )
            });

            req.extensions_mut().insert(session_id.clone());
            req.extensions_mut().insert(session_data.clone());

            let mut response = inner.call(req).await?;

            let rotate = response.extensions().get::<SessionRotation>().is_some();
            let returned = response.extensions_mut().remove::<SessionData>();

            // Loading already refreshed an unchanged session, and an empty new
            // one is never stored
            let final_session_data = match returned {
                Some(data) if !(is_new && data.is_empty()) => data,
                None if rotate && !is_new => session_data,
                _ => return Ok(response),
            };

            let session_id = if rotate && !is_new {
                session_manager
                    .send(DeleteSession {
                        session_id: session_id.clone(),
                    })
                    .await;
                tracing::debug!("Rotated session id");
                SessionId::generate()
            } else {
                session_id
            };

            session_manager
                .send(SaveSession::new(session_id.clone(), final_session_data))
                .await;

            if is_new || rotate {
                set_session_cookie(&mut response, &signer.sign(&session_id), &config);
            }

            Ok(response)
        })
    }
}

/// Raw value of cookie `cookie_name`
fn extract_cookie(req: &Request, cookie_name: &str) -> Option<String> {
    req.headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .map(|(_, value)| value.trim().to_string())
}

/// Set session cookie on response
fn set_session_cookie(response: &mut Response<Body>, value: &str, config: &SessionConfig) {
    let mut cookie_value = format!(
        "{}={}; Path={}; Max-Age={}; SameSite=Lax; HttpOnly",
        config.cookie_name,
        value,
        config.cookie_path,
        config.max_age.num_seconds(),
    );

    if config.secure {
        cookie_value.push_str("; Secure");
    }

    if let Ok(header_value) = cookie_value.parse() {
        response.headers_mut().append(SET_COOKIE, header_value);
    }
}
