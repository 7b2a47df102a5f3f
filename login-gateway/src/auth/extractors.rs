//! Session and identity extractors
//!
//! Session data is placed in request extensions by
//! [`crate::middleware::SessionLayer`]. Handlers that change it return the
//! modified [`SessionData`] as a response extension.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use std::convert::Infallible;

use super::codec::current_identity;
use super::session::{SessionData, SessionId};
use crate::identity::UserIdentity;
use crate::state::AppState;

/// Optional session extractor
///
/// `None` when no session is attached to the request.
#[derive(Debug, Clone)]
pub struct OptionalSession(pub Option<(SessionId, SessionData)>);

impl<S> FromRequestParts<S> for OptionalSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<SessionId>()
            .cloned()
            .and_then(|id| {
                parts
                    .extensions
                    .get::<SessionData>()
                    .cloned()
                    .map(|data| (id, data))
            });

        Ok(Self(session))
    }
}

/// The signed-in identity, decoded with the application's session codec
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Option<UserIdentity>);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let identity = parts
            .extensions
            .get::<SessionData>()
            .and_then(|session| current_identity(session, app_state.codec()));

        Ok(Self(identity))
    }
}
