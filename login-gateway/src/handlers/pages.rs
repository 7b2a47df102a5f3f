//! Home, login, profile and logout pages

use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    Extension,
};

use super::redirect_found;
use crate::auth::{clear_identity, CurrentIdentity, OptionalSession};
use crate::error::GatewayError;
use crate::identity::UserIdentity;
use crate::middleware::SessionRotation;
use crate::oauth2::{PendingLogin, Provider};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    signed_in: bool,
}

/// One login button
#[derive(Debug)]
struct ProviderLink {
    slug: &'static str,
    label: &'static str,
}

impl From<Provider> for ProviderLink {
    fn from(provider: Provider) -> Self {
        Self {
            slug: provider.as_str(),
            label: provider.label(),
        }
    }
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    providers: Vec<ProviderLink>,
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate {
    provider: &'static str,
    provider_id: String,
    display_name: String,
    email: String,
}

impl From<UserIdentity> for ProfileTemplate {
    fn from(identity: UserIdentity) -> Self {
        Self {
            provider: identity.provider.label(),
            provider_id: identity.provider_id,
            display_name: identity.display_name,
            email: identity.email,
        }
    }
}

/// `GET /`
///
/// # Errors
///
/// Returns error if the template fails to render
pub async fn home(CurrentIdentity(identity): CurrentIdentity) -> Result<Html<String>, GatewayError> {
    let template = HomeTemplate {
        signed_in: identity.is_some(),
    };
    Ok(Html(template.render()?))
}

/// `GET /login`
///
/// # Errors
///
/// Returns error if the template fails to render
pub async fn login(State(state): State<AppState>) -> Result<Html<String>, GatewayError> {
    let template = LoginTemplate {
        providers: state
            .providers()
            .enabled()
            .into_iter()
            .map(ProviderLink::from)
            .collect(),
    };
    Ok(Html(template.render()?))
}

/// `GET /profile`
///
/// Redirects to `/login` when nobody is signed in.
///
/// # Errors
///
/// Returns error if the template fails to render
pub async fn profile(CurrentIdentity(identity): CurrentIdentity) -> Result<Response, GatewayError> {
    let Some(identity) = identity else {
        return Ok(redirect_found("/login"));
    };
    Ok(Html(ProfileTemplate::from(identity).render()?).into_response())
}

/// `GET /logout`
pub async fn logout(OptionalSession(session): OptionalSession) -> Response {
    match session {
        Some((_, mut session)) => {
            clear_identity(&mut session);
            session.remove(PendingLogin::SESSION_KEY);
            tracing::debug!("Signed out");
            (
                Extension(session),
                Extension(SessionRotation),
                redirect_found("/"),
            )
                .into_response()
        }
        None => redirect_found("/"),
    }
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
