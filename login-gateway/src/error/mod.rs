//! Error types and error handling
//!
//! Module errors convert into [`GatewayError`], which renders a generic body
//! so provider and storage internals never reach the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::SessionError;
use crate::config::ConfigError;
use crate::identity::StoreError;
use crate::oauth2::{InvalidTransition, OAuthError};

/// Gateway error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// OAuth2 error
    #[error("OAuth2 error: {0}")]
    OAuth(#[from] OAuthError),

    /// Identity store error
    #[error("Identity store error: {0}")]
    Store(#[from] StoreError),

    /// Session error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Login attempt moved through an invalid phase
    #[error("Login error: {0}")]
    Login(#[from] InvalidTransition),

    /// Template rendering error
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Not Found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server error
    #[error("Server error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status code for this error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::OAuth(OAuthError::UnknownProvider(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Config(_)
            | Self::OAuth(_)
            | Self::Store(_)
            | Self::Session(_)
            | Self::Login(_)
            | Self::Template(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = status.canonical_reason().unwrap_or("Error");
        (status, body).into_response()
    }
}
