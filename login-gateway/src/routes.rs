//! Router assembly

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::SessionLayer;
use crate::oauth2::handlers::{begin_authorization, handle_callback};
use crate::state::AppState;

/// Build the gateway router with sessions and request tracing installed
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/login", get(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/profile", get(handlers::profile))
        .route("/health", get(handlers::health))
        .route("/auth/{provider}", get(begin_authorization))
        .route("/auth/{provider}/callback", get(handle_callback))
        .layer(SessionLayer::new(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
