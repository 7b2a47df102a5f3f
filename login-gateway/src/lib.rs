//! login-gateway - web login through third-party OAuth2 identity providers
//!
//! The gateway sends the browser to Facebook, Google or GitHub using the
//! OAuth2 authorization-code flow, resolves the returned profile to a local
//! [`identity::UserIdentity`] (creating it on first login) and keeps the
//! signed-in identity in a server-side session.
//!
//! # Example
//!
//! ```rust,no_run
//! use acton_reactive::prelude::*;
//! use login_gateway::prelude::*;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GatewayConfig::load()?;
//! config.validate()?;
//!
//! let mut runtime = ActonApp::launch();
//! let state = AppState::new(&mut runtime, config).await?;
//! let app = login_gateway::routes::router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod agents;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod oauth2;
pub mod observability;
pub mod routes;
pub mod state;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::{
        CurrentIdentity, JsonSessionCodec, OptionalSession, SessionCodec, SessionData,
        SessionError, SessionId,
    };
    pub use crate::config::{GatewayConfig, SessionSettings};
    pub use crate::error::GatewayError;
    pub use crate::identity::{
        IdentityStore, InMemoryIdentityStore, PgIdentityStore, StoreError, UserIdentity,
        UserIdentityDraft,
    };
    pub use crate::middleware::{SessionLayer, SessionRotation};
    pub use crate::oauth2::{
        AuthFailure, AuthFailureReason, CallbackResolver, ExternalProfile, IdentityProvider,
        LoginPhase, OAuthConfig, OAuthError, OAuthToken, Provider, ProviderConfig,
        ProviderRegistry,
    };
    pub use crate::state::AppState;
}
