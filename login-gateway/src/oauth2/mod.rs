//! OAuth2 login through third-party identity providers
//!
//! Supports the authorization-code flow with PKCE for:
//! - Facebook
//! - Google
//! - GitHub
//!
//! Instagram is recognised but disabled.
//!
//! # Flow
//!
//! 1. `GET /auth/{provider}` issues a CSRF state token through
//!    [`agent::OAuth2Agent`], stores a [`PendingLogin`] in the session and
//!    redirects to the provider
//! 2. The provider redirects back to `/auth/{provider}/callback`
//! 3. [`CallbackResolver`] exchanges the code, fetches the profile and finds
//!    or creates the local identity
//! 4. The identity is attached to the session and the session id rotated

pub mod agent;
pub mod handlers;
pub mod http;
pub mod login;
pub mod providers;
pub mod resolver;
pub mod types;

pub use login::{
    AuthFailure, AuthFailureReason, InvalidTransition, LoginEvent, LoginPhase, PendingLogin,
};
pub use providers::{AuthorizationRequest, IdentityProvider, ProviderRegistry};
pub use resolver::CallbackResolver;
pub use types::{
    ExternalProfile, OAuthConfig, OAuthError, OAuthState, OAuthToken, Provider, ProviderConfig,
};
