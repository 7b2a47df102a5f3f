//! acton-reactive agents
//!
//! Shared mutable state lives in agents and is reached by message passing:
//! the session store here, the OAuth2 state tokens in
//! [`crate::oauth2::agent`].

use acton_reactive::prelude::{AgentConfig, Ern};

pub mod request_reply;
pub mod session_manager;

pub use request_reply::{create_request_reply, send_response, ResponseChannel};
pub use session_manager::{
    CleanupExpired, DeleteSession, LoadSession, SaveSession, SessionManagerAgent,
};

/// Create a standalone agent configuration rooted at `name`
///
/// # Errors
///
/// Returns an error if the ERN cannot be created (invalid name format)
pub fn default_agent_config(name: &str) -> anyhow::Result<AgentConfig> {
    Ok(AgentConfig::new(Ern::with_root(name)?, None, None)?)
}
