//! Identity serialization into the session
//!
//! The signed-in identity is stored in [`SessionData`] under
//! [`IDENTITY_KEY`], encoded by a [`SessionCodec`] held in application state.

use serde::Deserialize;
use std::fmt;

use super::session::{SessionData, SessionError};
use crate::identity::UserIdentity;

/// Session key holding the signed-in identity
pub const IDENTITY_KEY: &str = "identity";

/// Converts identities to and from their session representation
pub trait SessionCodec: Send + Sync + fmt::Debug {
    /// Encode `identity` for storage in the session
    ///
    /// # Errors
    ///
    /// Returns error if the identity cannot be represented
    fn encode(&self, identity: &UserIdentity) -> Result<serde_json::Value, SessionError>;

    /// Decode an identity previously produced by [`SessionCodec::encode`]
    ///
    /// # Errors
    ///
    /// Returns error if `value` is not a valid encoding
    fn decode(&self, value: &serde_json::Value) -> Result<UserIdentity, SessionError>;
}

/// Stores the whole identity record as JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSessionCodec;

impl SessionCodec for JsonSessionCodec {
    fn encode(&self, identity: &UserIdentity) -> Result<serde_json::Value, SessionError> {
        Ok(serde_json::to_value(identity)?)
    }

    fn decode(&self, value: &serde_json::Value) -> Result<UserIdentity, SessionError> {
        UserIdentity::deserialize(value).map_err(|e| SessionError::Decode(e.to_string()))
    }
}

/// Attach `identity` to the session
///
/// # Errors
///
/// Returns error if the codec cannot encode the identity
pub fn attach_identity(
    session: &mut SessionData,
    codec: &dyn SessionCodec,
    identity: &UserIdentity,
) -> Result<(), SessionError> {
    let value = codec.encode(identity)?;
    session.set_raw(IDENTITY_KEY, value);
    Ok(())
}

/// Identity attached to the session, if any
///
/// An undecodable value is logged and treated as signed out.
#[must_use]
pub fn current_identity(session: &SessionData, codec: &dyn SessionCodec) -> Option<UserIdentity> {
    let value = session.get_raw(IDENTITY_KEY)?;
    match codec.decode(value) {
        Ok(identity) => Some(identity),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding undecodable session identity");
            None
        }
    }
}

/// Remove the identity from the session
pub fn clear_identity(session: &mut SessionData) {
    session.remove(IDENTITY_KEY);
}
