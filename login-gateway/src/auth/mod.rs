//! Sessions and the signed-in identity

pub mod codec;
pub mod extractors;
pub mod session;

pub use codec::{
    attach_identity, clear_identity, current_identity, JsonSessionCodec, SessionCodec,
    IDENTITY_KEY,
};
pub use extractors::{CurrentIdentity, OptionalSession};
pub use session::{SessionData, SessionError, SessionId};
