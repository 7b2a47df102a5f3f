//! Tower middleware

pub mod session;

pub use session::{SessionConfig, SessionLayer, SessionMiddleware, SessionRotation, SessionSigner};
