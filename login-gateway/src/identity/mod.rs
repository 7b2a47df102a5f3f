//! Local identity records and their persistence
//!
//! A [`UserIdentity`] is created the first time a provider vouches for a
//! subject and is looked up by `(provider, provider_id)` on later logins.

pub mod memory;
pub mod postgres;
pub mod store;
pub mod types;

pub use memory::InMemoryIdentityStore;
pub use postgres::PgIdentityStore;
pub use store::{IdentityStore, StoreError};
pub use types::{UserIdentity, UserIdentityDraft};

#[cfg(test)]
pub use store::MockIdentityStore;
