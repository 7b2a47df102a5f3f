//! Identity resolution against a real store implementation

use async_trait::async_trait;
use login_gateway::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

/// Holds the first two lookups until both have started, forcing a
/// lookup-then-create race
struct RacingStore {
    inner: InMemoryIdentityStore,
    lookups: AtomicUsize,
    barrier: Barrier,
}

impl RacingStore {
    fn new() -> Self {
        Self {
            inner: InMemoryIdentityStore::new(),
            lookups: AtomicUsize::new(0),
            barrier: Barrier::new(2),
        }
    }
}

#[async_trait]
impl IdentityStore for RacingStore {
    async fn find_by_provider_identity(
        &self,
        provider: Provider,
        provider_id: &str,
    ) -> Result<Option<UserIdentity>, StoreError> {
        let result = self.inner.find_by_provider_identity(provider, provider_id).await;
        if self.lookups.fetch_add(1, Ordering::SeqCst) < 2 {
            self.barrier.wait().await;
        }
        result
    }

    async fn create(&self, draft: &UserIdentityDraft) -> Result<UserIdentity, StoreError> {
        self.inner.create(draft).await
    }

    async fn refresh_profile(
        &self,
        id: i64,
        draft: &UserIdentityDraft,
    ) -> Result<UserIdentity, StoreError> {
        self.inner.refresh_profile(id, draft).await
    }
}

fn ada() -> ExternalProfile {
    ExternalProfile {
        provider_id: "42".to_string(),
        display_name: "Ada".to_string(),
        emails: vec!["a@x.com".to_string()],
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_first_logins_yield_one_identity() {
    let store = Arc::new(RacingStore::new());
    let resolver = CallbackResolver::new(store.clone(), &OAuthConfig::default());
    let token = OAuthToken::bearer("token");
    let profile = ada();

    let (first, second) = tokio::join!(
        resolver.resolve_identity(Provider::GitHub, &profile, &token),
        resolver.resolve_identity(Provider::GitHub, &profile, &token),
    );

    let first = first.expect("first login resolves");
    let second = second.expect("second login resolves");
    assert_eq!(first.id, second.id);
    assert_eq!(store.inner.len(), 1);
    assert!(store.lookups.load(Ordering::SeqCst) >= 3);
}

#[tokio::test]
async fn test_repeat_login_returns_same_identity() {
    let store = Arc::new(InMemoryIdentityStore::new());
    let resolver = CallbackResolver::new(store.clone(), &OAuthConfig::default());
    let profile = ada();

    let first = resolver
        .resolve_identity(Provider::GitHub, &profile, &OAuthToken::bearer("one"))
        .await
        .unwrap();
    let second = resolver
        .resolve_identity(Provider::GitHub, &profile, &OAuthToken::bearer("two"))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.access_token, "one");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_refresh_on_login_updates_profile() {
    let store = Arc::new(InMemoryIdentityStore::new());
    let config = OAuthConfig {
        refresh_on_login: true,
        ..OAuthConfig::default()
    };
    let resolver = CallbackResolver::new(store.clone(), &config);

    let first = resolver
        .resolve_identity(Provider::GitHub, &ada(), &OAuthToken::bearer("one"))
        .await
        .unwrap();

    let renamed = ExternalProfile {
        display_name: "Ada Lovelace".to_string(),
        ..ada()
    };
    let second = resolver
        .resolve_identity(Provider::GitHub, &renamed, &OAuthToken::bearer("two"))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.display_name, "Ada Lovelace");
    assert_eq!(second.access_token, "two");
}

#[tokio::test]
async fn test_same_subject_different_provider_is_distinct() {
    let store = Arc::new(InMemoryIdentityStore::new());
    let resolver = CallbackResolver::new(store.clone(), &OAuthConfig::default());
    let token = OAuthToken::bearer("token");

    let github = resolver
        .resolve_identity(Provider::GitHub, &ada(), &token)
        .await
        .unwrap();
    let google = resolver
        .resolve_identity(Provider::Google, &ada(), &token)
        .await
        .unwrap();

    assert_ne!(github.id, google.id);
    assert_eq!(store.len(), 2);
}
