//! Silence registry trait and in-memory fake.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, SilenceError};
use crate::types::Silence;

/// Client-side view of the silence registry.
///
/// Three primitive operations plus one provided convenience. No retries
/// anywhere; callers decide what a failure means.
pub trait SilenceRegistry: Send + Sync {
    /// Create a silence.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry rejects or never receives the
    /// request.
    fn create<'a>(
        &'a self,
        silence: &'a Silence,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// List every silence the registry holds, owned by this system or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails or cannot be decoded.
    fn list<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<Silence>>> + Send + 'a>>;

    /// Delete a silence by its registry-assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails, including for unknown ids.
    fn delete_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Delete every silence this system owns for `node`.
    ///
    /// Lists, filters by creator identity and comment, and deletes each
    /// match by id. Returns how many silences were deleted. Stops at the
    /// first failed deletion so the caller can retry the remainder later.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing or any deletion fails.
    fn delete_for_node<'a>(
        &'a self,
        node: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>> {
        Box::pin(async move {
            let silences = self.list().await?;
            let mut deleted = 0;
            for silence in silences.iter().filter(|s| s.is_owned() && s.covers_node(node)) {
                let Some(id) = silence.id.as_deref() else {
                    continue;
                };
                self.delete_by_id(id).await?;
                deleted += 1;
            }
            Ok(deleted)
        })
    }
}

/// In-memory registry for testing.
///
/// Assigns ids on create the way the real registry does and keeps
/// counters so tests can assert how many calls reached it. Requests can
/// be made to fail to exercise error paths.
#[derive(Debug, Default)]
pub struct FakeRegistry {
    silences: RwLock<Vec<Silence>>,
    created: AtomicUsize,
    deleted: AtomicUsize,
    fail: AtomicBool,
}

impl FakeRegistry {
    /// Create an empty fake registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a silence as if it already existed, returning its id.
    pub async fn seed(&self, mut silence: Silence) -> String {
        let id = Uuid::new_v4().to_string();
        silence.id = Some(id.clone());
        self.silences.write().await.push(silence);
        id
    }

    /// Snapshot of the stored silences.
    pub async fn silences(&self) -> Vec<Silence> {
        self.silences.read().await.clone()
    }

    /// Number of successful create calls.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of successful delete calls.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }

    /// Make every subsequent request fail (or succeed again).
    pub fn fail_requests(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SilenceError::Request {
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl SilenceRegistry for FakeRegistry {
    fn create<'a>(
        &'a self,
        silence: &'a Silence,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.check_available()?;
            let mut stored = silence.clone();
            stored.id = Some(Uuid::new_v4().to_string());
            self.silences.write().await.push(stored);
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn list<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<Silence>>> + Send + 'a>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.silences.read().await.clone())
        })
    }

    fn delete_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.check_available()?;
            let mut silences = self.silences.write().await;
            let before = silences.len();
            silences.retain(|s| s.id.as_deref() != Some(id));
            if silences.len() == before {
                // The real registry answers 404 for unknown ids.
                return Err(SilenceError::UnexpectedStatus { status: 404 });
            }
            self.deleted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{instance_silence, node_silence};
    use chrono::Duration;

    fn ttl() -> Duration {
        Duration::minutes(90)
    }

    #[tokio::test]
    async fn create_assigns_an_id() {
        let registry = FakeRegistry::new();
        registry.create(&node_silence("worker-1", ttl())).await.unwrap();

        let stored = registry.silences().await;
        assert_eq!(stored.len(), 1);
        assert!(stored[0].id.is_some());
        assert_eq!(registry.created_count(), 1);
    }

    #[tokio::test]
    async fn delete_by_unknown_id_is_a_404() {
        let registry = FakeRegistry::new();
        let err = registry.delete_by_id("no-such-id").await.unwrap_err();
        assert!(matches!(err, SilenceError::UnexpectedStatus { status: 404 }));
    }

    #[tokio::test]
    async fn delete_for_node_removes_only_owned_matching_silences() {
        let registry = FakeRegistry::new();
        registry.create(&node_silence("worker-1", ttl())).await.unwrap();
        registry.create(&instance_silence("worker-1", ttl())).await.unwrap();
        registry.create(&node_silence("worker-2", ttl())).await.unwrap();

        let mut foreign = node_silence("worker-1", ttl());
        foreign.created_by = "oncall".to_string();
        registry.seed(foreign).await;

        let deleted = registry.delete_for_node("worker-1").await.unwrap();
        assert_eq!(deleted, 2);

        let remaining = registry.silences().await;
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().any(|s| !s.is_owned()));
        assert!(remaining.iter().any(|s| s.covers_node("worker-2")));
    }

    #[tokio::test]
    async fn delete_for_node_ignores_lookalike_names() {
        let registry = FakeRegistry::new();
        registry.create(&node_silence("worker-3", ttl())).await.unwrap();
        registry.create(&node_silence("worker-30", ttl())).await.unwrap();

        let deleted = registry.delete_for_node("worker-3").await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = registry.silences().await;
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].covers_node("worker-30"));
    }

    #[tokio::test]
    async fn delete_for_node_with_nothing_to_do() {
        let registry = FakeRegistry::new();
        assert_eq!(registry.delete_for_node("worker-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn injected_failure_surfaces_as_request_error() {
        let registry = FakeRegistry::new();
        registry.fail_requests(true);

        let err = registry.list().await.unwrap_err();
        assert!(matches!(err, SilenceError::Request { .. }));

        let err = registry
            .create(&node_silence("worker-1", ttl()))
            .await
            .unwrap_err();
        assert!(matches!(err, SilenceError::Request { .. }));
    }
}
