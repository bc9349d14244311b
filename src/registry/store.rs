//! Subscriber registry implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::subscriber::{Subscriber, SubscriberId};

/// Set of currently connected subscribers, keyed by id
///
/// Thread-safe via `RwLock`. The pump takes read locks for snapshots while
/// connection tasks take short write locks on connect and disconnect.
pub struct SubscriberRegistry {
    /// Map of subscriber id to handle
    subscribers: RwLock<HashMap<SubscriberId, Arc<Subscriber>>>,

    /// Id allocator for new connections
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a fresh subscriber id
    pub fn next_id(&self) -> SubscriberId {
        SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a subscriber
    ///
    /// Returns `false` and leaves the registry unchanged if the id is already present.
    pub async fn add(&self, subscriber: Arc<Subscriber>) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let id = subscriber.id();

        if subscribers.contains_key(&id) {
            tracing::warn!(subscriber = %id, "Subscriber already registered");
            return false;
        }

        subscribers.insert(id, subscriber);

        tracing::info!(
            subscriber = %id,
            subscribers = subscribers.len(),
            "Subscriber added"
        );

        true
    }

    /// Unregister a subscriber
    ///
    /// Removing an absent id is a no-op; disconnect races make it expected.
    pub async fn remove(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let removed = subscribers.remove(&id).is_some();

        if removed {
            tracing::info!(
                subscriber = %id,
                subscribers = subscribers.len(),
                "Subscriber removed"
            );
        } else {
            tracing::debug!(subscriber = %id, "Subscriber already absent");
        }

        removed
    }

    /// Copy of current membership, ordered by id
    pub async fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        let subscribers = self.subscribers.read().await;
        let mut snapshot: Vec<Arc<Subscriber>> = subscribers.values().cloned().collect();
        snapshot.sort_by_key(|s| s.id());
        snapshot
    }

    /// Check if a subscriber is registered
    pub async fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().await.contains_key(&id)
    }

    /// Number of registered subscribers
    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tokio_tungstenite::tungstenite::Utf8Bytes;

    use super::*;

    fn subscriber(
        registry: &SubscriberRegistry,
    ) -> (Arc<Subscriber>, tokio::sync::mpsc::Receiver<Utf8Bytes>) {
        let (sub, rx) = Subscriber::new(
            registry.next_id(),
            "127.0.0.1:40000".parse().unwrap(),
            8,
        );
        (Arc::new(sub), rx)
    }

    #[tokio::test]
    async fn test_add_remove() {
        let registry = SubscriberRegistry::new();
        let (sub, _rx) = subscriber(&registry);
        let id = sub.id();

        assert!(registry.add(sub).await);
        assert!(registry.contains(id).await);
        assert_eq!(registry.len().await, 1);

        assert!(registry.remove(id).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_add_duplicate_is_rejected() {
        let registry = SubscriberRegistry::new();
        let (sub, _rx) = subscriber(&registry);

        assert!(registry.add(Arc::clone(&sub)).await);
        assert!(!registry.add(sub).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let registry = SubscriberRegistry::new();
        let (sub, _rx) = subscriber(&registry);
        let id = sub.id();
        registry.add(sub).await;

        assert!(registry.remove(id).await);
        // Second unregister from a racing disconnect path
        assert!(!registry.remove(id).await);
        assert!(!registry.remove(SubscriberId(999)).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_is_ordered() {
        let registry = SubscriberRegistry::new();
        let mut receivers = Vec::new();
        let mut ids = Vec::new();

        for _ in 0..3 {
            let (sub, rx) = subscriber(&registry);
            ids.push(sub.id());
            receivers.push(rx);
            registry.add(sub).await;
        }

        let snapshot: Vec<SubscriberId> = registry.snapshot().await.iter().map(|s| s.id()).collect();
        assert_eq!(snapshot, ids);
    }

    #[tokio::test]
    async fn test_snapshot_survives_concurrent_removal() {
        let registry = SubscriberRegistry::new();
        let (a, mut rx_a) = subscriber(&registry);
        let (b, _rx_b) = subscriber(&registry);
        let a_id = a.id();
        registry.add(a).await;
        registry.add(b).await;

        let snapshot = registry.snapshot().await;
        registry.remove(a_id).await;

        // The snapshot still holds both handles
        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len().await, 1);
        snapshot[0].send(Utf8Bytes::from_static("{}")).await.unwrap();
        assert!(rx_a.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let registry = SubscriberRegistry::new();
        let first = registry.next_id();
        let second = registry.next_id();
        assert_ne!(first, second);
    }
}
