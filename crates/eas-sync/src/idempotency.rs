//! Idempotent-resend cache for Sync responses (§5, §9).
//!
//! Keyed by `(user_id, device_id, collection_id, pending_sync_key)`: while a
//! batch is staged awaiting client confirmation, a client that resends the
//! same request (dropped response, retry before ack) must get back the
//! exact same bytes rather than a freshly queried one. Bounded and
//! in-memory only — losing entries on restart just means the next resend
//! falls through to a fresh query, which is safe, not byte-identical.

use std::collections::HashMap;

use eas_core::types::SyncBatch;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    user_id: String,
    device_id: String,
    collection_id: String,
    pending_sync_key: String,
}

struct Inner {
    entries: HashMap<CacheKey, SyncBatch>,
    /// Insertion order, oldest first, for FIFO eviction once `capacity` is
    /// exceeded. A plain Vec is fine at the ~1024-entry scale this cache
    /// runs at.
    order: Vec<CacheKey>,
    capacity: usize,
}

/// Bounded cache of the last response produced per pending sync key.
pub struct IdempotencyCache {
    inner: Mutex<Inner>,
}

impl IdempotencyCache {
    pub fn new(capacity: usize) -> Self {
        IdempotencyCache {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: Vec::new(),
                capacity,
            }),
        }
    }

    pub async fn get(
        &self,
        user_id: &str,
        device_id: &str,
        collection_id: &str,
        pending_sync_key: &str,
    ) -> Option<SyncBatch> {
        let key = CacheKey {
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            collection_id: collection_id.to_string(),
            pending_sync_key: pending_sync_key.to_string(),
        };
        let inner = self.inner.lock().await;
        inner.entries.get(&key).cloned()
    }

    pub async fn put(
        &self,
        user_id: &str,
        device_id: &str,
        collection_id: &str,
        pending_sync_key: &str,
        batch: SyncBatch,
    ) {
        let key = CacheKey {
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            collection_id: collection_id.to_string(),
            pending_sync_key: pending_sync_key.to_string(),
        };
        let mut inner = self.inner.lock().await;
        if !inner.entries.contains_key(&key) {
            inner.order.push(key.clone());
        }
        inner.entries.insert(key, batch);

        while inner.entries.len() > inner.capacity {
            let oldest = inner.order.remove(0);
            inner.entries.remove(&oldest);
        }
    }

    /// Drops any cached batch for a collection once its pending key has been
    /// committed or superseded, so stale entries don't linger past their
    /// usefulness window.
    pub async fn invalidate(
        &self,
        user_id: &str,
        device_id: &str,
        collection_id: &str,
        pending_sync_key: &str,
    ) {
        let key = CacheKey {
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            collection_id: collection_id.to_string(),
            pending_sync_key: pending_sync_key.to_string(),
        };
        let mut inner = self.inner.lock().await;
        inner.entries.remove(&key);
        inner.order.retain(|k| k != &key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(key: &str) -> SyncBatch {
        SyncBatch {
            response_sync_key: eas_core::types::SyncKey::from_wire(key.to_string()),
            payload: vec![1, 2, 3],
            sent_count: 1,
            more_available: false,
        }
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrips() {
        let cache = IdempotencyCache::new(8);
        cache.put("u1", "d1", "1", "2", batch("2")).await;
        let got = cache.get("u1", "d1", "1", "2").await;
        assert!(got.is_some());
        assert_eq!(got.unwrap().payload, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_miss_returns_none() {
        let cache = IdempotencyCache::new(8);
        assert!(cache.get("u1", "d1", "1", "2").await.is_none());
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let cache = IdempotencyCache::new(2);
        cache.put("u1", "d1", "1", "1", batch("1")).await;
        cache.put("u1", "d1", "1", "2", batch("2")).await;
        cache.put("u1", "d1", "1", "3", batch("3")).await;

        assert!(cache.get("u1", "d1", "1", "1").await.is_none());
        assert!(cache.get("u1", "d1", "1", "3").await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = IdempotencyCache::new(8);
        cache.put("u1", "d1", "1", "2", batch("2")).await;
        cache.invalidate("u1", "d1", "1", "2").await;
        assert!(cache.get("u1", "d1", "1", "2").await.is_none());
    }
}
