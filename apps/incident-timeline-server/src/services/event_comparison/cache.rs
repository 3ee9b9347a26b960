use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::types::{ComparisonResult, EventId, HourDifference};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparisonKey {
    event_ids: Vec<EventId>,
    filter: String,
    hour_difference: i64,
    company_id: Option<i64>,
}

impl ComparisonKey {
    pub fn new(
        event_ids: &[EventId],
        filter: String,
        hour_difference: HourDifference,
        company_id: Option<i64>,
    ) -> Self {
        let mut event_ids = event_ids.to_vec();
        event_ids.sort_unstable();
        event_ids.dedup();
        Self {
            event_ids,
            filter,
            hour_difference: hour_difference.hours(),
            company_id,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    result: Arc<ComparisonResult>,
    inserted_at: Instant,
}

/// Bounded, time-limited store of recent comparison results.
#[derive(Debug)]
pub struct ComparisonCache {
    entries: RwLock<HashMap<ComparisonKey, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl ComparisonCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub async fn get(&self, key: &ComparisonKey) -> Option<Arc<ComparisonResult>> {
        let mut entries = self.entries.write().await;
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            entries.remove(key);
            return None;
        }
        Some(entry.result.clone())
    }

    pub async fn insert(&self, key: ComparisonKey, result: Arc<ComparisonResult>) {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    pub async fn prune_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub fn start(self: Arc<Self>, cancel: CancellationToken) {
        let interval = self.ttl.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let pruned = self.prune_expired().await;
                        if pruned > 0 {
                            tracing::debug!(pruned, "pruned expired comparison cache entries");
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(event_ids: &[EventId], hours: i64) -> ComparisonKey {
        ComparisonKey::new(
            event_ids,
            "non_test".to_string(),
            HourDifference::new(hours).unwrap(),
            None,
        )
    }

    #[test]
    fn key_ignores_event_order_and_duplicates() {
        assert_eq!(key(&[3, 1, 2], 24), key(&[1, 2, 3, 3], 24));
        assert_ne!(key(&[1, 2], 24), key(&[1, 2], 12));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = ComparisonCache::new(Duration::from_secs(60), 8);
        cache
            .insert(key(&[1, 2], 24), Arc::new(ComparisonResult::default()))
            .await;
        assert!(cache.get(&key(&[2, 1], 24)).await.is_some());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get(&key(&[1, 2], 24)).await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_oldest_entry_at_capacity() {
        let cache = ComparisonCache::new(Duration::from_secs(600), 2);
        cache
            .insert(key(&[1, 2], 1), Arc::new(ComparisonResult::default()))
            .await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache
            .insert(key(&[1, 2], 2), Arc::new(ComparisonResult::default()))
            .await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache
            .insert(key(&[1, 2], 3), Arc::new(ComparisonResult::default()))
            .await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&key(&[1, 2], 1)).await.is_none());
        assert!(cache.get(&key(&[1, 2], 3)).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn prune_drops_only_expired_entries() {
        let cache = ComparisonCache::new(Duration::from_secs(30), 8);
        cache
            .insert(key(&[1, 2], 1), Arc::new(ComparisonResult::default()))
            .await;
        tokio::time::advance(Duration::from_secs(20)).await;
        cache
            .insert(key(&[1, 2], 2), Arc::new(ComparisonResult::default()))
            .await;
        tokio::time::advance(Duration::from_secs(15)).await;

        assert_eq!(cache.prune_expired().await, 1);
        assert_eq!(cache.len().await, 1);
    }
}
