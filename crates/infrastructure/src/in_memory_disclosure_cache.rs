use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use carelink_application::{CacheLookup, CachedDisclosureView, DisclosureCache, DisclosureCacheKey};
use carelink_core::AppResult;
use tokio::sync::RwLock;

/// How long an invalidation marker outlives the invalidation that created it.
///
/// Must exceed the longest store read a cache-miss can wrap.
const GENERATION_RETENTION: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct DisclosureCacheEntry {
    view: CachedDisclosureView,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct GenerationMarker {
    generation: u64,
    invalidated_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<DisclosureCacheKey, DisclosureCacheEntry>,
    generations: HashMap<DisclosureCacheKey, GenerationMarker>,
    last_generation: u64,
}

impl CacheState {
    fn generation_of(&self, key: &DisclosureCacheKey) -> u64 {
        self.generations
            .get(key)
            .map_or(0, |marker| marker.generation)
    }

    fn sweep(&mut self, now: Instant) {
        self.entries.retain(|_, entry| entry.expires_at > now);
        self.generations.retain(|_, marker| {
            now.saturating_duration_since(marker.invalidated_at) < GENERATION_RETENTION
        });
    }
}

/// In-memory cache adapter for consent list and permission views.
///
/// Expired entries and old invalidation markers are swept on every write.
#[derive(Debug, Default)]
pub struct InMemoryDisclosureCache {
    state: RwLock<CacheState>,
}

impl InMemoryDisclosureCache {
    /// Creates an empty in-memory disclosure cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DisclosureCache for InMemoryDisclosureCache {
    async fn get_view(&self, key: &DisclosureCacheKey) -> AppResult<CacheLookup> {
        let state = self.state.read().await;
        let view = state
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.view.clone());

        Ok(CacheLookup {
            view,
            generation: state.generation_of(key),
        })
    }

    async fn set_view(
        &self,
        key: &DisclosureCacheKey,
        view: CachedDisclosureView,
        ttl_seconds: u32,
        generation: u64,
    ) -> AppResult<bool> {
        if ttl_seconds == 0 {
            return Ok(false);
        }

        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(u64::from(ttl_seconds)))
            .unwrap_or(now);

        let mut state = self.state.write().await;
        state.sweep(now);
        if state.generation_of(key) != generation {
            return Ok(false);
        }

        state
            .entries
            .insert(key.clone(), DisclosureCacheEntry { view, expires_at });

        Ok(true)
    }

    async fn invalidate(&self, keys: &[DisclosureCacheKey]) -> AppResult<()> {
        let now = Instant::now();
        let mut state = self.state.write().await;

        for key in keys {
            state.entries.remove(key);
            state.last_generation += 1;
            let marker = GenerationMarker {
                generation: state.last_generation,
                invalidated_at: now,
            };
            state.generations.insert(key.clone(), marker);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use carelink_application::{CachedDisclosureView, DisclosureCache, DisclosureCacheKey};

    use super::{
        DisclosureCacheEntry, GENERATION_RETENTION, GenerationMarker, InMemoryDisclosureCache,
    };

    fn pending_key(target_id: &str) -> DisclosureCacheKey {
        DisclosureCacheKey::PendingRequests {
            target_id: target_id.to_owned(),
        }
    }

    fn empty_view() -> CachedDisclosureView {
        CachedDisclosureView::Requests(Vec::new())
    }

    #[tokio::test]
    async fn stored_views_are_returned_until_invalidated() {
        let cache = InMemoryDisclosureCache::new();
        let key = pending_key("u2");

        let stored = cache.set_view(&key, empty_view(), 30, 0).await;
        assert!(matches!(stored, Ok(true)));

        let hit = cache.get_view(&key).await;
        assert!(matches!(
            hit,
            Ok(ref lookup) if matches!(lookup.view, Some(CachedDisclosureView::Requests(_)))
        ));

        let invalidated = cache.invalidate(std::slice::from_ref(&key)).await;
        assert!(invalidated.is_ok());
        assert!(matches!(cache.get_view(&key).await, Ok(ref lookup) if lookup.view.is_none()));
    }

    #[tokio::test]
    async fn zero_ttl_is_not_cached() {
        let cache = InMemoryDisclosureCache::new();
        let key = pending_key("u2");

        let stored = cache.set_view(&key, empty_view(), 0, 0).await;
        assert!(matches!(stored, Ok(false)));
        assert!(matches!(cache.get_view(&key).await, Ok(ref lookup) if lookup.view.is_none()));
    }

    #[tokio::test]
    async fn invalidation_only_touches_given_keys() {
        let cache = InMemoryDisclosureCache::new();
        let kept = pending_key("u3");

        for key in [pending_key("u2"), kept.clone()] {
            let stored = cache.set_view(&key, empty_view(), 30, 0).await;
            assert!(matches!(stored, Ok(true)));
        }

        let invalidated = cache.invalidate(&[pending_key("u2")]).await;
        assert!(invalidated.is_ok());
        assert!(matches!(cache.get_view(&kept).await, Ok(ref lookup) if lookup.view.is_some()));
    }

    #[tokio::test]
    async fn write_with_generation_read_before_invalidation_is_dropped() {
        let cache = InMemoryDisclosureCache::new();
        let key = pending_key("u2");

        let before = cache.get_view(&key).await;
        assert!(before.is_ok());
        let seen = before.unwrap_or_else(|_| unreachable!()).generation;

        let invalidated = cache.invalidate(std::slice::from_ref(&key)).await;
        assert!(invalidated.is_ok());

        let stale = cache.set_view(&key, empty_view(), 30, seen).await;
        assert!(matches!(stale, Ok(false)));
        assert!(matches!(cache.get_view(&key).await, Ok(ref lookup) if lookup.view.is_none()));

        let current = cache.get_view(&key).await;
        assert!(current.is_ok());
        let current = current.unwrap_or_else(|_| unreachable!()).generation;
        assert_ne!(current, seen);

        let fresh = cache.set_view(&key, empty_view(), 30, current).await;
        assert!(matches!(fresh, Ok(true)));
    }

    #[tokio::test]
    async fn writes_sweep_expired_entries_and_old_markers() {
        let cache = InMemoryDisclosureCache::new();
        let now = Instant::now();
        {
            let mut state = cache.state.write().await;
            for target_id in ["u3", "u4", "u5"] {
                state.entries.insert(
                    pending_key(target_id),
                    DisclosureCacheEntry {
                        view: empty_view(),
                        expires_at: now,
                    },
                );
            }
            if let Some(invalidated_at) =
                now.checked_sub(GENERATION_RETENTION + Duration::from_secs(1))
            {
                state.generations.insert(
                    pending_key("u6"),
                    GenerationMarker {
                        generation: 7,
                        invalidated_at,
                    },
                );
            }
        }

        let stored = cache.set_view(&pending_key("u2"), empty_view(), 30, 0).await;
        assert!(matches!(stored, Ok(true)));

        let state = cache.state.read().await;
        assert_eq!(state.entries.len(), 1);
        assert!(state.entries.contains_key(&pending_key("u2")));
        assert!(state.generations.is_empty());
    }
}
