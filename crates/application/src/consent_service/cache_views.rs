use super::*;

impl ConsentService {
    /// Reads a cached view together with the key's generation.
    ///
    /// Cache failures and timeouts degrade to `None`, which also disables the write-back for
    /// this read.
    pub(super) async fn cached_view(&self, key: &DisclosureCacheKey) -> Option<CacheLookup> {
        if self.cache_ttl_seconds == 0 {
            return None;
        }

        let cache = self.cache.as_ref()?;
        match self
            .store_policy
            .bounded("disclosure_cache_get", cache.get_view(key))
            .await
        {
            Ok(lookup) => Some(lookup),
            Err(error) => {
                warn!(
                    operation = "disclosure_cache_get",
                    cache_key = %key.storage_key(),
                    %error,
                    "disclosure cache read failed, falling back to store"
                );
                None
            }
        }
    }

    /// Writes a view back unless the key was invalidated after `generation` was read.
    pub(super) async fn store_view(
        &self,
        key: &DisclosureCacheKey,
        view: CachedDisclosureView,
        generation: Option<u64>,
    ) {
        let (Some(cache), Some(generation)) = (&self.cache, generation) else {
            return;
        };

        match self
            .store_policy
            .bounded(
                "disclosure_cache_set",
                cache.set_view(key, view, self.cache_ttl_seconds, generation),
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    operation = "disclosure_cache_set",
                    cache_key = %key.storage_key(),
                    generation,
                    "cache key invalidated during read, dropping stale view"
                );
            }
            Err(error) => {
                warn!(
                    operation = "disclosure_cache_set",
                    cache_key = %key.storage_key(),
                    %error,
                    "disclosure cache write failed"
                );
            }
        }
    }

    /// Drops every view a mutation touched.
    pub(super) async fn invalidate_views(&self, keys: &[DisclosureCacheKey]) {
        let Some(cache) = &self.cache else {
            return;
        };

        if let Err(error) = self
            .store_policy
            .bounded("disclosure_cache_invalidate", cache.invalidate(keys))
            .await
        {
            warn!(
                operation = "disclosure_cache_invalidate",
                key_count = keys.len(),
                %error,
                "disclosure cache invalidation failed, entries expire by ttl"
            );
        }
    }

    pub(super) async fn notify(&self, notification: DisclosureNotification) {
        let event = notification.event_name();
        let request_id = notification.request_id();

        if let Err(error) = self
            .store_policy
            .bounded(
                "dispatch_notification",
                self.notification_dispatcher.dispatch(notification),
            )
            .await
        {
            warn!(
                operation = "dispatch_notification",
                event,
                %request_id,
                %error,
                "consent notification dispatch failed"
            );
        }
    }

    pub(super) async fn cached_requests(
        &self,
        key: &DisclosureCacheKey,
    ) -> (Option<Vec<DisclosureRequest>>, Option<u64>) {
        let Some(lookup) = self.cached_view(key).await else {
            return (None, None);
        };

        match lookup.view {
            Some(CachedDisclosureView::Requests(requests)) => (Some(requests), None),
            _ => (None, Some(lookup.generation)),
        }
    }

    pub(super) async fn cached_permissions(
        &self,
        key: &DisclosureCacheKey,
        now: DateTime<Utc>,
    ) -> (Option<EffectivePermissionSet>, Option<u64>) {
        let Some(lookup) = self.cached_view(key).await else {
            return (None, None);
        };

        match lookup.view {
            Some(CachedDisclosureView::Permissions(permissions)) => {
                (Some(permissions.pruned_at(now)), None)
            }
            _ => (None, Some(lookup.generation)),
        }
    }
}

pub(super) fn pending_key(target_id: &str) -> DisclosureCacheKey {
    DisclosureCacheKey::PendingRequests {
        target_id: target_id.to_owned(),
    }
}

pub(super) fn sent_key(requester_id: &str) -> DisclosureCacheKey {
    DisclosureCacheKey::SentRequests {
        requester_id: requester_id.to_owned(),
    }
}

pub(super) fn permissions_key(target_id: &str, viewer_id: &str) -> DisclosureCacheKey {
    DisclosureCacheKey::ViewerPermissions {
        target_id: target_id.to_owned(),
        viewer_id: viewer_id.to_owned(),
    }
}

/// Keys touched by any mutation of one request.
pub(super) fn request_keys(request: &DisclosureRequest) -> [DisclosureCacheKey; 3] {
    [
        pending_key(request.target_id()),
        sent_key(request.requester_id()),
        permissions_key(request.target_id(), request.requester_id()),
    ]
}
