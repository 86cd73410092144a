use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use carelink_core::AppResult;
use carelink_domain::{DisclosureRequest, EffectivePermissionSet};

/// Cache keys touched by consent reads and invalidated by mutations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DisclosureCacheKey {
    /// Pending requests addressed to a target.
    PendingRequests {
        /// Target user id.
        target_id: String,
    },
    /// Requests sent by a requester.
    SentRequests {
        /// Requester user id.
        requester_id: String,
    },
    /// Active effective permissions for a pair.
    ViewerPermissions {
        /// Target user id.
        target_id: String,
        /// Viewer user id.
        viewer_id: String,
    },
}

impl DisclosureCacheKey {
    /// Returns a flat storage key, escaping separators inside user ids.
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            Self::PendingRequests { target_id } => {
                format!("pending:{}", escape_segment(target_id))
            }
            Self::SentRequests { requester_id } => {
                format!("sent:{}", escape_segment(requester_id))
            }
            Self::ViewerPermissions {
                target_id,
                viewer_id,
            } => format!(
                "permissions:{}:{}",
                escape_segment(target_id),
                escape_segment(viewer_id)
            ),
        }
    }
}

fn escape_segment(value: &str) -> String {
    value.replace('%', "%25").replace(':', "%3A")
}

/// Cached payload for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachedDisclosureView {
    /// Request list, newest first.
    Requests(Vec<DisclosureRequest>),
    /// Active effective permissions.
    Permissions(EffectivePermissionSet),
}

/// Result of a cache read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheLookup {
    /// Fresh view for the key, if any.
    pub view: Option<CachedDisclosureView>,
    /// Invalidation generation of the key when it was read.
    pub generation: u64,
}

/// Short-TTL read-through cache port for consent list and permission views.
///
/// Every invalidation moves the key to a new generation. A view computed after a read only
/// lands in the cache when the key is still at the generation that read observed, so a
/// read racing a mutation cannot repopulate the key with pre-mutation state.
#[async_trait]
pub trait DisclosureCache: Send + Sync {
    /// Returns the cached view for a key, if present and fresh, with its generation.
    async fn get_view(&self, key: &DisclosureCacheKey) -> AppResult<CacheLookup>;

    /// Stores a view with ttl unless the key was invalidated after `generation` was read.
    ///
    /// Returns whether the view was stored.
    async fn set_view(
        &self,
        key: &DisclosureCacheKey,
        view: CachedDisclosureView,
        ttl_seconds: u32,
        generation: u64,
    ) -> AppResult<bool>;

    /// Drops cached views for the given keys and advances their generation.
    async fn invalidate(&self, keys: &[DisclosureCacheKey]) -> AppResult<()>;
}
