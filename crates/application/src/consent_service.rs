use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use carelink_core::{AppError, AppResult, UserIdentity};
use carelink_domain::{
    DisclosureRequest, DisclosureRequestId, DisclosureStatus, EffectivePermissionSet, FieldSet,
    PermissionGrant,
};

use crate::consent_ports::{
    ApproveDisclosureInput, CacheLookup, CachedDisclosureView, CreateDisclosureRequestInput,
    DisclosureCache, DisclosureCacheKey, DisclosureNotification, DisclosureRequestRepository,
    NotificationDispatcher, PermissionGrantRepository, ProfileStore,
    RespondToDisclosureRequestInput, RevokeDisclosureInput, UserDirectory,
};
use crate::grant_filter::{GrantFilter, GrantFilterOutcome};
use crate::shared_profile::{DocumentClassifier, SharedProfile, SharedProfileProjector};
use crate::store_policy::StoreCallPolicy;

mod cache_views;
mod permissions;
mod requests;
mod responses;
mod revocation;

/// Default lifetime of cached request lists and permission views.
pub const DEFAULT_DISCLOSURE_CACHE_TTL_SECONDS: u32 = 30;

/// Consent engine orchestrating disclosure requests, grants and revocation.
#[derive(Clone)]
pub struct ConsentService {
    request_repository: Arc<dyn DisclosureRequestRepository>,
    grant_repository: Arc<dyn PermissionGrantRepository>,
    user_directory: Arc<dyn UserDirectory>,
    profile_store: Arc<dyn ProfileStore>,
    notification_dispatcher: Arc<dyn NotificationDispatcher>,
    cache: Option<Arc<dyn DisclosureCache>>,
    cache_ttl_seconds: u32,
    store_policy: StoreCallPolicy,
    grant_filter: GrantFilter,
    projector: SharedProfileProjector,
}

impl ConsentService {
    /// Creates a consent service without caching and with default store policy.
    #[must_use]
    pub fn new(
        request_repository: Arc<dyn DisclosureRequestRepository>,
        grant_repository: Arc<dyn PermissionGrantRepository>,
        user_directory: Arc<dyn UserDirectory>,
        profile_store: Arc<dyn ProfileStore>,
        notification_dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let store_policy = StoreCallPolicy::default();

        Self {
            grant_filter: GrantFilter::new(grant_repository.clone(), store_policy),
            request_repository,
            grant_repository,
            user_directory,
            profile_store,
            notification_dispatcher,
            cache: None,
            cache_ttl_seconds: 0,
            store_policy,
            projector: SharedProfileProjector::default(),
        }
    }

    /// Adds read-through caching for request lists and permission views.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn DisclosureCache>, ttl_seconds: u32) -> Self {
        self.cache = Some(cache);
        self.cache_ttl_seconds = ttl_seconds;
        self
    }

    /// Overrides store timeout and retry settings.
    #[must_use]
    pub fn with_store_policy(mut self, store_policy: StoreCallPolicy) -> Self {
        self.store_policy = store_policy;
        self.grant_filter = GrantFilter::new(self.grant_repository.clone(), store_policy);
        self
    }

    /// Replaces the heuristic used to split shared documents.
    #[must_use]
    pub fn with_document_classifier(mut self, classifier: Arc<dyn DocumentClassifier>) -> Self {
        self.projector = SharedProfileProjector::new(classifier);
        self
    }

    async fn load_request(&self, request_id: DisclosureRequestId) -> AppResult<DisclosureRequest> {
        self.store_policy
            .read("find_request", move || {
                self.request_repository.find_request(request_id)
            })
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("disclosure request '{request_id}' does not exist"))
            })
    }
}

fn caller_subject(actor: &UserIdentity) -> AppResult<&str> {
    let subject = actor.subject().trim();
    if subject.is_empty() {
        return Err(AppError::Unauthorized(
            "caller identity is missing".to_owned(),
        ));
    }

    Ok(subject)
}
