//! Application services and ports for the consent engine.

#![forbid(unsafe_code)]

mod consent_ports;
mod consent_service;
mod grant_filter;
mod shared_profile;
mod store_policy;

pub use consent_ports::{
    ApproveDisclosureInput, CacheLookup, CachedDisclosureView, CreateDisclosureRequestInput,
    DisclosureCache, DisclosureCacheKey, DisclosureNotification, DisclosureRequestRepository,
    NotificationDispatcher, PermissionGrantRepository, ProfilePayload, ProfileStore,
    RespondToDisclosureRequestInput, RevokeDisclosureInput, UserDirectory,
};
pub use consent_service::{ConsentService, DEFAULT_DISCLOSURE_CACHE_TTL_SECONDS};
pub use grant_filter::{GrantFilter, GrantFilterOutcome};
pub use shared_profile::{
    DocumentClassifier, DocumentKind, FileTypeDocumentClassifier, SharedProfile,
    SharedProfileProjector,
};
pub use store_policy::{
    DEFAULT_STORE_MAX_ATTEMPTS, DEFAULT_STORE_RETRY_BASE_DELAY, DEFAULT_STORE_TIMEOUT,
    StoreCallPolicy,
};
