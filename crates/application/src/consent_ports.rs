mod cache;
mod collaborators;
mod inputs;
mod repositories;

pub use cache::{CacheLookup, CachedDisclosureView, DisclosureCache, DisclosureCacheKey};
pub use collaborators::{
    DisclosureNotification, NotificationDispatcher, ProfilePayload, ProfileStore, UserDirectory,
};
pub use inputs::{
    ApproveDisclosureInput, CreateDisclosureRequestInput, RespondToDisclosureRequestInput,
    RevokeDisclosureInput,
};
pub use repositories::{DisclosureRequestRepository, PermissionGrantRepository};
