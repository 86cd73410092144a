use async_trait::async_trait;
use serde_json::{Map, Value};

use carelink_core::AppResult;
use carelink_domain::{DisclosureRequestId, DisclosureStatus, FieldSet};

/// Raw profile payload keyed by the profile store's own field names.
pub type ProfilePayload = Map<String, Value>;

/// Lookup port for marketplace users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns whether a user id resolves to an existing user.
    async fn user_exists(&self, user_id: &str) -> AppResult<bool>;
}

/// Port supplying raw profile values once access is confirmed.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns values for exactly the requested fields of a target profile.
    async fn fetch_profile_fields(
        &self,
        target_id: &str,
        fields: &FieldSet,
    ) -> AppResult<ProfilePayload>;
}

/// State change announced to the notification collaborator.
///
/// Carries identifiers only, never field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisclosureNotification {
    /// A requester asked a target for fields.
    RequestCreated {
        /// Request id.
        request_id: DisclosureRequestId,
        /// Requester user id.
        requester_id: String,
        /// Target user id.
        target_id: String,
    },
    /// The target approved or declined.
    RequestResponded {
        /// Request id.
        request_id: DisclosureRequestId,
        /// Requester user id.
        requester_id: String,
        /// Target user id.
        target_id: String,
        /// Resulting status.
        status: DisclosureStatus,
    },
    /// Shared access was revoked.
    AccessRevoked {
        /// Request id.
        request_id: DisclosureRequestId,
        /// Requester user id.
        requester_id: String,
        /// Target user id.
        target_id: String,
    },
}

impl DisclosureNotification {
    /// Returns a stable event name.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::RequestCreated { .. } => "disclosure.request.created",
            Self::RequestResponded { .. } => "disclosure.request.responded",
            Self::AccessRevoked { .. } => "disclosure.access.revoked",
        }
    }

    /// Returns the request the notification refers to.
    #[must_use]
    pub fn request_id(&self) -> DisclosureRequestId {
        match self {
            Self::RequestCreated { request_id, .. }
            | Self::RequestResponded { request_id, .. }
            | Self::AccessRevoked { request_id, .. } => *request_id,
        }
    }

    /// Returns the user who should be told about the change.
    #[must_use]
    pub fn recipient_id(&self) -> &str {
        match self {
            Self::RequestCreated { target_id, .. } => target_id.as_str(),
            Self::RequestResponded { requester_id, .. } => requester_id.as_str(),
            Self::AccessRevoked { requester_id, .. } => requester_id.as_str(),
        }
    }
}

/// Port for dispatching consent notifications; delivery lives outside the engine.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Dispatches one notification.
    async fn dispatch(&self, notification: DisclosureNotification) -> AppResult<()>;
}
