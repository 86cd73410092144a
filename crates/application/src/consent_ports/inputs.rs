use chrono::{DateTime, Utc};

use carelink_domain::{DisclosureRequestId, FieldSet};

/// Input payload for creating a disclosure request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDisclosureRequestInput {
    /// User whose fields are requested.
    pub target_id: String,
    /// Raw field identifiers, normalized by the engine.
    pub requested_fields: Vec<String>,
    /// Optional justification shown to the target.
    pub reason: Option<String>,
    /// Optional upper bound for resulting grants.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Input payload for the target's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RespondToDisclosureRequestInput {
    /// Whether the target approves.
    pub approved: bool,
    /// Raw field identifiers to share; `None` shares every requested field.
    pub shared_fields: Option<Vec<String>>,
    /// Optional grant expiry overriding the request's own bound.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Unit of work for approving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveDisclosureInput {
    /// Request being approved.
    pub request_id: DisclosureRequestId,
    /// Fields recorded as shared on the request.
    pub shared_fields: FieldSet,
    /// Subset of shared fields that still need a grant row.
    pub grant_fields: FieldSet,
    /// Expiry stamped on the request and its grants.
    pub expires_at: Option<DateTime<Utc>>,
    /// Response timestamp, also the grants' creation time.
    pub responded_at: DateTime<Utc>,
}

/// Unit of work for revoking a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevokeDisclosureInput {
    /// Request being revoked.
    pub request_id: DisclosureRequestId,
    /// Revocation timestamp.
    pub revoked_at: DateTime<Utc>,
}
