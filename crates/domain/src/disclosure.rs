use std::fmt::{Display, Formatter};
use std::str::FromStr;

use carelink_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::field::{FieldKey, FieldSet};

/// Unique identifier for a disclosure request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisclosureRequestId(Uuid);

impl DisclosureRequestId {
    /// Creates a random request identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a request identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Parses a transport value into a request identifier.
    pub fn parse(value: &str) -> AppResult<Self> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| AppError::Validation(format!("invalid disclosure request id '{value}'")))
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DisclosureRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DisclosureRequestId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a permission grant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionGrantId(Uuid);

impl PermissionGrantId {
    /// Creates a random grant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a grant identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PermissionGrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PermissionGrantId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle status of a disclosure request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclosureStatus {
    /// Awaiting the target's response.
    Pending,
    /// Target shared some or all requested fields.
    Approved,
    /// Target declined the request.
    Declined,
}

impl DisclosureStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }

    /// Returns whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl FromStr for DisclosureStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "declined" => Ok(Self::Declined),
            _ => Err(AppError::Validation(format!(
                "unknown disclosure status '{value}'"
            ))),
        }
    }
}

/// Raw persisted shape of a disclosure request, validated on conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureRequestParts {
    /// Request identifier.
    pub id: DisclosureRequestId,
    /// User asking to see fields.
    pub requester_id: String,
    /// User whose fields are requested.
    pub target_id: String,
    /// Lifecycle status.
    pub status: DisclosureStatus,
    /// Fields the requester asked for.
    pub requested_fields: FieldSet,
    /// Fields the target agreed to share.
    pub shared_fields: FieldSet,
    /// Optional justification shown to the target.
    pub reason: Option<String>,
    /// Upper bound for resulting grants.
    pub expires_at: Option<DateTime<Utc>>,
    /// When the target responded.
    pub responded_at: Option<DateTime<Utc>>,
    /// When shared access was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A requester's ask to view specific fields of a target's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DisclosureRequestParts")]
pub struct DisclosureRequest {
    id: DisclosureRequestId,
    requester_id: String,
    target_id: String,
    status: DisclosureStatus,
    requested_fields: FieldSet,
    shared_fields: FieldSet,
    reason: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    responded_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DisclosureRequest {
    /// Creates a pending request after validating parties, fields and expiry.
    pub fn new_pending(
        requester_id: &str,
        target_id: &str,
        requested_fields: FieldSet,
        reason: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let requester_id = requester_id.trim();
        let target_id = target_id.trim();

        if requester_id.is_empty() || target_id.is_empty() {
            return Err(AppError::Validation(
                "requester and target ids must not be empty".to_owned(),
            ));
        }

        if requester_id == target_id {
            return Err(AppError::Validation(
                "a user cannot request disclosure of their own profile".to_owned(),
            ));
        }

        if requested_fields.is_empty() {
            return Err(AppError::Validation(
                "requested fields must not be empty".to_owned(),
            ));
        }

        if let Some(expires_at) = expires_at
            && expires_at <= now
        {
            return Err(AppError::Validation(
                "expires_at must be in the future".to_owned(),
            ));
        }

        Ok(Self {
            id: DisclosureRequestId::new(),
            requester_id: requester_id.to_owned(),
            target_id: target_id.to_owned(),
            status: DisclosureStatus::Pending,
            requested_fields,
            shared_fields: FieldSet::new(),
            reason: reason
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            expires_at,
            responded_at: None,
            revoked_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Restores a request from persisted parts, enforcing the shared-fields invariant.
    pub fn from_parts(parts: DisclosureRequestParts) -> AppResult<Self> {
        if !parts.shared_fields.is_subset_of(&parts.requested_fields) {
            return Err(AppError::Internal(format!(
                "disclosure request '{}' shares fields outside its requested set",
                parts.id
            )));
        }

        if parts.status != DisclosureStatus::Approved && !parts.shared_fields.is_empty() {
            return Err(AppError::Internal(format!(
                "disclosure request '{}' has shared fields without approval",
                parts.id
            )));
        }

        Ok(Self {
            id: parts.id,
            requester_id: parts.requester_id,
            target_id: parts.target_id,
            status: parts.status,
            requested_fields: parts.requested_fields,
            shared_fields: parts.shared_fields,
            reason: parts.reason,
            expires_at: parts.expires_at,
            responded_at: parts.responded_at,
            revoked_at: parts.revoked_at,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        })
    }

    /// Transitions a pending request to approved.
    pub fn approve(
        &mut self,
        shared_fields: FieldSet,
        expires_at: Option<DateTime<Utc>>,
        responded_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.require_pending()?;

        if shared_fields.is_empty() {
            return Err(AppError::Validation(
                "approval must share at least one field".to_owned(),
            ));
        }

        if !shared_fields.is_subset_of(&self.requested_fields) {
            return Err(AppError::Validation(
                "shared fields must be a subset of requested fields".to_owned(),
            ));
        }

        self.status = DisclosureStatus::Approved;
        self.shared_fields = shared_fields;
        self.expires_at = expires_at;
        self.responded_at = Some(responded_at);
        self.updated_at = responded_at;
        Ok(())
    }

    /// Transitions a pending request to declined.
    pub fn decline(&mut self, responded_at: DateTime<Utc>) -> AppResult<()> {
        self.require_pending()?;

        self.status = DisclosureStatus::Declined;
        self.shared_fields = FieldSet::new();
        self.responded_at = Some(responded_at);
        self.updated_at = responded_at;
        Ok(())
    }

    /// Stamps revocation on an approved request.
    pub fn revoke(&mut self, revoked_at: DateTime<Utc>) -> AppResult<()> {
        if self.status != DisclosureStatus::Approved {
            return Err(AppError::Validation(format!(
                "only approved disclosure requests can be revoked, request '{}' is {}",
                self.id,
                self.status.as_str()
            )));
        }

        if self.revoked_at.is_none() {
            self.revoked_at = Some(revoked_at);
            self.updated_at = revoked_at;
        }

        Ok(())
    }

    fn require_pending(&self) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "disclosure request '{}' is already {}",
                self.id,
                self.status.as_str()
            )));
        }

        Ok(())
    }

    /// Returns the request identifier.
    #[must_use]
    pub fn id(&self) -> DisclosureRequestId {
        self.id
    }

    /// Returns the requester user id.
    #[must_use]
    pub fn requester_id(&self) -> &str {
        self.requester_id.as_str()
    }

    /// Returns the target user id.
    #[must_use]
    pub fn target_id(&self) -> &str {
        self.target_id.as_str()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> DisclosureStatus {
        self.status
    }

    /// Returns the requested fields.
    #[must_use]
    pub fn requested_fields(&self) -> &FieldSet {
        &self.requested_fields
    }

    /// Returns the fields shared on approval.
    #[must_use]
    pub fn shared_fields(&self) -> &FieldSet {
        &self.shared_fields
    }

    /// Returns the optional reason.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns the grant expiry bound.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the response timestamp.
    #[must_use]
    pub fn responded_at(&self) -> Option<DateTime<Utc>> {
        self.responded_at
    }

    /// Returns the revocation timestamp.
    #[must_use]
    pub fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last mutation timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether the user is the requester or the target.
    #[must_use]
    pub fn involves(&self, user_id: &str) -> bool {
        self.requester_id == user_id || self.target_id == user_id
    }
}

impl TryFrom<DisclosureRequestParts> for DisclosureRequest {
    type Error = AppError;

    fn try_from(value: DisclosureRequestParts) -> Result<Self, Self::Error> {
        Self::from_parts(value)
    }
}

/// Single field-level, optionally time-bounded authorization record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Grant identifier.
    pub id: PermissionGrantId,
    /// Request that produced the grant.
    pub request_id: DisclosureRequestId,
    /// User allowed to view the field.
    pub viewer_id: String,
    /// User owning the field.
    pub target_id: String,
    /// Granted field.
    pub field: FieldKey,
    /// Exclusive expiry bound.
    pub expires_at: Option<DateTime<Utc>>,
    /// Revocation timestamp.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl PermissionGrant {
    /// Builds the grant rows for an approved request.
    #[must_use]
    pub fn for_request(
        request: &DisclosureRequest,
        fields: &FieldSet,
        created_at: DateTime<Utc>,
    ) -> Vec<Self> {
        fields
            .iter()
            .map(|field| Self {
                id: PermissionGrantId::new(),
                request_id: request.id(),
                viewer_id: request.requester_id().to_owned(),
                target_id: request.target_id().to_owned(),
                field: field.clone(),
                expires_at: request.expires_at(),
                revoked_at: None,
                created_at,
            })
            .collect()
    }

    /// Returns whether the grant is expired at `now`; the boundary instant counts as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Returns whether the grant is neither revoked nor expired at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && !self.is_expired_at(now)
    }
}
