use async_trait::async_trait;
use chrono::{DateTime, Utc};

use carelink_core::AppResult;
use carelink_domain::{DisclosureRequest, DisclosureRequestId, PermissionGrant};

use super::inputs::{ApproveDisclosureInput, RevokeDisclosureInput};

/// Repository port for disclosure requests.
///
/// Mutations that touch grants run as one unit of work in the adapter.
#[async_trait]
pub trait DisclosureRequestRepository: Send + Sync {
    /// Persists a new pending request.
    async fn insert_request(&self, request: DisclosureRequest) -> AppResult<DisclosureRequest>;

    /// Finds one request by id.
    async fn find_request(
        &self,
        request_id: DisclosureRequestId,
    ) -> AppResult<Option<DisclosureRequest>>;

    /// Lists pending requests addressed to a target, newest first.
    async fn list_pending_for_target(&self, target_id: &str) -> AppResult<Vec<DisclosureRequest>>;

    /// Lists requests sent by a requester, newest first.
    async fn list_sent_by_requester(
        &self,
        requester_id: &str,
    ) -> AppResult<Vec<DisclosureRequest>>;

    /// Marks a pending request approved and inserts its grants atomically.
    ///
    /// Returns `AppError::Conflict` when the request is no longer pending or a grant row
    /// already exists for the same request and field.
    async fn approve_request(&self, input: ApproveDisclosureInput) -> AppResult<DisclosureRequest>;

    /// Marks a pending request declined, returning `AppError::Conflict` when already resolved.
    async fn decline_request(
        &self,
        request_id: DisclosureRequestId,
        responded_at: DateTime<Utc>,
    ) -> AppResult<DisclosureRequest>;

    /// Stamps revocation on an approved request and on the pair's grants for its shared fields.
    async fn revoke_request(&self, input: RevokeDisclosureInput) -> AppResult<DisclosureRequest>;
}

/// Repository port for field-level permission grants.
#[async_trait]
pub trait PermissionGrantRepository: Send + Sync {
    /// Lists every grant row for a (viewer, target) pair, revoked and expired rows included,
    /// newest first.
    async fn list_grants_for_pair(
        &self,
        target_id: &str,
        viewer_id: &str,
    ) -> AppResult<Vec<PermissionGrant>>;

    /// Lists every grant row created by one request.
    async fn list_grants_for_request(
        &self,
        request_id: DisclosureRequestId,
    ) -> AppResult<Vec<PermissionGrant>>;

    /// Inserts grant rows, skipping any (request, field) pair that already exists.
    ///
    /// Returns the number of inserted rows.
    async fn insert_missing_grants(&self, grants: Vec<PermissionGrant>) -> AppResult<u64>;
}
