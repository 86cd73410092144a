use async_trait::async_trait;
use carelink_application::{
    ApproveDisclosureInput, DisclosureRequestRepository, PermissionGrantRepository,
    RevokeDisclosureInput,
};
use carelink_core::{AppError, AppResult};
use carelink_domain::{DisclosureRequest, DisclosureRequestId, DisclosureStatus, PermissionGrant};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;


#[derive(Debug, Default)]
struct ConsentState {
    requests: Vec<DisclosureRequest>,
    grants: Vec<PermissionGrant>,
}

impl ConsentState {
    fn request_mut(&mut self, request_id: DisclosureRequestId) -> AppResult<&mut DisclosureRequest> {
        self.requests
            .iter_mut()
            .find(|request| request.id() == request_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("disclosure request '{request_id}' does not exist"))
            })
    }

    fn has_grant(&self, request_id: DisclosureRequestId, grant: &PermissionGrant) -> bool {
        self.grants
            .iter()
            .any(|existing| existing.request_id == request_id && existing.field == grant.field)
    }
}

/// In-memory consent store for local development and tests.
///
/// Requests and grants share one lock so every mutation is atomic.
#[derive(Debug, Default)]
pub struct InMemoryConsentRepository {
    state: RwLock<ConsentState>,
}

impl InMemoryConsentRepository {
    /// Creates an empty in-memory consent store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(requests: &mut [DisclosureRequest]) {
    requests.sort_by(|left, right| {
        right
            .created_at()
            .cmp(&left.created_at())
            .then_with(|| right.id().as_uuid().cmp(&left.id().as_uuid()))
    });
}

#[async_trait]
impl DisclosureRequestRepository for InMemoryConsentRepository {
    async fn insert_request(&self, request: DisclosureRequest) -> AppResult<DisclosureRequest> {
        let mut state = self.state.write().await;

        if state
            .requests
            .iter()
            .any(|existing| existing.id() == request.id())
        {
            return Err(AppError::Conflict(format!(
                "disclosure request '{}' already exists",
                request.id()
            )));
        }

        state.requests.push(request.clone());
        Ok(request)
    }

    async fn find_request(
        &self,
        request_id: DisclosureRequestId,
    ) -> AppResult<Option<DisclosureRequest>> {
        Ok(self
            .state
            .read()
            .await
            .requests
            .iter()
            .find(|request| request.id() == request_id)
            .cloned())
    }

    async fn list_pending_for_target(&self, target_id: &str) -> AppResult<Vec<DisclosureRequest>> {
        let mut requests: Vec<DisclosureRequest> = self
            .state
            .read()
            .await
            .requests
            .iter()
            .filter(|request| {
                request.target_id() == target_id && request.status() == DisclosureStatus::Pending
            })
            .cloned()
            .collect();
        newest_first(&mut requests);

        Ok(requests)
    }

    async fn list_sent_by_requester(
        &self,
        requester_id: &str,
    ) -> AppResult<Vec<DisclosureRequest>> {
        let mut requests: Vec<DisclosureRequest> = self
            .state
            .read()
            .await
            .requests
            .iter()
            .filter(|request| request.requester_id() == requester_id)
            .cloned()
            .collect();
        newest_first(&mut requests);

        Ok(requests)
    }

    async fn approve_request(&self, input: ApproveDisclosureInput) -> AppResult<DisclosureRequest> {
        let mut state = self.state.write().await;

        let mut approved = state.request_mut(input.request_id)?.clone();
        approved.approve(input.shared_fields, input.expires_at, input.responded_at)?;

        let grants =
            PermissionGrant::for_request(&approved, &input.grant_fields, input.responded_at);
        if let Some(duplicate) = grants
            .iter()
            .find(|grant| state.has_grant(input.request_id, grant))
        {
            return Err(AppError::Conflict(format!(
                "grant for field '{}' already exists on request '{}'",
                duplicate.field, input.request_id
            )));
        }

        *state.request_mut(input.request_id)? = approved.clone();
        state.grants.extend(grants);

        Ok(approved)
    }

    async fn decline_request(
        &self,
        request_id: DisclosureRequestId,
        responded_at: DateTime<Utc>,
    ) -> AppResult<DisclosureRequest> {
        let mut state = self.state.write().await;
        let request = state.request_mut(request_id)?;

        request.decline(responded_at)?;
        Ok(request.clone())
    }

    async fn revoke_request(&self, input: RevokeDisclosureInput) -> AppResult<DisclosureRequest> {
        let mut state = self.state.write().await;
        let ConsentState { requests, grants } = &mut *state;

        let request = requests
            .iter_mut()
            .find(|request| request.id() == input.request_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "disclosure request '{}' does not exist",
                    input.request_id
                ))
            })?;
        let already_revoked = request.revoked_at().is_some();
        request.revoke(input.revoked_at)?;

        if !already_revoked {
            for grant in grants.iter_mut().filter(|grant| {
                grant.revoked_at.is_none()
                    && grant.target_id == request.target_id()
                    && grant.viewer_id == request.requester_id()
                    && request.shared_fields().contains(&grant.field)
            }) {
                grant.revoked_at = Some(input.revoked_at);
            }
        }

        Ok(request.clone())
    }
}

#[async_trait]
impl PermissionGrantRepository for InMemoryConsentRepository {
    async fn list_grants_for_pair(
        &self,
        target_id: &str,
        viewer_id: &str,
    ) -> AppResult<Vec<PermissionGrant>> {
        let mut grants: Vec<PermissionGrant> = self
            .state
            .read()
            .await
            .grants
            .iter()
            .filter(|grant| grant.target_id == target_id && grant.viewer_id == viewer_id)
            .cloned()
            .collect();
        grants.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        Ok(grants)
    }

    async fn list_grants_for_request(
        &self,
        request_id: DisclosureRequestId,
    ) -> AppResult<Vec<PermissionGrant>> {
        Ok(self
            .state
            .read()
            .await
            .grants
            .iter()
            .filter(|grant| grant.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn insert_missing_grants(&self, grants: Vec<PermissionGrant>) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let mut inserted = 0;

        for grant in grants {
            if state.has_grant(grant.request_id, &grant) {
                continue;
            }

            state.grants.push(grant);
            inserted += 1;
        }

        Ok(inserted)
    }
}
