use std::collections::HashSet;

use carelink_domain::FieldKey;

use super::*;

use super::cache_views::request_keys;

impl ConsentService {
    /// Records the target's response to a pending request.
    ///
    /// Responding to an already resolved request returns its persisted state unchanged before
    /// the response body is validated, so a retried approval succeeds even once its expiry has
    /// passed. A concurrent response that wins the race is treated as success.
    pub async fn respond_to_request(
        &self,
        actor: &UserIdentity,
        request_id: DisclosureRequestId,
        input: RespondToDisclosureRequestInput,
    ) -> AppResult<DisclosureRequest> {
        let responder_id = caller_subject(actor)?;
        let now = Utc::now();

        let request = self.load_request(request_id).await?;
        if request.target_id() != responder_id {
            return Err(AppError::Forbidden(format!(
                "only the target of disclosure request '{request_id}' can respond"
            )));
        }

        if request.status().is_terminal() {
            info!(
                operation = "respond_to_request",
                %request_id,
                status = request.status().as_str(),
                "disclosure request already resolved, returning persisted state"
            );

            if input.approved {
                self.reconcile_grants(&request, now).await?;
            }

            return Ok(request);
        }

        let shared_fields = match &input.shared_fields {
            Some(raw_fields) if input.approved => {
                let fields = FieldSet::parse(raw_fields)?;
                if fields.is_empty() {
                    return Err(AppError::Validation(
                        "approval must share at least one field".to_owned(),
                    ));
                }
                Some(fields)
            }
            _ => None,
        };

        if input.approved
            && let Some(expires_at) = input.expires_at
            && expires_at <= now
        {
            return Err(AppError::Validation(
                "expires_at must be in the future".to_owned(),
            ));
        }

        if input.approved {
            self.approve(request, shared_fields, input.expires_at, now)
                .await
        } else {
            self.decline(request, now).await
        }
    }

    async fn approve(
        &self,
        request: DisclosureRequest,
        shared_fields: Option<FieldSet>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<DisclosureRequest> {
        let shared_fields = shared_fields.unwrap_or_else(|| request.requested_fields().clone());
        let expires_at = expires_at.or(request.expires_at());

        if let Some(expires_at) = expires_at
            && expires_at <= now
        {
            return Err(AppError::Validation(format!(
                "disclosure request '{}' expired before it was approved",
                request.id()
            )));
        }

        let mut validated = request.clone();
        validated.approve(shared_fields.clone(), expires_at, now)?;

        let outcome = self
            .grant_filter
            .filter(
                request.target_id(),
                request.requester_id(),
                &shared_fields,
                expires_at,
                now,
            )
            .await;
        if let GrantFilterOutcome::Filtered {
            already_granted, ..
        } = &outcome
            && !already_granted.is_empty()
        {
            info!(
                operation = "respond_to_request",
                request_id = %request.id(),
                skipped_fields = already_granted.len(),
                "skipping fields covered by existing grants"
            );
        }

        let input = ApproveDisclosureInput {
            request_id: request.id(),
            shared_fields,
            grant_fields: outcome.into_remaining(),
            expires_at,
            responded_at: now,
        };

        let (persisted, fresh) = match self
            .store_policy
            .write("approve_request", self.request_repository.approve_request(input))
            .await
        {
            Ok(persisted) => (persisted, true),
            Err(AppError::Conflict(reason)) => {
                info!(
                    operation = "respond_to_request",
                    request_id = %request.id(),
                    %reason,
                    "concurrent response already resolved request, returning persisted state"
                );
                (self.load_request(request.id()).await?, false)
            }
            Err(error) => {
                warn!(
                    operation = "respond_to_request",
                    request_id = %request.id(),
                    requester_id = request.requester_id(),
                    target_id = request.target_id(),
                    %error,
                    "failed to approve disclosure request"
                );
                return Err(error);
            }
        };

        let reconciled = self.reconcile_grants(&persisted, now).await;
        self.invalidate_views(&request_keys(&persisted)).await;

        if fresh {
            info!(
                operation = "respond_to_request",
                request_id = %persisted.id(),
                requester_id = persisted.requester_id(),
                target_id = persisted.target_id(),
                shared_count = persisted.shared_fields().len(),
                "disclosure request approved"
            );
            self.notify_responded(&persisted).await;
        }

        reconciled?;
        Ok(persisted)
    }

    async fn decline(
        &self,
        request: DisclosureRequest,
        now: DateTime<Utc>,
    ) -> AppResult<DisclosureRequest> {
        let request_id = request.id();
        let (persisted, fresh) = match self
            .store_policy
            .write(
                "decline_request",
                self.request_repository.decline_request(request_id, now),
            )
            .await
        {
            Ok(persisted) => (persisted, true),
            Err(AppError::Conflict(reason)) => {
                info!(
                    operation = "respond_to_request",
                    %request_id,
                    %reason,
                    "concurrent response already resolved request, returning persisted state"
                );
                (self.load_request(request_id).await?, false)
            }
            Err(error) => {
                warn!(
                    operation = "respond_to_request",
                    %request_id,
                    requester_id = request.requester_id(),
                    target_id = request.target_id(),
                    %error,
                    "failed to decline disclosure request"
                );
                return Err(error);
            }
        };

        self.invalidate_views(&request_keys(&persisted)).await;
        if fresh {
            info!(
                operation = "respond_to_request",
                %request_id,
                "disclosure request declined"
            );
            self.notify_responded(&persisted).await;
        }

        Ok(persisted)
    }

    async fn notify_responded(&self, request: &DisclosureRequest) {
        self.notify(DisclosureNotification::RequestResponded {
            request_id: request.id(),
            requester_id: request.requester_id().to_owned(),
            target_id: request.target_id().to_owned(),
            status: request.status(),
        })
        .await;
    }

    /// Re-inserts shared fields that an approved request left without a grant.
    ///
    /// Fields covered by another active grant are skipped, as are fields revoked for the pair
    /// after this request was answered. Returns the number of rows written.
    async fn reconcile_grants(
        &self,
        request: &DisclosureRequest,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        if request.status() != DisclosureStatus::Approved
            || request.revoked_at().is_some()
            || request.expires_at().is_some_and(|expires_at| expires_at <= now)
        {
            return Ok(0);
        }

        let request_id = request.id();
        let target_id = request.target_id();
        let viewer_id = request.requester_id();

        let own_grants = self
            .store_policy
            .read("list_grants_for_request", move || {
                self.grant_repository.list_grants_for_request(request_id)
            })
            .await?;
        let pair_grants = self
            .store_policy
            .read("list_grants_for_pair", move || {
                self.grant_repository.list_grants_for_pair(target_id, viewer_id)
            })
            .await?;

        let own_fields: HashSet<_> = own_grants.iter().map(|grant| &grant.field).collect();
        let responded_at = request.responded_at();
        let revoked_since_response = |field: &FieldKey| {
            pair_grants.iter().any(|grant| {
                &grant.field == field
                    && grant
                        .revoked_at
                        .is_some_and(|revoked_at| Some(revoked_at) >= responded_at)
            })
        };
        let active = EffectivePermissionSet::compute(
            target_id,
            viewer_id,
            pair_grants.clone(),
            now,
            false,
        );

        let missing: FieldSet = request
            .shared_fields()
            .iter()
            .filter(|field| !own_fields.contains(field))
            .filter(|field| !active.allows(field))
            .filter(|field| !revoked_since_response(*field))
            .cloned()
            .collect();

        if missing.is_empty() {
            return Ok(0);
        }

        let grants = PermissionGrant::for_request(request, &missing, now);
        let inserted = self
            .store_policy
            .write(
                "insert_missing_grants",
                self.grant_repository.insert_missing_grants(grants),
            )
            .await?;

        warn!(
            operation = "reconcile_grants",
            %request_id,
            requester_id = viewer_id,
            target_id,
            missing = missing.len(),
            inserted,
            "approved request was missing grants, reinserted"
        );

        Ok(inserted)
    }
}
