use super::*;

use super::cache_views::{pending_key, sent_key};

impl ConsentService {
    /// Creates a pending disclosure request from the caller to a target.
    pub async fn create_request(
        &self,
        actor: &UserIdentity,
        input: CreateDisclosureRequestInput,
    ) -> AppResult<DisclosureRequest> {
        let requester_id = caller_subject(actor)?;
        let requested_fields = FieldSet::parse(&input.requested_fields)?;
        let request = DisclosureRequest::new_pending(
            requester_id,
            input.target_id.as_str(),
            requested_fields,
            input.reason,
            input.expires_at,
            Utc::now(),
        )?;

        let target_id = request.target_id();
        let target_exists = self
            .store_policy
            .read("user_exists", move || self.user_directory.user_exists(target_id))
            .await?;
        if !target_exists {
            return Err(AppError::NotFound(format!(
                "user '{target_id}' does not exist"
            )));
        }

        let request = self
            .store_policy
            .write(
                "insert_request",
                self.request_repository.insert_request(request.clone()),
            )
            .await
            .inspect_err(|error| {
                warn!(
                    operation = "create_request",
                    request_id = %request.id(),
                    requester_id = request.requester_id(),
                    target_id = request.target_id(),
                    %error,
                    "failed to persist disclosure request"
                );
            })?;

        info!(
            operation = "create_request",
            request_id = %request.id(),
            requester_id = request.requester_id(),
            target_id = request.target_id(),
            field_count = request.requested_fields().len(),
            unknown_field_count = request
                .requested_fields()
                .iter()
                .filter(|field| !field.is_known())
                .count(),
            "disclosure request created"
        );

        self.invalidate_views(&[
            pending_key(request.target_id()),
            sent_key(request.requester_id()),
        ])
        .await;
        self.notify(DisclosureNotification::RequestCreated {
            request_id: request.id(),
            requester_id: request.requester_id().to_owned(),
            target_id: request.target_id().to_owned(),
        })
        .await;

        Ok(request)
    }

    /// Lists pending requests addressed to the caller, newest first.
    pub async fn get_pending_requests(
        &self,
        actor: &UserIdentity,
    ) -> AppResult<Vec<DisclosureRequest>> {
        let target_id = caller_subject(actor)?;
        let key = pending_key(target_id);

        let (cached, generation) = self.cached_requests(&key).await;
        if let Some(requests) = cached {
            return Ok(requests);
        }

        let requests = self
            .store_policy
            .read("list_pending_for_target", move || {
                self.request_repository.list_pending_for_target(target_id)
            })
            .await?;

        self.store_view(
            &key,
            CachedDisclosureView::Requests(requests.clone()),
            generation,
        )
        .await;
        Ok(requests)
    }

    /// Lists requests the caller has sent, newest first.
    pub async fn get_sent_requests(
        &self,
        actor: &UserIdentity,
    ) -> AppResult<Vec<DisclosureRequest>> {
        let requester_id = caller_subject(actor)?;
        let key = sent_key(requester_id);

        let (cached, generation) = self.cached_requests(&key).await;
        if let Some(requests) = cached {
            return Ok(requests);
        }

        let requests = self
            .store_policy
            .read("list_sent_by_requester", move || {
                self.request_repository.list_sent_by_requester(requester_id)
            })
            .await?;

        self.store_view(
            &key,
            CachedDisclosureView::Requests(requests.clone()),
            generation,
        )
        .await;
        Ok(requests)
    }
}
