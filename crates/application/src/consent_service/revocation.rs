use super::*;

use super::cache_views::request_keys;

impl ConsentService {
    /// Revokes the access an approved request granted.
    ///
    /// Either party may revoke. Revoking twice returns the already revoked request.
    pub async fn revoke_access(
        &self,
        actor: &UserIdentity,
        request_id: DisclosureRequestId,
    ) -> AppResult<DisclosureRequest> {
        let subject = caller_subject(actor)?;
        let request = self.load_request(request_id).await?;

        if !request.involves(subject) {
            return Err(AppError::Forbidden(format!(
                "subject '{subject}' is not a party to disclosure request '{request_id}'"
            )));
        }

        let now = Utc::now();
        let mut revoked = request.clone();
        revoked.revoke(now)?;

        if request.revoked_at().is_some() {
            return Ok(request);
        }

        let persisted = self
            .store_policy
            .write(
                "revoke_request",
                self.request_repository.revoke_request(RevokeDisclosureInput {
                    request_id,
                    revoked_at: now,
                }),
            )
            .await
            .inspect_err(|error| {
                warn!(
                    operation = "revoke_access",
                    %request_id,
                    requester_id = request.requester_id(),
                    target_id = request.target_id(),
                    %error,
                    "failed to revoke disclosure request"
                );
            })?;

        info!(
            operation = "revoke_access",
            %request_id,
            requester_id = persisted.requester_id(),
            target_id = persisted.target_id(),
            revoked_by = subject,
            "disclosure access revoked"
        );

        self.invalidate_views(&request_keys(&persisted)).await;
        self.notify(DisclosureNotification::AccessRevoked {
            request_id,
            requester_id: persisted.requester_id().to_owned(),
            target_id: persisted.target_id().to_owned(),
        })
        .await;

        Ok(persisted)
    }
}
