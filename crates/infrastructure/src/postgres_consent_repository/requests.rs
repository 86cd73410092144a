use super::*;

#[async_trait]
impl DisclosureRequestRepository for PostgresConsentRepository {
    async fn insert_request(&self, request: DisclosureRequest) -> AppResult<DisclosureRequest> {
        sqlx::query(
            r#"
            INSERT INTO disclosure_requests (
                id, requester_id, target_id, status, requested_fields, shared_fields, reason,
                expires_at, responded_at, revoked_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(request.requester_id())
        .bind(request.target_id())
        .bind(request.status().as_str())
        .bind(request.requested_fields().to_storage_values())
        .bind(request.shared_fields().to_storage_values())
        .bind(request.reason())
        .bind(request.expires_at())
        .bind(request.responded_at())
        .bind(request.revoked_at())
        .bind(request.created_at())
        .bind(request.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|error| map_sqlx_error("failed to insert disclosure request", error))?;

        Ok(request)
    }

    async fn find_request(
        &self,
        request_id: DisclosureRequestId,
    ) -> AppResult<Option<DisclosureRequest>> {
        sqlx::query_as::<_, DisclosureRequestRow>(
            r#"
            SELECT id, requester_id, target_id, status, requested_fields, shared_fields, reason,
                   expires_at, responded_at, revoked_at, created_at, updated_at
            FROM disclosure_requests
            WHERE id = $1
            "#,
        )
        .bind(request_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_sqlx_error("failed to find disclosure request", error))?
        .map(DisclosureRequestRow::into_request)
        .transpose()
    }

    async fn list_pending_for_target(&self, target_id: &str) -> AppResult<Vec<DisclosureRequest>> {
        sqlx::query_as::<_, DisclosureRequestRow>(
            r#"
            SELECT id, requester_id, target_id, status, requested_fields, shared_fields, reason,
                   expires_at, responded_at, revoked_at, created_at, updated_at
            FROM disclosure_requests
            WHERE target_id = $1 AND status = 'pending'
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(target_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error("failed to list pending disclosure requests", error))?
        .into_iter()
        .map(DisclosureRequestRow::into_request)
        .collect()
    }

    async fn list_sent_by_requester(
        &self,
        requester_id: &str,
    ) -> AppResult<Vec<DisclosureRequest>> {
        sqlx::query_as::<_, DisclosureRequestRow>(
            r#"
            SELECT id, requester_id, target_id, status, requested_fields, shared_fields, reason,
                   expires_at, responded_at, revoked_at, created_at, updated_at
            FROM disclosure_requests
            WHERE requester_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(requester_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error("failed to list sent disclosure requests", error))?
        .into_iter()
        .map(DisclosureRequestRow::into_request)
        .collect()
    }

    async fn approve_request(&self, input: ApproveDisclosureInput) -> AppResult<DisclosureRequest> {
        let mut transaction = self.begin().await?;
        let mut request = lock_request(&mut transaction, input.request_id).await?;

        request.approve(input.shared_fields, input.expires_at, input.responded_at)?;

        sqlx::query(
            r#"
            UPDATE disclosure_requests
            SET status = $2,
                shared_fields = $3,
                expires_at = $4,
                responded_at = $5,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(request.status().as_str())
        .bind(request.shared_fields().to_storage_values())
        .bind(request.expires_at())
        .bind(input.responded_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error("failed to approve disclosure request", error))?;

        for grant in PermissionGrant::for_request(&request, &input.grant_fields, input.responded_at)
        {
            insert_grant(&mut transaction, &grant).await?;
        }

        commit(transaction).await?;
        Ok(request)
    }

    async fn decline_request(
        &self,
        request_id: DisclosureRequestId,
        responded_at: DateTime<Utc>,
    ) -> AppResult<DisclosureRequest> {
        let mut transaction = self.begin().await?;
        let mut request = lock_request(&mut transaction, request_id).await?;

        request.decline(responded_at)?;

        sqlx::query(
            r#"
            UPDATE disclosure_requests
            SET status = $2,
                shared_fields = '{}',
                responded_at = $3,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(request_id.as_uuid())
        .bind(request.status().as_str())
        .bind(responded_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error("failed to decline disclosure request", error))?;

        commit(transaction).await?;
        Ok(request)
    }

    async fn revoke_request(&self, input: RevokeDisclosureInput) -> AppResult<DisclosureRequest> {
        let mut transaction = self.begin().await?;
        let mut request = lock_request(&mut transaction, input.request_id).await?;
        let already_revoked = request.revoked_at().is_some();

        request.revoke(input.revoked_at)?;

        if already_revoked {
            commit(transaction).await?;
            return Ok(request);
        }

        sqlx::query(
            r#"
            UPDATE disclosure_requests
            SET revoked_at = $2,
                updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(input.revoked_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error("failed to revoke disclosure request", error))?;

        sqlx::query(
            r#"
            UPDATE permission_grants
            SET revoked_at = $4
            WHERE target_id = $1
              AND viewer_id = $2
              AND field = ANY($3)
              AND revoked_at IS NULL
            "#,
        )
        .bind(request.target_id())
        .bind(request.requester_id())
        .bind(request.shared_fields().to_storage_values())
        .bind(input.revoked_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error("failed to revoke permission grants", error))?;

        commit(transaction).await?;
        Ok(request)
    }
}

async fn insert_grant(
    transaction: &mut Transaction<'_, Postgres>,
    grant: &PermissionGrant,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO permission_grants (
            id, request_id, viewer_id, target_id, field, expires_at, revoked_at, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(grant.id.as_uuid())
    .bind(grant.request_id.as_uuid())
    .bind(grant.viewer_id.as_str())
    .bind(grant.target_id.as_str())
    .bind(grant.field.as_str())
    .bind(grant.expires_at)
    .bind(grant.revoked_at)
    .bind(grant.created_at)
    .execute(&mut **transaction)
    .await
    .map_err(|error| {
        map_sqlx_error(
            &format!("failed to insert permission grant for field '{}'", grant.field),
            error,
        )
    })?;

    Ok(())
}
