use super::*;

#[async_trait]
impl PermissionGrantRepository for PostgresConsentRepository {
    async fn list_grants_for_pair(
        &self,
        target_id: &str,
        viewer_id: &str,
    ) -> AppResult<Vec<PermissionGrant>> {
        sqlx::query_as::<_, PermissionGrantRow>(
            r#"
            SELECT id, request_id, viewer_id, target_id, field, expires_at, revoked_at, created_at
            FROM permission_grants
            WHERE target_id = $1 AND viewer_id = $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(target_id)
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error("failed to list permission grants for pair", error))?
        .into_iter()
        .map(PermissionGrantRow::into_grant)
        .collect()
    }

    async fn list_grants_for_request(
        &self,
        request_id: DisclosureRequestId,
    ) -> AppResult<Vec<PermissionGrant>> {
        sqlx::query_as::<_, PermissionGrantRow>(
            r#"
            SELECT id, request_id, viewer_id, target_id, field, expires_at, revoked_at, created_at
            FROM permission_grants
            WHERE request_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(request_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error("failed to list permission grants for request", error))?
        .into_iter()
        .map(PermissionGrantRow::into_grant)
        .collect()
    }

    async fn insert_missing_grants(&self, grants: Vec<PermissionGrant>) -> AppResult<u64> {
        if grants.is_empty() {
            return Ok(0);
        }

        let mut transaction = self.begin().await?;
        let mut inserted = 0;

        for grant in &grants {
            let result = sqlx::query(
                r#"
                INSERT INTO permission_grants (
                    id, request_id, viewer_id, target_id, field, expires_at, revoked_at, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (request_id, field) DO NOTHING
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
            .execute(&mut *transaction)
            .await
            .map_err(|error| map_sqlx_error("failed to reinsert permission grant", error))?;

            inserted += result.rows_affected();
        }

        commit(transaction).await?;
        Ok(inserted)
    }
}
