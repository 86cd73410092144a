use std::str::FromStr;

use async_trait::async_trait;
use carelink_application::{
    ApproveDisclosureInput, DisclosureRequestRepository, PermissionGrantRepository,
    RevokeDisclosureInput,
};
use carelink_core::{AppError, AppResult};
use carelink_domain::{
    DisclosureRequest, DisclosureRequestId, DisclosureRequestParts, DisclosureStatus, FieldKey,
    FieldSet, PermissionGrant, PermissionGrantId,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::postgres_errors::map_sqlx_error;

mod grants;
mod requests;

#[cfg(test)]
mod tests;

/// PostgreSQL-backed store for disclosure requests and their permission grants.
#[derive(Clone)]
pub struct PostgresConsentRepository {
    pool: PgPool,
}

impl PostgresConsentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|error| map_sqlx_error("failed to begin transaction", error))
    }
}

#[derive(Debug, FromRow)]
struct DisclosureRequestRow {
    id: Uuid,
    requester_id: String,
    target_id: String,
    status: String,
    requested_fields: Vec<String>,
    shared_fields: Vec<String>,
    reason: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    responded_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DisclosureRequestRow {
    fn into_request(self) -> AppResult<DisclosureRequest> {
        let id = DisclosureRequestId::from_uuid(self.id);
        let corrupt = |error: AppError| {
            AppError::Internal(format!("stored disclosure request '{id}' is invalid: {error}"))
        };

        DisclosureRequest::from_parts(DisclosureRequestParts {
            id,
            requester_id: self.requester_id,
            target_id: self.target_id,
            status: DisclosureStatus::from_str(self.status.as_str()).map_err(corrupt)?,
            requested_fields: FieldSet::parse(&self.requested_fields).map_err(corrupt)?,
            shared_fields: FieldSet::parse(&self.shared_fields).map_err(corrupt)?,
            reason: self.reason,
            expires_at: self.expires_at,
            responded_at: self.responded_at,
            revoked_at: self.revoked_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PermissionGrantRow {
    id: Uuid,
    request_id: Uuid,
    viewer_id: String,
    target_id: String,
    field: String,
    expires_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl PermissionGrantRow {
    fn into_grant(self) -> AppResult<PermissionGrant> {
        let field = FieldKey::parse(self.field.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "stored permission grant '{}' has invalid field: {error}",
                self.id
            ))
        })?;

        Ok(PermissionGrant {
            id: PermissionGrantId::from_uuid(self.id),
            request_id: DisclosureRequestId::from_uuid(self.request_id),
            viewer_id: self.viewer_id,
            target_id: self.target_id,
            field,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
            created_at: self.created_at,
        })
    }
}

/// Locks one request row for the rest of the transaction.
async fn lock_request(
    transaction: &mut Transaction<'_, Postgres>,
    request_id: DisclosureRequestId,
) -> AppResult<DisclosureRequest> {
    sqlx::query_as::<_, DisclosureRequestRow>(
        r#"
        SELECT id, requester_id, target_id, status, requested_fields, shared_fields, reason,
               expires_at, responded_at, revoked_at, created_at, updated_at
        FROM disclosure_requests
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(request_id.as_uuid())
    .fetch_optional(&mut **transaction)
    .await
    .map_err(|error| map_sqlx_error("failed to lock disclosure request", error))?
    .ok_or_else(|| AppError::NotFound(format!("disclosure request '{request_id}' does not exist")))?
    .into_request()
}

async fn commit(transaction: Transaction<'_, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| map_sqlx_error("failed to commit consent transaction", error))
}
