use async_trait::async_trait;
use carelink_application::{ProfilePayload, ProfileStore, UserDirectory};
use carelink_core::AppResult;
use carelink_domain::FieldSet;
use serde_json::Value;
use sqlx::PgPool;

use crate::postgres_errors::map_sqlx_error;
use crate::profile_payload::select_fields;

/// PostgreSQL-backed user profiles stored as JSONB payloads.
#[derive(Clone)]
pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    /// Creates a profile store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresProfileStore {
    async fn user_exists(&self, user_id: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM user_profiles
                WHERE user_id = $1
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_sqlx_error("failed to resolve user", error))
    }
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn fetch_profile_fields(
        &self,
        target_id: &str,
        fields: &FieldSet,
    ) -> AppResult<ProfilePayload> {
        let payload = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT payload
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_sqlx_error("failed to load user profile", error))?;

        Ok(payload
            .map(|payload| select_fields(payload, fields))
            .unwrap_or_default())
    }
}
