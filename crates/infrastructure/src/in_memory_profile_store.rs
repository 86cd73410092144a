use std::collections::HashMap;

use async_trait::async_trait;
use carelink_application::{ProfilePayload, ProfileStore, UserDirectory};
use carelink_core::AppResult;
use carelink_domain::FieldSet;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::profile_payload::select_fields;

/// In-memory user profiles backing both the user directory and profile store ports.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, Value>>,
}

impl InMemoryProfileStore {
    /// Creates an empty profile store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user's raw profile payload.
    pub async fn upsert_profile(&self, user_id: &str, payload: Value) {
        self.profiles
            .write()
            .await
            .insert(user_id.to_owned(), payload);
    }
}

#[async_trait]
impl UserDirectory for InMemoryProfileStore {
    async fn user_exists(&self, user_id: &str) -> AppResult<bool> {
        Ok(self.profiles.read().await.contains_key(user_id))
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn fetch_profile_fields(
        &self,
        target_id: &str,
        fields: &FieldSet,
    ) -> AppResult<ProfilePayload> {
        let payload = self.profiles.read().await.get(target_id).cloned();

        Ok(payload
            .map(|payload| select_fields(payload, fields))
            .unwrap_or_default())
    }
}
