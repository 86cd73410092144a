use super::*;

use super::cache_views::permissions_key;

impl ConsentService {
    /// Returns the effective permissions a viewer holds on a target.
    ///
    /// Only the viewer or the target may ask. The active view is cached; views including
    /// expired grants always come from the store.
    pub async fn get_viewer_permissions(
        &self,
        actor: &UserIdentity,
        target_id: &str,
        viewer_id: &str,
        include_expired: bool,
    ) -> AppResult<EffectivePermissionSet> {
        let subject = caller_subject(actor)?;
        let target_id = target_id.trim();
        let viewer_id = viewer_id.trim();

        if target_id.is_empty() || viewer_id.is_empty() {
            return Err(AppError::Validation(
                "target and viewer ids must not be empty".to_owned(),
            ));
        }

        if subject != target_id && subject != viewer_id {
            return Err(AppError::Forbidden(format!(
                "subject '{subject}' cannot inspect permissions between '{viewer_id}' and '{target_id}'"
            )));
        }

        self.effective_permissions(target_id, viewer_id, include_expired)
            .await
    }

    /// Returns the caller's granted view of a target's profile.
    pub async fn get_shared_profile(
        &self,
        actor: &UserIdentity,
        target_id: &str,
    ) -> AppResult<SharedProfile> {
        let viewer_id = caller_subject(actor)?;
        let target_id = target_id.trim();
        if target_id.is_empty() {
            return Err(AppError::Validation(
                "target id must not be empty".to_owned(),
            ));
        }

        let permissions = self
            .effective_permissions(target_id, viewer_id, false)
            .await?;
        if permissions.is_empty() {
            return Ok(SharedProfile::empty(target_id));
        }

        let fields = &permissions.permissions;
        let payload = self
            .store_policy
            .read("fetch_profile_fields", move || {
                self.profile_store.fetch_profile_fields(target_id, fields)
            })
            .await
            .inspect_err(|error| {
                warn!(
                    operation = "get_shared_profile",
                    target_id,
                    viewer_id,
                    %error,
                    "failed to fetch shared profile fields"
                );
            })?;

        Ok(self.projector.project(&permissions, payload))
    }

    async fn effective_permissions(
        &self,
        target_id: &str,
        viewer_id: &str,
        include_expired: bool,
    ) -> AppResult<EffectivePermissionSet> {
        let now = Utc::now();
        let key = permissions_key(target_id, viewer_id);

        let mut generation = None;
        if !include_expired {
            let (cached, seen) = self.cached_permissions(&key, now).await;
            if let Some(permissions) = cached {
                return Ok(permissions);
            }
            generation = seen;
        }

        let grants = self
            .store_policy
            .read("list_grants_for_pair", move || {
                self.grant_repository.list_grants_for_pair(target_id, viewer_id)
            })
            .await?;
        let permissions =
            EffectivePermissionSet::compute(target_id, viewer_id, grants, now, include_expired);

        self.store_view(
            &key,
            CachedDisclosureView::Permissions(permissions.clone()),
            generation,
        )
        .await;

        Ok(permissions)
    }
}
