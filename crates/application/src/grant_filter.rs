//! Drops candidate fields that an existing grant already covers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use carelink_domain::{EffectivePermissionSet, FieldSet};

use crate::consent_ports::PermissionGrantRepository;
use crate::store_policy::StoreCallPolicy;

/// Result of filtering candidate grants against existing ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantFilterOutcome {
    /// Lookup succeeded; `remaining` still needs rows.
    Filtered {
        /// Fields that need a new grant row.
        remaining: FieldSet,
        /// Fields already covered by an active grant.
        already_granted: FieldSet,
    },
    /// Lookup failed; every candidate is kept and the store's uniqueness guard applies.
    FailedOpen {
        /// Full candidate set.
        remaining: FieldSet,
        /// Lookup failure description.
        reason: String,
    },
}

impl GrantFilterOutcome {
    /// Returns the fields that still need grant rows.
    #[must_use]
    pub fn remaining(&self) -> &FieldSet {
        match self {
            Self::Filtered { remaining, .. } | Self::FailedOpen { remaining, .. } => remaining,
        }
    }

    /// Consumes the outcome, returning the fields that still need grant rows.
    #[must_use]
    pub fn into_remaining(self) -> FieldSet {
        match self {
            Self::Filtered { remaining, .. } | Self::FailedOpen { remaining, .. } => remaining,
        }
    }

    /// Returns whether the lookup failed and the filter fell back to the full set.
    #[must_use]
    pub fn is_fail_open(&self) -> bool {
        matches!(self, Self::FailedOpen { .. })
    }
}

/// Deduplicates grants before insert.
#[derive(Clone)]
pub struct GrantFilter {
    repository: Arc<dyn PermissionGrantRepository>,
    store_policy: StoreCallPolicy,
}

impl GrantFilter {
    /// Creates a filter reading from the grant repository.
    #[must_use]
    pub fn new(
        repository: Arc<dyn PermissionGrantRepository>,
        store_policy: StoreCallPolicy,
    ) -> Self {
        Self {
            repository,
            store_policy,
        }
    }

    /// Returns candidate fields not already covered by an active grant for the pair.
    ///
    /// An existing grant covers a candidate only when it lasts at least as long as the new
    /// grant would, so approving a longer window still writes a row.
    pub async fn filter(
        &self,
        target_id: &str,
        viewer_id: &str,
        candidates: &FieldSet,
        new_expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> GrantFilterOutcome {
        let lookup = self
            .store_policy
            .read("list_grants_for_pair", move || {
                self.repository.list_grants_for_pair(target_id, viewer_id)
            })
            .await;

        let grants = match lookup {
            Ok(grants) => grants,
            Err(error) => {
                warn!(
                    operation = "grant_filter",
                    target_id,
                    viewer_id,
                    %error,
                    "grant lookup failed, keeping every candidate field"
                );
                return GrantFilterOutcome::FailedOpen {
                    remaining: candidates.clone(),
                    reason: error.to_string(),
                };
            }
        };

        let active = EffectivePermissionSet::compute(target_id, viewer_id, grants, now, false);
        let already_granted: FieldSet = active
            .entries
            .iter()
            .filter(|grant| candidates.contains(&grant.field))
            .filter(|grant| match (grant.expires_at, new_expires_at) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(existing), Some(requested)) => existing >= requested,
            })
            .map(|grant| grant.field.clone())
            .collect();

        GrantFilterOutcome::Filtered {
            remaining: candidates.difference(&already_granted),
            already_granted,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use carelink_core::{AppError, AppResult};
    use carelink_domain::{
        DisclosureRequestId, FieldKey, FieldSet, PermissionGrant, PermissionGrantId,
    };
    use chrono::{DateTime, Duration, Utc};

    use super::{GrantFilter, GrantFilterOutcome};
    use crate::consent_ports::PermissionGrantRepository;
    use crate::store_policy::StoreCallPolicy;

    struct FixedGrants(AppResult<Vec<PermissionGrant>>);

    #[async_trait]
    impl PermissionGrantRepository for FixedGrants {
        async fn list_grants_for_pair(
            &self,
            _target_id: &str,
            _viewer_id: &str,
        ) -> AppResult<Vec<PermissionGrant>> {
            match &self.0 {
                Ok(grants) => Ok(grants.clone()),
                Err(_) => Err(AppError::Internal("grant table unavailable".to_owned())),
            }
        }

        async fn list_grants_for_request(
            &self,
            _request_id: DisclosureRequestId,
        ) -> AppResult<Vec<PermissionGrant>> {
            Ok(Vec::new())
        }

        async fn insert_missing_grants(&self, _grants: Vec<PermissionGrant>) -> AppResult<u64> {
            Ok(0)
        }
    }

    fn grant(field: FieldKey, expires_at: Option<DateTime<Utc>>) -> PermissionGrant {
        PermissionGrant {
            id: PermissionGrantId::new(),
            request_id: DisclosureRequestId::new(),
            viewer_id: "u1".to_owned(),
            target_id: "u2".to_owned(),
            field,
            expires_at,
            revoked_at: None,
            created_at: Utc::now() - Duration::minutes(1),
        }
    }

    fn filter_over(grants: AppResult<Vec<PermissionGrant>>) -> GrantFilter {
        GrantFilter::new(Arc::new(FixedGrants(grants)), StoreCallPolicy::default())
    }

    #[tokio::test]
    async fn open_ended_grants_cover_candidates() {
        let filter = filter_over(Ok(vec![grant(FieldKey::Phone, None)]));
        let candidates: FieldSet = vec![FieldKey::Phone, FieldKey::Address].into();

        let outcome = filter
            .filter("u2", "u1", &candidates, None, Utc::now())
            .await;

        assert_eq!(
            outcome,
            GrantFilterOutcome::Filtered {
                remaining: vec![FieldKey::Address].into(),
                already_granted: vec![FieldKey::Phone].into(),
            }
        );
    }

    #[tokio::test]
    async fn shorter_existing_grant_does_not_cover_longer_request() {
        let now = Utc::now();
        let filter = filter_over(Ok(vec![grant(
            FieldKey::Phone,
            Some(now + Duration::hours(1)),
        )]));
        let candidates: FieldSet = vec![FieldKey::Phone].into();

        let open_ended = filter.filter("u2", "u1", &candidates, None, now).await;
        assert_eq!(open_ended.remaining(), &candidates);

        let longer = filter
            .filter("u2", "u1", &candidates, Some(now + Duration::days(1)), now)
            .await;
        assert_eq!(longer.remaining(), &candidates);

        let shorter = filter
            .filter("u2", "u1", &candidates, Some(now + Duration::minutes(5)), now)
            .await;
        assert!(shorter.remaining().is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_keeps_every_candidate() {
        let filter = filter_over(Err(AppError::Internal("down".to_owned())));
        let candidates: FieldSet = vec![FieldKey::Phone, FieldKey::Email].into();

        let outcome = filter
            .filter("u2", "u1", &candidates, None, Utc::now())
            .await;

        assert!(outcome.is_fail_open());
        assert_eq!(outcome.into_remaining(), candidates);
    }
}
