use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::disclosure::PermissionGrant;
use crate::field::{FieldKey, FieldSet};

/// Deduplicated view of the grants a viewer holds on a target at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissionSet {
    /// User owning the fields.
    pub target_id: String,
    /// User viewing the fields.
    pub viewer_id: String,
    /// Granted fields, newest grant first.
    pub permissions: FieldSet,
    /// Authoritative grant row per field.
    pub entries: Vec<PermissionGrant>,
    /// Soonest non-null expiry among entries, `None` when all are open-ended.
    pub earliest_expiry: Option<DateTime<Utc>>,
}

impl EffectivePermissionSet {
    /// Computes the effective set from grant rows for one (viewer, target) pair.
    ///
    /// Rows are ordered newest first; the newest row per field is authoritative and only then
    /// are expired rows dropped, unless `include_expired` is set. Revoked rows never count.
    #[must_use]
    pub fn compute(
        target_id: &str,
        viewer_id: &str,
        mut grants: Vec<PermissionGrant>,
        now: DateTime<Utc>,
        include_expired: bool,
    ) -> Self {
        grants.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        let mut seen = HashSet::new();
        let entries = grants
            .into_iter()
            .filter(|grant| {
                grant.revoked_at.is_none()
                    && grant.target_id == target_id
                    && grant.viewer_id == viewer_id
            })
            .filter(|grant| seen.insert(grant.field.clone()))
            .filter(|grant| include_expired || !grant.is_expired_at(now))
            .collect::<Vec<_>>();

        Self::from_entries(target_id, viewer_id, entries)
    }

    /// Returns an empty set for the pair.
    #[must_use]
    pub fn empty(target_id: &str, viewer_id: &str) -> Self {
        Self::from_entries(target_id, viewer_id, Vec::new())
    }

    fn from_entries(target_id: &str, viewer_id: &str, entries: Vec<PermissionGrant>) -> Self {
        let permissions = entries.iter().map(|grant| grant.field.clone()).collect();
        let earliest_expiry = entries.iter().filter_map(|grant| grant.expires_at).min();

        Self {
            target_id: target_id.to_owned(),
            viewer_id: viewer_id.to_owned(),
            permissions,
            entries,
            earliest_expiry,
        }
    }

    /// Drops entries that expired since the set was computed.
    #[must_use]
    pub fn pruned_at(self, now: DateTime<Utc>) -> Self {
        let entries = self
            .entries
            .into_iter()
            .filter(|grant| !grant.is_expired_at(now))
            .collect();

        Self::from_entries(self.target_id.as_str(), self.viewer_id.as_str(), entries)
    }

    /// Returns whether the viewer may see the field.
    #[must_use]
    pub fn allows(&self, field: &FieldKey) -> bool {
        self.permissions.contains(field)
    }

    /// Returns whether nothing is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
