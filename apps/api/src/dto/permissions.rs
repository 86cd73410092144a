use carelink_application::SharedProfile;
use carelink_domain::{EffectivePermissionSet, PermissionGrant};
use serde::Serialize;
use serde_json::{Map, Value};
use ts_rs::TS;

use super::disclosure::field_names;

/// API representation of one authoritative grant row.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-grant-response.ts"
)]
pub struct PermissionGrantResponse {
    pub id: String,
    pub request_id: String,
    pub viewer_id: String,
    pub target_id: String,
    pub field: String,
    pub expires_at: Option<String>,
    pub created_at: String,
}

impl From<PermissionGrant> for PermissionGrantResponse {
    fn from(value: PermissionGrant) -> Self {
        Self {
            id: value.id.to_string(),
            request_id: value.request_id.to_string(),
            viewer_id: value.viewer_id,
            target_id: value.target_id,
            field: value.field.as_str().to_owned(),
            expires_at: value.expires_at.map(|timestamp| timestamp.to_rfc3339()),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// Effective permissions a viewer holds on a target.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/effective-permissions-response.ts"
)]
pub struct EffectivePermissionsResponse {
    pub target_id: String,
    pub viewer_id: String,
    pub permissions: Vec<String>,
    pub entries: Vec<PermissionGrantResponse>,
    pub earliest_expiry: Option<String>,
}

impl From<EffectivePermissionSet> for EffectivePermissionsResponse {
    fn from(value: EffectivePermissionSet) -> Self {
        Self {
            permissions: field_names(&value.permissions),
            entries: value
                .entries
                .into_iter()
                .map(PermissionGrantResponse::from)
                .collect(),
            earliest_expiry: value.earliest_expiry.map(|timestamp| timestamp.to_rfc3339()),
            target_id: value.target_id,
            viewer_id: value.viewer_id,
        }
    }
}

/// Target profile restricted to what the caller was granted.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/shared-profile-response.ts"
)]
pub struct SharedProfileResponse {
    pub target_id: String,
    #[ts(type = "Record<string, unknown>")]
    pub fields: Map<String, Value>,
    #[ts(type = "Array<unknown>")]
    pub media: Vec<Value>,
    #[ts(type = "Array<unknown>")]
    pub other_documents: Vec<Value>,
    pub earliest_expiry: Option<String>,
}

impl From<SharedProfile> for SharedProfileResponse {
    fn from(value: SharedProfile) -> Self {
        Self {
            target_id: value.target_id,
            fields: value.fields,
            media: value.media,
            other_documents: value.other_documents,
            earliest_expiry: value.earliest_expiry.map(|timestamp| timestamp.to_rfc3339()),
        }
    }
}
