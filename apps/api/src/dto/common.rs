use carelink_domain::FieldKey;
use serde::Serialize;
use ts_rs::TS;

/// Status of one backing dependency.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/health-dependency-status.ts"
)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    pub detail: Option<String>,
}

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub postgres: HealthDependencyStatus,
    pub redis: HealthDependencyStatus,
}

/// One entry of the disclosable field vocabulary.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/field-descriptor-response.ts"
)]
pub struct FieldDescriptorResponse {
    pub key: String,
    pub label: String,
    /// UI hint only; access is still gated by grants.
    pub sensitive: bool,
}

impl From<&FieldKey> for FieldDescriptorResponse {
    fn from(value: &FieldKey) -> Self {
        Self {
            key: value.as_str().to_owned(),
            label: value.display_label(),
            sensitive: value.is_sensitive(),
        }
    }
}
