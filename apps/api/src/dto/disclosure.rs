use carelink_application::{CreateDisclosureRequestInput, RespondToDisclosureRequestInput};
use carelink_core::{AppError, AppResult};
use carelink_domain::{DisclosureRequest, FieldSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for a new disclosure request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-disclosure-request-request.ts"
)]
pub struct CreateDisclosureRequestRequest {
    pub target_id: String,
    pub requested_fields: Vec<String>,
    pub reason: Option<String>,
    /// RFC 3339 timestamp.
    pub expires_at: Option<String>,
}

impl CreateDisclosureRequestRequest {
    pub fn into_input(self) -> AppResult<CreateDisclosureRequestInput> {
        Ok(CreateDisclosureRequestInput {
            target_id: self.target_id,
            requested_fields: self.requested_fields,
            reason: self.reason,
            expires_at: parse_timestamp("expires_at", self.expires_at.as_deref())?,
        })
    }
}

/// Incoming payload for the target's answer to a request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/respond-to-disclosure-request-request.ts"
)]
pub struct RespondToDisclosureRequestRequest {
    pub approved: bool,
    /// Defaults to every requested field when omitted on approval.
    pub shared_fields: Option<Vec<String>>,
    pub expires_at: Option<String>,
}

impl RespondToDisclosureRequestRequest {
    pub fn into_input(self) -> AppResult<RespondToDisclosureRequestInput> {
        Ok(RespondToDisclosureRequestInput {
            approved: self.approved,
            shared_fields: self.shared_fields,
            expires_at: parse_timestamp("expires_at", self.expires_at.as_deref())?,
        })
    }
}

/// API representation of a disclosure request.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/disclosure-request-response.ts"
)]
pub struct DisclosureRequestResponse {
    pub id: String,
    pub requester_id: String,
    pub target_id: String,
    pub status: String,
    pub requested_fields: Vec<String>,
    pub shared_fields: Vec<String>,
    pub reason: Option<String>,
    pub expires_at: Option<String>,
    pub responded_at: Option<String>,
    pub revoked_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<DisclosureRequest> for DisclosureRequestResponse {
    fn from(value: DisclosureRequest) -> Self {
        Self {
            id: value.id().to_string(),
            requester_id: value.requester_id().to_owned(),
            target_id: value.target_id().to_owned(),
            status: value.status().as_str().to_owned(),
            requested_fields: field_names(value.requested_fields()),
            shared_fields: field_names(value.shared_fields()),
            reason: value.reason().map(str::to_owned),
            expires_at: value.expires_at().map(|timestamp| timestamp.to_rfc3339()),
            responded_at: value.responded_at().map(|timestamp| timestamp.to_rfc3339()),
            revoked_at: value.revoked_at().map(|timestamp| timestamp.to_rfc3339()),
            created_at: value.created_at().to_rfc3339(),
            updated_at: value.updated_at().to_rfc3339(),
        }
    }
}

pub(super) fn field_names(fields: &FieldSet) -> Vec<String> {
    fields.iter().map(|field| field.as_str().to_owned()).collect()
}

fn parse_timestamp(name: &str, raw: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(value.trim())
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}")))
    })
    .transpose()
}
