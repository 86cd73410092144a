use serde::Serialize;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    message: String,
    retryable: bool,
}

impl ErrorResponse {
    pub(super) fn new(message: String, retryable: bool) -> Self {
        Self { message, retryable }
    }
}
