use axum::Json;
use carelink_domain::FieldKey;

use crate::dto::FieldDescriptorResponse;

pub async fn list_fields_handler() -> Json<Vec<FieldDescriptorResponse>> {
    Json(
        FieldKey::vocabulary()
            .iter()
            .map(FieldDescriptorResponse::from)
            .collect(),
    )
}
