use carelink_application::ProfilePayload;
use carelink_domain::{FieldKey, FieldSet};
use serde_json::Value;

/// Keeps the payload entries whose normalized key is in `fields`.
pub(crate) fn select_fields(payload: Value, fields: &FieldSet) -> ProfilePayload {
    let Value::Object(entries) = payload else {
        return ProfilePayload::new();
    };

    entries
        .into_iter()
        .filter(|(key, _)| {
            FieldKey::parse(key.as_str()).is_ok_and(|field| fields.contains(&field))
        })
        .collect()
}
