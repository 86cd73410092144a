//! Projection of raw profile payloads down to granted fields.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use carelink_domain::{EffectivePermissionSet, FieldKey};

use crate::consent_ports::ProfilePayload;

/// Coarse document category used to split a document collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Photos, video and audio.
    Media,
    /// Anything else (PDFs, scans, certificates).
    Other,
}

/// Classifies one document entry from a profile payload.
pub trait DocumentClassifier: Send + Sync {
    /// Returns the category of a document entry.
    fn classify(&self, document: &Value) -> DocumentKind;
}

const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "heic", "heif", "bmp", "svg", "mp4", "mov", "m4v",
    "webm", "avi", "mp3", "m4a", "wav", "ogg",
];

const MEDIA_MIME_PREFIXES: &[&str] = &["image/", "video/", "audio/"];

/// Default heuristic: MIME type when present, file extension otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTypeDocumentClassifier;

impl DocumentClassifier for FileTypeDocumentClassifier {
    fn classify(&self, document: &Value) -> DocumentKind {
        let mime_type = ["mime_type", "mimeType", "content_type", "contentType", "type"]
            .iter()
            .find_map(|key| document.get(key).and_then(Value::as_str));

        if let Some(mime_type) = mime_type
            && mime_type.contains('/')
        {
            let lowered = mime_type.to_ascii_lowercase();
            return if MEDIA_MIME_PREFIXES
                .iter()
                .any(|prefix| lowered.starts_with(prefix))
            {
                DocumentKind::Media
            } else {
                DocumentKind::Other
            };
        }

        let location = match document {
            Value::String(location) => Some(location.as_str()),
            _ => ["file_name", "fileName", "name", "url", "path"]
                .iter()
                .find_map(|key| document.get(key).and_then(Value::as_str)),
        };

        let extension = location
            .map(|value| value.split(['?', '#']).next().unwrap_or(value))
            .and_then(|value| value.rsplit_once('.'))
            .map(|(_, extension)| extension.to_ascii_lowercase());

        match extension {
            Some(extension) if MEDIA_EXTENSIONS.contains(&extension.as_str()) => {
                DocumentKind::Media
            }
            _ => DocumentKind::Other,
        }
    }
}

/// Granted subset of a target's profile.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedProfile {
    /// Target user id.
    pub target_id: String,
    /// Granted field values keyed by canonical field key.
    pub fields: Map<String, Value>,
    /// Granted documents classified as media.
    pub media: Vec<Value>,
    /// Granted documents of every other kind.
    pub other_documents: Vec<Value>,
    /// Soonest expiry of the grants backing this projection.
    pub earliest_expiry: Option<DateTime<Utc>>,
}

impl SharedProfile {
    /// Returns a projection with nothing shared.
    #[must_use]
    pub fn empty(target_id: &str) -> Self {
        Self {
            target_id: target_id.to_owned(),
            fields: Map::new(),
            media: Vec::new(),
            other_documents: Vec::new(),
            earliest_expiry: None,
        }
    }
}

/// Filters raw profile payloads by an effective permission set.
#[derive(Clone)]
pub struct SharedProfileProjector {
    classifier: Arc<dyn DocumentClassifier>,
}

impl Default for SharedProfileProjector {
    fn default() -> Self {
        Self::new(Arc::new(FileTypeDocumentClassifier))
    }
}

impl SharedProfileProjector {
    /// Creates a projector with a document classifier.
    #[must_use]
    pub fn new(classifier: Arc<dyn DocumentClassifier>) -> Self {
        Self { classifier }
    }

    /// Keeps only granted fields of a raw payload.
    ///
    /// Payload keys are normalized before matching, so `phoneNumber` and `phone_number`
    /// resolve to the same grant. Keys that fail normalization are dropped. When several raw
    /// keys normalize to one field, the key already in canonical form wins, then the first key
    /// in payload order.
    #[must_use]
    pub fn project(
        &self,
        permissions: &EffectivePermissionSet,
        payload: ProfilePayload,
    ) -> SharedProfile {
        let mut profile = SharedProfile::empty(permissions.target_id.as_str());
        profile.earliest_expiry = permissions.earliest_expiry;

        for (field, value) in granted_entries(permissions, payload) {
            match (field, value) {
                (FieldKey::Documents, Value::Array(documents)) => {
                    for document in documents {
                        match self.classifier.classify(&document) {
                            DocumentKind::Media => profile.media.push(document),
                            DocumentKind::Other => profile.other_documents.push(document),
                        }
                    }
                }
                (field, value) => {
                    profile.fields.insert(field.as_str().to_owned(), value);
                }
            }
        }

        profile
    }
}

/// One value per granted field, in payload order.
fn granted_entries(
    permissions: &EffectivePermissionSet,
    payload: ProfilePayload,
) -> Vec<(FieldKey, Value)> {
    let mut entries: Vec<(FieldKey, Value)> = Vec::new();
    let mut slots: HashMap<FieldKey, (usize, bool)> = HashMap::new();

    for (raw_key, value) in payload {
        let Ok(field) = FieldKey::parse(raw_key.as_str()) else {
            continue;
        };
        if !permissions.allows(&field) {
            continue;
        }

        let canonical = raw_key == field.as_str();
        match slots.get_mut(&field) {
            Some((index, slot_canonical)) => {
                if canonical
                    && !*slot_canonical
                    && let Some(entry) = entries.get_mut(*index)
                {
                    entry.1 = value;
                    *slot_canonical = true;
                }
            }
            None => {
                slots.insert(field.clone(), (entries.len(), canonical));
                entries.push((field, value));
            }
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use carelink_domain::{
        DisclosureRequestId, EffectivePermissionSet, FieldKey, PermissionGrant, PermissionGrantId,
    };

    use super::{DocumentClassifier, DocumentKind, FileTypeDocumentClassifier, SharedProfileProjector};

    fn permissions(fields: &[FieldKey]) -> EffectivePermissionSet {
        let now = Utc::now();
        let grants = fields
            .iter()
            .map(|field| PermissionGrant {
                id: PermissionGrantId::new(),
                request_id: DisclosureRequestId::new(),
                viewer_id: "u1".to_owned(),
                target_id: "u2".to_owned(),
                field: field.clone(),
                expires_at: None,
                revoked_at: None,
                created_at: now,
            })
            .collect();

        EffectivePermissionSet::compute("u2", "u1", grants, now, false)
    }

    fn payload(value: serde_json::Value) -> super::ProfilePayload {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn projection_keeps_only_granted_fields() {
        let projector = SharedProfileProjector::default();
        let profile = projector.project(
            &permissions(&[FieldKey::Phone]),
            payload(json!({
                "phoneNumber": "555-0100",
                "phone": "555-0101",
                "address": "1 Main St",
                "childAllergies": ["peanuts"],
            })),
        );

        assert_eq!(profile.fields.get("phone"), Some(&json!("555-0101")));
        assert!(!profile.fields.contains_key("address"));
        assert!(!profile.fields.contains_key("child_allergies"));
        assert_eq!(profile.fields.len(), 1);
    }

    #[test]
    fn canonical_key_wins_over_aliases_of_the_same_field() {
        let projector = SharedProfileProjector::default();
        let profile = projector.project(
            &permissions(&[FieldKey::Phone, FieldKey::Documents]),
            payload(json!({
                "PHONE": "555-0199",
                "Phone": "555-0198",
                "phone": "555-0101",
                "Documents": [{ "name": "old.png" }],
                "documents": [{ "name": "cpr-certificate.pdf" }],
            })),
        );

        assert_eq!(profile.fields.get("phone"), Some(&json!("555-0101")));
        assert!(profile.media.is_empty());
        assert_eq!(profile.other_documents, vec![json!({ "name": "cpr-certificate.pdf" })]);
    }

    #[test]
    fn first_alias_wins_without_a_canonical_key() {
        let projector = SharedProfileProjector::default();
        let profile = projector.project(
            &permissions(&[FieldKey::ChildAllergies]),
            payload(json!({
                "Child-Allergies": ["peanuts"],
                "childAllergies": ["shellfish"],
            })),
        );

        assert_eq!(profile.fields.get("child_allergies"), Some(&json!(["peanuts"])));
    }

    #[test]
    fn projection_normalizes_payload_keys() {
        let projector = SharedProfileProjector::default();
        let profile = projector.project(
            &permissions(&[FieldKey::ChildAllergies]),
            payload(json!({ "Child-Allergies": ["peanuts"] })),
        );

        assert_eq!(profile.fields.get("child_allergies"), Some(&json!(["peanuts"])));
    }

    #[test]
    fn granted_documents_split_into_media_and_other() {
        let projector = SharedProfileProjector::default();
        let profile = projector.project(
            &permissions(&[FieldKey::Documents]),
            payload(json!({
                "documents": [
                    { "name": "cpr-certificate.pdf" },
                    { "url": "https://cdn.example/photo.JPG?size=large" },
                    { "mime_type": "video/mp4", "name": "intro" },
                    "scan.tiff",
                ]
            })),
        );

        assert_eq!(profile.media.len(), 2);
        assert_eq!(profile.other_documents.len(), 2);
        assert!(profile.fields.is_empty());
    }

    #[test]
    fn ungranted_documents_are_not_projected() {
        let projector = SharedProfileProjector::default();
        let profile = projector.project(
            &permissions(&[FieldKey::Phone]),
            payload(json!({ "documents": [{ "name": "photo.png" }] })),
        );

        assert!(profile.media.is_empty());
        assert!(profile.other_documents.is_empty());
    }

    #[test]
    fn classifier_prefers_mime_type_over_extension() {
        let classifier = FileTypeDocumentClassifier;
        assert_eq!(
            classifier.classify(&json!({ "mime_type": "application/pdf", "name": "photo.png" })),
            DocumentKind::Other
        );
        assert_eq!(
            classifier.classify(&json!({ "contentType": "image/heic" })),
            DocumentKind::Media
        );
    }
}
