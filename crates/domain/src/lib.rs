//! Domain entities and invariants for field-level disclosure consent.

#![forbid(unsafe_code)]

mod disclosure;
mod field;
mod permissions;

pub use disclosure::{
    DisclosureRequest, DisclosureRequestId, DisclosureRequestParts, DisclosureStatus,
    PermissionGrant, PermissionGrantId,
};
pub use field::{FieldKey, FieldSet, MAX_FIELD_KEY_LENGTH, display_field_key, normalize_field_key};
pub use permissions::EffectivePermissionSet;
