//! Profile field vocabulary, key normalization and sensitivity labels.
//!
//! Marketplace payloads name profile fields loosely (`phoneNumber`, `Background-Check`,
//! `child allergies`). Every identifier entering the consent engine is folded into one
//! canonical lowercase, underscore-separated key before it is compared or stored.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use carelink_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Maximum length of a canonical field key.
pub const MAX_FIELD_KEY_LENGTH: usize = 64;

/// Folds an arbitrary-case, arbitrary-delimiter identifier into its canonical form.
///
/// camelCase boundaries and every run of non-alphanumeric ASCII characters become a single
/// `_`; leading and trailing separators are dropped. The result is idempotent.
#[must_use]
pub fn normalize_field_key(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len() + 4);
    let mut previous: Option<char> = None;
    let mut pending_separator = false;

    for character in raw.trim().chars() {
        if character.is_ascii_alphanumeric() {
            let camel_boundary = character.is_ascii_uppercase()
                && previous.is_some_and(|value| value.is_ascii_lowercase() || value.is_ascii_digit());

            if (pending_separator || camel_boundary) && !normalized.is_empty() {
                normalized.push('_');
            }

            pending_separator = false;
            normalized.push(character.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }

        previous = Some(character);
    }

    normalized
}

/// Turns a canonical key back into a human-readable label ("background_check" → "Background Check").
#[must_use]
pub fn display_field_key(canonical: &str) -> String {
    canonical
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut characters = word.chars();
            match characters.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + characters.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Profile field that can be requested, granted and projected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldKey {
    /// Legal or display name.
    FullName,
    /// Phone number.
    Phone,
    /// Contact email.
    Email,
    /// Home address.
    Address,
    /// Date of birth.
    DateOfBirth,
    /// Profile photo.
    ProfilePhoto,
    /// Free-text biography.
    Bio,
    /// Caregiving certifications.
    Certifications,
    /// Professional references.
    References,
    /// Hourly rate.
    HourlyRate,
    /// Weekly availability.
    Availability,
    /// Uploaded documents and media.
    Documents,
    /// Background check outcome.
    BackgroundCheck,
    /// Emergency contacts.
    EmergencyContacts,
    /// Child age ranges the caregiver accepts or the family needs.
    AgeCareRanges,
    /// Child medical information.
    ChildMedicalInfo,
    /// Child allergies.
    ChildAllergies,
    /// Child behavior notes.
    ChildBehaviorNotes,
    /// Payment and payout information.
    FinancialInfo,
    /// Canonical key outside the known vocabulary.
    Unknown(String),
}

const KNOWN_FIELDS: &[FieldKey] = &[
    FieldKey::FullName,
    FieldKey::Phone,
    FieldKey::Email,
    FieldKey::Address,
    FieldKey::DateOfBirth,
    FieldKey::ProfilePhoto,
    FieldKey::Bio,
    FieldKey::Certifications,
    FieldKey::References,
    FieldKey::HourlyRate,
    FieldKey::Availability,
    FieldKey::Documents,
    FieldKey::BackgroundCheck,
    FieldKey::EmergencyContacts,
    FieldKey::AgeCareRanges,
    FieldKey::ChildMedicalInfo,
    FieldKey::ChildAllergies,
    FieldKey::ChildBehaviorNotes,
    FieldKey::FinancialInfo,
];

impl FieldKey {
    /// Normalizes a raw identifier and resolves it against the known vocabulary.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let canonical = normalize_field_key(raw);

        if canonical.is_empty() {
            return Err(AppError::Validation(format!(
                "field identifier '{raw}' is empty after normalization"
            )));
        }

        if canonical.len() > MAX_FIELD_KEY_LENGTH {
            return Err(AppError::Validation(format!(
                "field identifier exceeds {MAX_FIELD_KEY_LENGTH} characters"
            )));
        }

        Ok(Self::from_canonical(canonical))
    }

    fn from_canonical(canonical: String) -> Self {
        match canonical.as_str() {
            "full_name" => Self::FullName,
            "phone" => Self::Phone,
            "email" => Self::Email,
            "address" => Self::Address,
            "date_of_birth" => Self::DateOfBirth,
            "profile_photo" => Self::ProfilePhoto,
            "bio" => Self::Bio,
            "certifications" => Self::Certifications,
            "references" => Self::References,
            "hourly_rate" => Self::HourlyRate,
            "availability" => Self::Availability,
            "documents" => Self::Documents,
            "background_check" => Self::BackgroundCheck,
            "emergency_contacts" => Self::EmergencyContacts,
            "age_care_ranges" => Self::AgeCareRanges,
            "child_medical_info" => Self::ChildMedicalInfo,
            "child_allergies" => Self::ChildAllergies,
            "child_behavior_notes" => Self::ChildBehaviorNotes,
            "financial_info" => Self::FinancialInfo,
            _ => Self::Unknown(canonical),
        }
    }

    /// Returns the canonical storage key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::FullName => "full_name",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Address => "address",
            Self::DateOfBirth => "date_of_birth",
            Self::ProfilePhoto => "profile_photo",
            Self::Bio => "bio",
            Self::Certifications => "certifications",
            Self::References => "references",
            Self::HourlyRate => "hourly_rate",
            Self::Availability => "availability",
            Self::Documents => "documents",
            Self::BackgroundCheck => "background_check",
            Self::EmergencyContacts => "emergency_contacts",
            Self::AgeCareRanges => "age_care_ranges",
            Self::ChildMedicalInfo => "child_medical_info",
            Self::ChildAllergies => "child_allergies",
            Self::ChildBehaviorNotes => "child_behavior_notes",
            Self::FinancialInfo => "financial_info",
            Self::Unknown(canonical) => canonical.as_str(),
        }
    }

    /// Returns the human-readable label for this field.
    #[must_use]
    pub fn display_label(&self) -> String {
        display_field_key(self.as_str())
    }

    /// Returns whether the field gets stricter UI treatment.
    ///
    /// Labeling only. Access is decided by grants alone.
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        matches!(
            self,
            Self::Documents
                | Self::BackgroundCheck
                | Self::EmergencyContacts
                | Self::AgeCareRanges
                | Self::ChildMedicalInfo
                | Self::ChildAllergies
                | Self::ChildBehaviorNotes
                | Self::FinancialInfo
        )
    }

    /// Returns whether the key belongs to the known vocabulary.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Returns all known field keys.
    #[must_use]
    pub fn vocabulary() -> &'static [Self] {
        KNOWN_FIELDS
    }
}

impl FromStr for FieldKey {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for FieldKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value.as_str())
    }
}

impl From<FieldKey> for String {
    fn from(value: FieldKey) -> Self {
        match value {
            FieldKey::Unknown(canonical) => canonical,
            known => known.as_str().to_owned(),
        }
    }
}

impl Display for FieldKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Insertion-ordered, duplicate-free collection of field keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<FieldKey>", into = "Vec<FieldKey>")]
pub struct FieldSet(Vec<FieldKey>);

impl FieldSet {
    /// Creates an empty field set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes raw identifiers into a field set, collapsing duplicates.
    pub fn parse<I, S>(raw_fields: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw_fields
            .into_iter()
            .map(|raw| FieldKey::parse(raw.as_ref()))
            .collect()
    }

    /// Adds a key, returning `false` when it was already present.
    pub fn insert(&mut self, key: FieldKey) -> bool {
        if self.0.contains(&key) {
            return false;
        }

        self.0.push(key);
        true
    }

    /// Returns whether the key is present.
    #[must_use]
    pub fn contains(&self, key: &FieldKey) -> bool {
        self.0.contains(key)
    }

    /// Returns whether every key of this set is present in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.0.iter().all(|key| other.contains(key))
    }

    /// Returns keys of this set that are absent from `other`, preserving order.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.0
            .iter()
            .filter(|key| !other.contains(key))
            .cloned()
            .collect()
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates keys in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldKey> {
        self.0.iter()
    }

    /// Returns the keys as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[FieldKey] {
        self.0.as_slice()
    }

    /// Returns canonical storage values in insertion order.
    #[must_use]
    pub fn to_storage_values(&self) -> Vec<String> {
        self.0.iter().map(|key| key.as_str().to_owned()).collect()
    }
}

impl FromIterator<FieldKey> for FieldSet {
    fn from_iter<T: IntoIterator<Item = FieldKey>>(iter: T) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl From<Vec<FieldKey>> for FieldSet {
    fn from(value: Vec<FieldKey>) -> Self {
        value.into_iter().collect()
    }
}

impl From<FieldSet> for Vec<FieldKey> {
    fn from(value: FieldSet) -> Self {
        value.0
    }
}

impl IntoIterator for FieldSet {
    type Item = FieldKey;
    type IntoIter = std::vec::IntoIter<FieldKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a FieldKey;
    type IntoIter = std::slice::Iter<'a, FieldKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
