//! The Identity Record data model.
//!
//! An [`IdentityRecord`] is the canonical in-memory representation of a
//! resolved identity for one number or SIP address. Records are built fresh
//! on every resolution attempt; the "not found" state is a distinct
//! [`crate::Resolution::NotFound`] variant, never a shared mutable instance.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::lookup_ref::LookupRef;

/// Classification of the phone number within a matched directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NumberType {
    /// Unclassified or unknown.
    #[default]
    Unknown,
    /// Home number.
    Home,
    /// Mobile number.
    Mobile,
    /// Work number.
    Work,
    /// Custom type; the label lives in `type_label`.
    Custom,
}

impl NumberType {
    /// Maps a directory `phone_type` column code to a `NumberType`.
    ///
    /// Unrecognized codes fold into `Unknown` rather than failing the row.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Home,
            2 => Self::Mobile,
            3 => Self::Work,
            0 => Self::Custom,
            _ => Self::Unknown,
        }
    }

    /// The directory column code for this type.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Unknown => -1,
            Self::Home => 1,
            Self::Mobile => 2,
            Self::Work => 3,
            Self::Custom => 0,
        }
    }
}

impl fmt::Display for NumberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Home => write!(f, "home"),
            Self::Mobile => write!(f, "mobile"),
            Self::Work => write!(f, "work"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// Which source produced a record.
///
/// Cached-service records carry the service's own source code so it can be
/// forwarded back to `is_business` / `can_report_as_invalid` unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceType {
    /// Local directory, or no source at all (synthesized placeholder).
    #[default]
    None,
    /// The external network lookup provider.
    ExternalProvider,
    /// The cached-number-lookup service; `code` is service-defined.
    Cached {
        /// Service-defined source code.
        code: i64,
    },
}

/// A resolved (or synthesized) identity for one number or address.
///
/// Invariants:
/// - `matched_number` is non-empty for any record handed to callers.
/// - `is_bad_data == true` is terminal for the attempt: the record must not
///   be promoted as an answer.
/// - A synthesized placeholder always carries `formatted_number`,
///   `normalized_number`, and a deterministic `lookup_ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IdentityRecord {
    /// Display name, when any source knew one.
    pub display_name: Option<String>,

    /// Classification of the matched number.
    pub number_type: NumberType,

    /// Custom type label, or the provider's "<city>, <country>" label.
    pub type_label: Option<String>,

    /// The number the winning source matched on. Never empty.
    pub matched_number: String,

    /// E.164-like normalized form, when normalization succeeded.
    pub normalized_number: Option<String>,

    /// Human-readable formatted form of the original identifier.
    pub formatted_number: Option<String>,

    /// Opaque reference for later detail lookup or contact creation.
    pub lookup_ref: Option<LookupRef>,

    /// Directory lookup key, for records that matched a real contact.
    pub lookup_key: Option<String>,

    /// Directory photo row id.
    pub photo_id: Option<i64>,

    /// Photo URI, meaningful only when it points into the directory store.
    pub photo_uri: Option<Url>,

    /// Remote photo URL supplied by the external provider.
    pub photo_url: Option<String>,

    /// Reference to the enriching provider's attribution logo.
    pub attribution_logo: Option<String>,

    /// Which source produced this record.
    pub source_type: SourceType,

    /// Name of the external provider that enriched this record.
    pub provider_name: Option<String>,

    /// Provider-supplied city.
    pub city: Option<String>,

    /// Provider-supplied ISO 3166-1 country code.
    pub country: Option<String>,

    /// Provider-supplied street address.
    pub address: Option<String>,

    /// Provider spam flag.
    pub is_spam: bool,

    /// Provider spam report count.
    pub spam_count: i64,

    /// Set when a source affirmatively flagged the record untrustworthy.
    pub is_bad_data: bool,

    /// Set on placeholders built for numbers no source matched.
    pub is_synthetic: bool,
}

impl IdentityRecord {
    /// Creates a blank record for the given matched number.
    #[must_use]
    pub fn new(matched_number: impl Into<String>) -> Self {
        Self {
            matched_number: matched_number.into(),
            ..Self::default()
        }
    }

    /// Creates a record that only carries the bad-data marker.
    ///
    /// Used when the provider reports FAIL for a number no earlier tier
    /// matched: the attempt must surface as bad data, not as a miss.
    #[must_use]
    pub fn bad_data(matched_number: impl Into<String>) -> Self {
        Self {
            is_bad_data: true,
            ..Self::new(matched_number)
        }
    }

    /// True when this record matched an entry in the user's own directory.
    #[must_use]
    pub fn is_local_contact(&self) -> bool {
        self.lookup_key.is_some() && !self.is_synthetic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_type_code_round_trip() {
        for t in [
            NumberType::Home,
            NumberType::Mobile,
            NumberType::Work,
            NumberType::Custom,
        ] {
            assert_eq!(NumberType::from_code(t.code()), t);
        }
        assert_eq!(NumberType::from_code(999), NumberType::Unknown);
    }

    #[test]
    fn test_new_record_defaults() {
        let record = IdentityRecord::new("+15550100");
        assert_eq!(record.matched_number, "+15550100");
        assert_eq!(record.source_type, SourceType::None);
        assert!(!record.is_bad_data);
        assert!(!record.is_synthetic);
        assert!(record.display_name.is_none());
    }

    #[test]
    fn test_bad_data_record() {
        let record = IdentityRecord::bad_data("5550100");
        assert!(record.is_bad_data);
        assert_eq!(record.matched_number, "5550100");
    }

    #[test]
    fn test_local_contact_requires_lookup_key() {
        let mut record = IdentityRecord::new("5550100");
        assert!(!record.is_local_contact());
        record.lookup_key = Some("k1".to_string());
        assert!(record.is_local_contact());
        record.is_synthetic = true;
        assert!(!record.is_local_contact());
    }
}
