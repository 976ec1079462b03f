//! Diff-based reconciliation against the persisted call log.
//!
//! Every call-history row carries a cached copy of the identity it was last
//! annotated with. After a fresh resolution, [`diff`] compares the new
//! record against that copy and produces a minimal field-level [`Patch`];
//! an empty patch means no write is needed. Patch application is
//! best-effort: write failures are logged and swallowed, never surfaced to
//! the resolution caller.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::directory::Row;
use crate::error::PersistenceError;
use crate::lookup_ref::{null_for_non_directory, LookupRef};
use crate::record::{IdentityRecord, NumberType};

/// Column names of the call-log row's cached identity copy.
pub mod call_log_columns {
    /// The raw number the call was placed to / received from.
    pub const NUMBER: &str = "number";
    /// ISO country code recorded with the call.
    pub const COUNTRY_ISO: &str = "country_iso";
    /// Cached display name.
    pub const CACHED_NAME: &str = "cached_name";
    /// Cached number type code.
    pub const CACHED_NUMBER_TYPE: &str = "cached_number_type";
    /// Cached type label.
    pub const CACHED_NUMBER_LABEL: &str = "cached_number_label";
    /// Cached lookup reference, as a string.
    pub const CACHED_LOOKUP_URI: &str = "cached_lookup_uri";
    /// Cached matched number.
    pub const CACHED_MATCHED_NUMBER: &str = "cached_matched_number";
    /// Cached normalized number.
    pub const CACHED_NORMALIZED_NUMBER: &str = "cached_normalized_number";
    /// Cached photo row id.
    pub const CACHED_PHOTO_ID: &str = "cached_photo_id";
    /// Cached photo URI.
    pub const CACHED_PHOTO_URI: &str = "cached_photo_uri";
    /// Cached formatted number.
    pub const CACHED_FORMATTED_NUMBER: &str = "cached_formatted_number";
}

/// The persisted fields reconciliation may rewrite.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PatchField {
    /// Cached display name.
    Name,
    /// Cached number type code.
    NumberType,
    /// Cached type label.
    TypeLabel,
    /// Cached lookup reference.
    LookupRef,
    /// Cached matched number.
    MatchedNumber,
    /// Cached normalized number.
    NormalizedNumber,
    /// Cached photo row id.
    PhotoId,
    /// Cached photo URI.
    PhotoUri,
    /// Cached formatted number.
    FormattedNumber,
}

impl PatchField {
    /// The call-log column this field writes to.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Name => call_log_columns::CACHED_NAME,
            Self::NumberType => call_log_columns::CACHED_NUMBER_TYPE,
            Self::TypeLabel => call_log_columns::CACHED_NUMBER_LABEL,
            Self::LookupRef => call_log_columns::CACHED_LOOKUP_URI,
            Self::MatchedNumber => call_log_columns::CACHED_MATCHED_NUMBER,
            Self::NormalizedNumber => call_log_columns::CACHED_NORMALIZED_NUMBER,
            Self::PhotoId => call_log_columns::CACHED_PHOTO_ID,
            Self::PhotoUri => call_log_columns::CACHED_PHOTO_URI,
            Self::FormattedNumber => call_log_columns::CACHED_FORMATTED_NUMBER,
        }
    }
}

impl fmt::Display for PatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A new value for a persisted field. `None` clears the column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchValue {
    /// Text column value.
    Text(Option<String>),
    /// Integer column value.
    Integer(Option<i64>),
}

/// A minimal field-level patch. Empty means "no write needed".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    fields: BTreeMap<PatchField, PatchValue>,
}

impl Patch {
    /// True when nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields to rewrite.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// The pending value for a field, if the patch touches it.
    #[must_use]
    pub fn get(&self, field: PatchField) -> Option<&PatchValue> {
        self.fields.get(&field)
    }

    /// Iterates fields in stable (column) order.
    pub fn iter(&self) -> btree_map::Iter<'_, PatchField, PatchValue> {
        self.fields.iter()
    }

    fn set_text(&mut self, field: PatchField, value: Option<&str>) {
        self.fields
            .insert(field, PatchValue::Text(value.map(str::to_string)));
    }

    fn set_integer(&mut self, field: PatchField, value: Option<i64>) {
        self.fields.insert(field, PatchValue::Integer(value));
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = (&'a PatchField, &'a PatchValue);
    type IntoIter = btree_map::Iter<'a, PatchField, PatchValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Computes the minimal patch that brings the persisted copy up to date.
///
/// With no previously persisted record (first annotation of the row), every
/// field is written unconditionally. Otherwise a field is included iff its
/// value differs, with two special cases:
/// - `normalized_number` is only overwritten by a non-empty value; a known
///   normalized number is never erased by an empty one.
/// - `photo_uri` is coerced to null unless it points into the real
///   directory store, and the coerced value is what gets compared.
#[must_use]
pub fn diff(updated: &IdentityRecord, previous: Option<&IdentityRecord>) -> Patch {
    let mut patch = Patch::default();
    let photo_uri = null_for_non_directory(updated.photo_uri.clone());
    let photo_uri_text = photo_uri.as_ref().map(Url::as_str);
    let lookup_ref_text = updated.lookup_ref.as_ref().map(LookupRef::as_str);

    let Some(previous) = previous else {
        patch.set_text(PatchField::Name, updated.display_name.as_deref());
        patch.set_integer(PatchField::NumberType, Some(updated.number_type.code()));
        patch.set_text(PatchField::TypeLabel, updated.type_label.as_deref());
        patch.set_text(PatchField::LookupRef, lookup_ref_text);
        patch.set_text(PatchField::MatchedNumber, Some(&updated.matched_number));
        patch.set_text(
            PatchField::NormalizedNumber,
            updated.normalized_number.as_deref(),
        );
        patch.set_integer(PatchField::PhotoId, updated.photo_id);
        patch.set_text(PatchField::PhotoUri, photo_uri_text);
        patch.set_text(
            PatchField::FormattedNumber,
            updated.formatted_number.as_deref(),
        );
        return patch;
    };

    if updated.display_name != previous.display_name {
        patch.set_text(PatchField::Name, updated.display_name.as_deref());
    }
    if updated.number_type != previous.number_type {
        patch.set_integer(PatchField::NumberType, Some(updated.number_type.code()));
    }
    if updated.type_label != previous.type_label {
        patch.set_text(PatchField::TypeLabel, updated.type_label.as_deref());
    }
    if updated.lookup_ref != previous.lookup_ref {
        patch.set_text(PatchField::LookupRef, lookup_ref_text);
    }
    // Never erase a previously known normalized number with an empty one.
    if updated
        .normalized_number
        .as_deref()
        .is_some_and(|n| !n.is_empty())
        && updated.normalized_number != previous.normalized_number
    {
        patch.set_text(
            PatchField::NormalizedNumber,
            updated.normalized_number.as_deref(),
        );
    }
    if updated.matched_number != previous.matched_number {
        patch.set_text(PatchField::MatchedNumber, Some(&updated.matched_number));
    }
    if updated.photo_id != previous.photo_id {
        patch.set_integer(PatchField::PhotoId, updated.photo_id);
    }
    if photo_uri != previous.photo_uri {
        patch.set_text(PatchField::PhotoUri, photo_uri_text);
    }
    if updated.formatted_number != previous.formatted_number {
        patch.set_text(
            PatchField::FormattedNumber,
            updated.formatted_number.as_deref(),
        );
    }
    patch
}

/// Selects which call-log rows a patch targets: number equality plus
/// country equality-or-null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSelector {
    /// The raw number column value to match.
    pub number: String,
    /// Match rows with this country, or rows whose country is null when
    /// `None`.
    pub country: Option<String>,
}

impl RowSelector {
    /// Creates a selector.
    #[must_use]
    pub fn new(number: impl Into<String>, country: Option<&str>) -> Self {
        Self {
            number: number.into(),
            country: country.map(str::to_string),
        }
    }
}

/// The call-log persistence collaborator.
pub trait CallLogStore: Send + Sync {
    /// Applies the patch to every row the selector matches, returning the
    /// affected-row count.
    fn update(&self, selector: &RowSelector, patch: &Patch) -> Result<u64, PersistenceError>;
}

/// Applies reconciliation patches, best-effort.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn CallLogStore>,
}

impl Reconciler {
    /// Creates a reconciler over the given call-log store.
    #[must_use]
    pub fn new(store: Arc<dyn CallLogStore>) -> Self {
        Self { store }
    }

    /// Diffs and, when anything changed, patches the persisted copy.
    ///
    /// Write failures (storage exhaustion and the like) are logged and
    /// swallowed; reconciliation never invalidates the resolved record.
    pub fn update_call_log(
        &self,
        number: &str,
        country: Option<&str>,
        updated: &IdentityRecord,
        previous: Option<&IdentityRecord>,
    ) {
        let patch = diff(updated, previous);
        if patch.is_empty() {
            return;
        }
        let selector = RowSelector::new(number, country);
        match self.store.update(&selector, &patch) {
            Ok(affected) => {
                tracing::debug!(number, affected, fields = patch.len(), "call log updated");
            }
            Err(err) => {
                tracing::error!(number, %err, "unable to update contact info in call log");
            }
        }
    }
}

/// Reads the cached identity copy out of a call-log row.
///
/// Columns are read loosely: an unavailable column is logged and leaves the
/// field absent. The matched number falls back to the raw number column,
/// and the photo URI is coerced to directory-store references on the way
/// in, same as on the way out.
#[must_use]
pub fn record_from_call_log_row(row: &Row) -> IdentityRecord {
    let matched = row
        .loose_text(call_log_columns::CACHED_MATCHED_NUMBER)
        .or_else(|| row.loose_text(call_log_columns::NUMBER))
        .unwrap_or_default();

    let mut record = IdentityRecord::new(matched);
    record.display_name = row.loose_text(call_log_columns::CACHED_NAME);
    record.number_type = NumberType::from_code(
        row.loose_integer(call_log_columns::CACHED_NUMBER_TYPE)
            .unwrap_or(-1),
    );
    record.type_label = row.loose_text(call_log_columns::CACHED_NUMBER_LABEL);
    record.lookup_ref = row
        .loose_text(call_log_columns::CACHED_LOOKUP_URI)
        .as_deref()
        .and_then(LookupRef::parse);
    record.normalized_number = row.loose_text(call_log_columns::CACHED_NORMALIZED_NUMBER);
    record.photo_id = row.loose_integer(call_log_columns::CACHED_PHOTO_ID);
    record.photo_uri = null_for_non_directory(
        row.loose_text(call_log_columns::CACHED_PHOTO_URI)
            .and_then(|s| Url::parse(&s).ok()),
    );
    record.formatted_number = row.loose_text(call_log_columns::CACHED_FORMATTED_NUMBER);
    record
}
