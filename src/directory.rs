//! Local directory client.
//!
//! The directory store is an external collaborator: a content-addressable
//! contacts store queried by URI. This module builds the query URIs (lookup
//! key, SIP flag, plugin-scoped parameter), defines the row model the
//! collaborator returns, and maps the first row of a successful query into
//! an [`IdentityRecord`].
//!
//! How the store indexes or matches numbers internally is its own business;
//! the client only relies on "zero or more rows per query, first row wins".

use std::sync::Arc;

use url::Url;

use crate::error::DirectoryError;
use crate::lookup_ref::{LookupRef, DIRECTORY_SCHEME};
use crate::number::is_global_phone_number;
use crate::record::{IdentityRecord, NumberType};

/// Column names understood by the directory client.
pub mod columns {
    /// Directory row id of the matched contact.
    pub const CONTACT_ID: &str = "contact_id";
    /// Phone type code.
    pub const PHONE_TYPE: &str = "phone_type";
    /// Custom type label.
    pub const TYPE_LABEL: &str = "type_label";
    /// The number the store matched on.
    pub const MATCHED_NUMBER: &str = "matched_number";
    /// E.164 form stored alongside the match.
    pub const NORMALIZED_NUMBER: &str = "normalized_number";
    /// Stable lookup key (strict path).
    pub const LOOKUP_KEY: &str = "lookup_key";
    /// Display name (strict and loose paths).
    pub const DISPLAY_NAME: &str = "display_name";
    /// Photo row id (strict and loose paths).
    pub const PHOTO_ID: &str = "photo_id";
    /// Photo URI (strict and loose paths).
    pub const PHOTO_URI: &str = "photo_uri";
    /// Stable lookup key (loose path).
    pub const LOOSE_LOOKUP: &str = "lookup";
}

/// The projection requested for every phone/SIP lookup.
pub const PHONE_PROJECTION: &[&str] = &[
    columns::CONTACT_ID,
    columns::PHONE_TYPE,
    columns::TYPE_LABEL,
    columns::MATCHED_NUMBER,
    columns::NORMALIZED_NUMBER,
    columns::LOOKUP_KEY,
    columns::DISPLAY_NAME,
    columns::PHOTO_ID,
    columns::PHOTO_URI,
];

/// A single column value in a directory row.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// Integer column.
    Integer(i64),
    /// Text column.
    Text(String),
    /// SQL-style null.
    Null,
}

/// One row returned by the directory store.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: Vec<(String, ColumnValue)>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text column.
    #[must_use]
    pub fn with_text(mut self, column: &str, value: impl Into<String>) -> Self {
        self.columns
            .push((column.to_string(), ColumnValue::Text(value.into())));
        self
    }

    /// Adds an integer column.
    #[must_use]
    pub fn with_integer(mut self, column: &str, value: i64) -> Self {
        self.columns
            .push((column.to_string(), ColumnValue::Integer(value)));
        self
    }

    /// Adds a null column.
    #[must_use]
    pub fn with_null(mut self, column: &str) -> Self {
        self.columns.push((column.to_string(), ColumnValue::Null));
        self
    }

    /// Raw lookup by column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Text value of a projected column. Missing columns are a hard error;
    /// nulls are `None`.
    pub(crate) fn text(&self, column: &str) -> Result<Option<String>, DirectoryError> {
        match self.get(column) {
            Some(ColumnValue::Text(s)) => Ok(Some(s.clone())),
            Some(ColumnValue::Null) => Ok(None),
            Some(ColumnValue::Integer(_)) => Err(DirectoryError::ColumnType {
                column: column.to_string(),
            }),
            None => Err(DirectoryError::MissingColumn {
                column: column.to_string(),
            }),
        }
    }

    /// Integer value of a projected column.
    pub(crate) fn integer(&self, column: &str) -> Result<Option<i64>, DirectoryError> {
        match self.get(column) {
            Some(ColumnValue::Integer(n)) => Ok(Some(*n)),
            Some(ColumnValue::Null) => Ok(None),
            Some(ColumnValue::Text(_)) => Err(DirectoryError::ColumnType {
                column: column.to_string(),
            }),
            None => Err(DirectoryError::MissingColumn {
                column: column.to_string(),
            }),
        }
    }

    /// Loose text read: a missing column is logged and treated as absent.
    pub(crate) fn loose_text(&self, column: &str) -> Option<String> {
        match self.text(column) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(column, %err, "loose directory column unavailable");
                None
            }
        }
    }

    /// Loose integer read, same tolerance as [`Self::loose_text`].
    pub(crate) fn loose_integer(&self, column: &str) -> Option<i64> {
        match self.integer(column) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(column, %err, "loose directory column unavailable");
                None
            }
        }
    }
}

/// A fully built directory query: URI plus requested projection.
#[derive(Debug, Clone)]
pub struct DirectoryQuery {
    /// Query URI encoding the lookup key and flags.
    pub uri: Url,
    /// Columns the client expects back.
    pub projection: &'static [&'static str],
}

impl DirectoryQuery {
    /// Builds a phone-number lookup query.
    ///
    /// The key lands percent-encoded in the path; the plugin-scoped flag is
    /// threaded through as a boolean query parameter.
    #[must_use]
    pub fn phone(key: &str, plugin_scoped: bool) -> Option<Self> {
        let mut uri = Url::parse(&format!("{DIRECTORY_SCHEME}://phone-lookup")).ok()?;
        uri.path_segments_mut().ok()?.push(key);
        uri.query_pairs_mut()
            .append_pair("plugin_id", if plugin_scoped { "true" } else { "false" });
        Some(Self {
            uri,
            projection: PHONE_PROJECTION,
        })
    }

    /// Builds a SIP-address lookup query (SIP flag set, no plugin flag).
    #[must_use]
    pub fn sip(address: &str) -> Option<Self> {
        let mut uri = Url::parse(&format!("{DIRECTORY_SCHEME}://phone-lookup")).ok()?;
        uri.path_segments_mut().ok()?.push(address);
        uri.query_pairs_mut().append_pair("sip", "1");
        Some(Self {
            uri,
            projection: PHONE_PROJECTION,
        })
    }

    /// The lookup key carried in the query path, percent-decoded.
    #[must_use]
    pub fn key(&self) -> String {
        self.uri
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(|segment| percent_decode(segment))
            .unwrap_or_default()
    }
}

/// Percent-decoding for path segments produced by `Url`.
fn percent_decode(segment: &str) -> String {
    let mut out = Vec::with_capacity(segment.len());
    let bytes = segment.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1), bytes.get(i + 2)) {
            (b'%', Some(&hi), Some(&lo)) => {
                if let (Some(hi), Some(lo)) = (hex_val(hi), hex_val(lo)) {
                    out.push(hi * 16 + lo);
                    i += 3;
                    continue;
                }
                out.push(bytes[i]);
                i += 1;
            }
            _ => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// The directory store collaborator.
///
/// Implementations are expected to be internally thread-safe; the client
/// performs no locking around them.
pub trait DirectoryStore: Send + Sync {
    /// Executes the query, returning zero or more rows.
    ///
    /// An `Err` means the query itself could not run (I/O), which is
    /// distinct from an empty result set.
    fn query(&self, query: &DirectoryQuery) -> Result<Vec<Row>, DirectoryError>;
}

/// Maps directory rows into identity records.
#[derive(Clone)]
pub struct DirectoryClient {
    store: Arc<dyn DirectoryStore>,
}

impl DirectoryClient {
    /// Creates a client over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Looks up a phone-number key. `Ok(None)` is a miss (zero rows).
    pub fn query_by_phone_key(
        &self,
        key: &str,
        plugin_scoped: bool,
    ) -> Result<Option<IdentityRecord>, DirectoryError> {
        let Some(query) = DirectoryQuery::phone(key, plugin_scoped) else {
            return Err(DirectoryError::Query {
                message: format!("unencodable lookup key '{key}'"),
            });
        };
        let rows = self.store.query(&query)?;
        match rows.first() {
            Some(row) => Ok(Some(map_row(row, key)?)),
            None => Ok(None),
        }
    }

    /// Looks up a SIP address. `Ok(None)` is a miss.
    pub fn query_by_sip_address(
        &self,
        address: &str,
    ) -> Result<Option<IdentityRecord>, DirectoryError> {
        let Some(query) = DirectoryQuery::sip(address) else {
            return Err(DirectoryError::Query {
                message: format!("unencodable SIP address '{address}'"),
            });
        };
        let rows = self.store.query(&query)?;
        match rows.first() {
            Some(row) => Ok(Some(map_row(row, address)?)),
            None => Ok(None),
        }
    }
}

/// Maps the first row of a successful query into an identity record.
///
/// When the queried key is itself a valid global phone number the strict
/// projection columns are used. Otherwise (plugin-scoped identifiers) the
/// name, lookup key, and photo fields come from the looser secondary column
/// names, and a missing column there leaves the field absent instead of
/// failing the lookup.
fn map_row(row: &Row, queried_key: &str) -> Result<IdentityRecord, DirectoryError> {
    let contact_id = row.integer(columns::CONTACT_ID)?.unwrap_or(0);

    let mut record = IdentityRecord::new(
        row.text(columns::MATCHED_NUMBER)?
            .unwrap_or_else(|| queried_key.to_string()),
    );
    record.number_type =
        NumberType::from_code(row.integer(columns::PHONE_TYPE)?.unwrap_or(-1));
    record.type_label = row.text(columns::TYPE_LABEL)?;
    record.normalized_number = row.text(columns::NORMALIZED_NUMBER)?;
    record.formatted_number = None;

    let lookup_key;
    if is_global_phone_number(queried_key) {
        lookup_key = row.text(columns::LOOKUP_KEY)?;
        record.display_name = row.text(columns::DISPLAY_NAME)?;
        record.photo_id = row.integer(columns::PHOTO_ID)?;
        record.photo_uri = row
            .text(columns::PHOTO_URI)?
            .and_then(|s| Url::parse(&s).ok());
    } else {
        lookup_key = row.loose_text(columns::LOOSE_LOOKUP);
        record.display_name = row.loose_text(columns::DISPLAY_NAME);
        record.photo_id = row.loose_integer(columns::PHOTO_ID);
        record.photo_uri = row
            .loose_text(columns::PHOTO_URI)
            .and_then(|s| Url::parse(&s).ok());
    }

    record.lookup_ref = lookup_key
        .as_deref()
        .and_then(|key| LookupRef::for_directory_entry(contact_id, key));
    record.lookup_key = lookup_key;
    Ok(record)
}
