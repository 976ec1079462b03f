//! Error types for callerid.
//!
//! All errors are strongly typed using thiserror. The taxonomy follows the
//! cascade's partial-failure semantics: a *miss* is not an error (it is
//! `Resolution::NotFound`), a *failure* aborts the current resolution
//! attempt, and *bad data* is a failure for promotion purposes even though
//! the poisoned record is retained internally.

use thiserror::Error;

/// Errors raised by the directory-store collaborator.
///
/// A directory error aborts the cascade: it means the query itself could not
/// be executed, which is distinct from "queried successfully, zero rows".
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The collaborator-level query failed (I/O, missing backing store).
    #[error("directory query failed: {message}")]
    Query {
        /// Backend-reported cause.
        message: String,
    },

    /// A column required by the strict projection was absent from the row.
    #[error("directory row is missing required column '{column}'")]
    MissingColumn {
        /// Name of the absent column.
        column: String,
    },

    /// A column held a value of an unexpected type.
    #[error("directory column '{column}' has unexpected type")]
    ColumnType {
        /// Name of the offending column.
        column: String,
    },
}

/// Errors raised by the cache tier or the cached-number-lookup service.
///
/// Cache errors are soft: the cascade logs them and moves to the next tier.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend could not be read.
    #[error("cache read failed: {message}")]
    Read {
        /// Backend-reported cause.
        message: String,
    },
}

/// Errors raised by the external lookup provider transport.
///
/// Transport errors are soft: the cascade logs them and keeps whatever
/// record the earlier tiers produced. A provider-level FAIL status is not a
/// `ProviderError` — it arrives in-band as [`crate::ProviderStatus::Fail`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The blocking fetch could not reach the provider.
    #[error("provider fetch failed: {message}")]
    Fetch {
        /// Transport-reported cause.
        message: String,
    },
}

/// Errors raised by the call-log persistence collaborator.
///
/// Reconciliation is best-effort; these are logged and swallowed by
/// [`crate::Reconciler`], never propagated to resolution callers.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The conditional update could not be applied (e.g. storage full).
    #[error("call log update failed: {message}")]
    Write {
        /// Backend-reported cause.
        message: String,
    },
}

/// Errors raised while assembling a resolver.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required collaborator was not supplied to the builder.
    #[error("missing required collaborator '{name}'")]
    MissingCollaborator {
        /// Builder field that was left unset.
        name: &'static str,
    },
}

/// Top-level error for a resolution attempt.
///
/// Any `ResolveError` means FAILED: the caller should retry later and must
/// not persist anything for this attempt.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The identifier was empty; rejected before any collaborator call.
    #[error("empty identifier")]
    EmptyIdentifier,

    /// The local directory collaborator failed at the I/O level.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// A source affirmatively flagged the record untrustworthy.
    #[error("source returned bad data for this number")]
    BadData,

    /// The caller-supplied cancellation token fired before the blocking
    /// provider fetch.
    #[error("resolution cancelled")]
    Cancelled,
}

impl ResolveError {
    /// Returns true if retrying the same resolution later could succeed.
    ///
    /// Empty identifiers never resolve; everything else is transient from
    /// the caller's point of view.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::EmptyIdentifier)
    }

    /// Returns true if this failure came from a bad-data gate.
    #[must_use]
    pub const fn is_bad_data(&self) -> bool {
        matches!(self, Self::BadData)
    }
}

/// Result type alias for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_display() {
        let err = DirectoryError::Query {
            message: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));

        let err = DirectoryError::MissingColumn {
            column: "photo_id".to_string(),
        };
        assert!(err.to_string().contains("photo_id"));
    }

    #[test]
    fn test_resolve_error_from_directory() {
        let dir_err = DirectoryError::Query {
            message: "io".to_string(),
        };
        let err: ResolveError = dir_err.into();
        assert!(matches!(err, ResolveError::Directory(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_empty_identifier_not_retryable() {
        assert!(!ResolveError::EmptyIdentifier.is_retryable());
    }

    #[test]
    fn test_bad_data_classification() {
        let err = ResolveError::BadData;
        assert!(err.is_bad_data());
        assert!(err.is_retryable());
        assert!(!ResolveError::Cancelled.is_bad_data());
    }
}
