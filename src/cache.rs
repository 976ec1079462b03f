//! Cache tier collaborators.
//!
//! Two independent caches sit between the local directory and the external
//! network provider: a fast in-process/disk cache keyed by the raw number,
//! and a pluggable cached-number-lookup service (which may itself be backed
//! by a remote store). Both are consulted only after the local directory
//! misses, and both are assumed internally thread-safe.

use crate::error::CacheError;
use crate::record::{IdentityRecord, SourceType};

/// The fast in-process/disk cache, keyed by the raw, unnormalized number.
pub trait LookupCache: Send + Sync {
    /// True when a record is cached for the number.
    fn has_cached_contact(&self, number: &str) -> Result<bool, CacheError>;

    /// The cached record for the number, if any.
    fn get_cached_contact(&self, number: &str) -> Result<Option<IdentityRecord>, CacheError>;
}

/// A record returned by the cached-number-lookup service.
#[derive(Debug, Clone)]
pub struct CachedRecord {
    /// The identity the service knows for the number. May carry the
    /// bad-data marker, which poisons the whole resolution attempt.
    pub record: IdentityRecord,
    /// Service-side object id, forwarded to `can_report_as_invalid`.
    pub object_id: Option<String>,
}

/// The pluggable cached-number-lookup service.
pub trait CachedNumberLookup: Send + Sync {
    /// Looks up the number in the service's cache.
    fn lookup_cached_contact_from_number(
        &self,
        number: &str,
    ) -> Result<Option<CachedRecord>, CacheError>;

    /// True when records with this source type describe a business.
    fn is_business(&self, source_type: SourceType) -> bool;

    /// True when the user may report caller ids from this source as
    /// invalid.
    fn can_report_as_invalid(&self, source_type: SourceType, object_id: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_cache_object_safe(_: &dyn LookupCache) {}
    fn _assert_cached_lookup_object_safe(_: &dyn CachedNumberLookup) {}

    #[test]
    fn test_cached_record_carries_bad_data_marker() {
        let cached = CachedRecord {
            record: IdentityRecord::bad_data("5550100"),
            object_id: Some("obj-1".to_string()),
        };
        assert!(cached.record.is_bad_data);
        assert_eq!(cached.object_id.as_deref(), Some("obj-1"));
    }
}
