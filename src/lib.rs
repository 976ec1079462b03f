//! # callerid - Tiered caller identity resolution
//!
//! callerid answers "who is this" for a call-history entry. It resolves an
//! opaque identifier (a phone number or SIP-style address) into a richer
//! [`IdentityRecord`] by querying ranked sources — local directory,
//! persistent cache, external network provider — cheapest and most
//! authoritative first, and reconciles the result against the persisted
//! call-log copy with a minimal field-level diff.
//!
//! ## Core Concepts
//!
//! - **IdentityRecord**: the resolved (or synthesized) identity for one
//!   number or address
//! - **Resolution**: found / not-found as a sum type; failure is an `Err`
//! - **Cascade**: ordered lookup tiers with short-circuit-on-success
//!   semantics, run by [`Resolver`]
//! - **Patch**: the minimal diff the [`Reconciler`] writes back to the
//!   call log
//!
//! ## Usage
//!
//! ```rust,ignore
//! use callerid::{Cancellation, ResolverBuilder};
//!
//! let resolver = ResolverBuilder::new()
//!     .directory(directory_store)
//!     .cache(lookup_cache)
//!     .provider(lookup_provider)
//!     .default_country("US")
//!     .build()?;
//!
//! let record = resolver.lookup("+1-555-0100", Some("US"), false, &Cancellation::new())?;
//! reconciler.update_call_log("+1-555-0100", Some("US"), &record, previous.as_ref());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod directory;
pub mod error;
pub mod lookup_ref;
pub mod number;
pub mod provider;
pub mod reconcile;
pub mod record;
pub mod resolver;
pub mod telemetry;

// Re-export primary types at crate root for convenience
pub use cache::{CachedNumberLookup, CachedRecord, LookupCache};
pub use directory::{ColumnValue, DirectoryClient, DirectoryQuery, DirectoryStore, Row};
pub use error::{
    CacheError, ConfigError, DirectoryError, PersistenceError, ProviderError, ResolveError,
    ResolveResult,
};
pub use lookup_ref::{
    null_for_non_directory, provider_ref, synthesize_placeholder, LookupRef, ProviderAttribution,
};
pub use provider::{LookupProvider, LookupRequest, LookupResponse, ProviderStatus, RequestOrigin};
pub use reconcile::{
    diff, record_from_call_log_row, CallLogStore, Patch, PatchField, PatchValue, Reconciler,
    RowSelector,
};
pub use record::{IdentityRecord, NumberType, SourceType};
pub use resolver::{is_plugin_scoped_id, Cancellation, Resolution, Resolver, ResolverBuilder};
pub use telemetry::{NoopTelemetry, Telemetry};
