//! The resolution cascade.
//!
//! Resolves an opaque identifier (phone number or SIP-style address) into an
//! [`IdentityRecord`] by walking ranked sources in order: local directory,
//! raw-number cache, cached-number-lookup service, external network
//! provider. The local directory is cheapest and most authoritative, so a
//! local match short-circuits external lookups entirely; the network
//! provider is queried last and only for numbers not already known locally,
//! which bounds network calls to genuinely unknown numbers and keeps
//! third-party enrichment from shadowing the user's own contact data.
//!
//! All lookups are synchronous. Callers invoke resolution on a background
//! worker and wrap the whole cascade in their own deadline; the
//! [`Cancellation`] token is the hook for that.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::{CachedNumberLookup, LookupCache};
use crate::directory::{DirectoryClient, DirectoryStore};
use crate::error::{ConfigError, ResolveError, ResolveResult};
use crate::lookup_ref::{provider_ref, synthesize_placeholder, ProviderAttribution};
use crate::number::{
    country_display_name, format_number, is_global_phone_number, is_sip_address,
    normalize_to_e164, sip_username,
};
use crate::provider::{LookupProvider, LookupRequest, LookupResponse, ProviderStatus, RequestOrigin};
use crate::record::{IdentityRecord, SourceType};
use crate::telemetry::{NoopTelemetry, Telemetry};

/// Outcome of a cascade run that did not fail.
///
/// "Not found" is a first-class variant, never a shared sentinel record:
/// exactly one of found / not-found / failed (`Err`) holds for any attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A source matched the identifier.
    Found(IdentityRecord),
    /// Every source was consulted and none matched.
    NotFound,
}

impl Resolution {
    /// Unwraps the record, if any.
    #[must_use]
    pub fn found(self) -> Option<IdentityRecord> {
        match self {
            Self::Found(record) => Some(record),
            Self::NotFound => None,
        }
    }

    /// True for the not-found marker.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Caller-supplied cancellation token.
///
/// Cheap to clone and share across threads. The cascade checks it once
/// immediately before the blocking provider fetch; provider implementations
/// also receive it so they can abandon an in-flight call.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// True once [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Classifies a call-history identifier as plugin-scoped.
///
/// An identifier is plugin-scoped when it arrived without an account
/// handle, does not normalize as a dialable number for the given country,
/// and a plugin name is attached to the row.
#[must_use]
pub fn is_plugin_scoped_id(
    has_account_handle: bool,
    number: &str,
    country: &str,
    plugin_name: Option<&str>,
) -> bool {
    !has_account_handle
        && normalize_to_e164(number, country).is_none()
        && plugin_name.is_some_and(|name| !name.is_empty())
}

/// The cascade orchestrator.
///
/// Collaborators are constructor-injected behind narrow traits; concurrent
/// resolutions for different identifiers are independent and need no
/// coordination. Same-identifier deduplication (single-flight) is the
/// caller's concern.
#[derive(Clone)]
pub struct Resolver {
    directory: DirectoryClient,
    cache: Arc<dyn LookupCache>,
    cached_lookup: Option<Arc<dyn CachedNumberLookup>>,
    provider: Arc<dyn LookupProvider>,
    telemetry: Arc<dyn Telemetry>,
    default_country: String,
}

/// Builder for [`Resolver`].
///
/// # Example
/// ```rust,ignore
/// let resolver = ResolverBuilder::new()
///     .directory(directory_store)
///     .cache(lookup_cache)
///     .provider(provider)
///     .default_country("US")
///     .build()?;
/// ```
#[derive(Default)]
pub struct ResolverBuilder {
    directory: Option<Arc<dyn DirectoryStore>>,
    cache: Option<Arc<dyn LookupCache>>,
    cached_lookup: Option<Arc<dyn CachedNumberLookup>>,
    provider: Option<Arc<dyn LookupProvider>>,
    telemetry: Option<Arc<dyn Telemetry>>,
    default_country: Option<String>,
}

impl ResolverBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory store collaborator (required).
    #[must_use]
    pub fn directory(mut self, store: Arc<dyn DirectoryStore>) -> Self {
        self.directory = Some(store);
        self
    }

    /// Sets the raw-number cache collaborator (required).
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn LookupCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the cached-number-lookup service (optional).
    #[must_use]
    pub fn cached_lookup(mut self, service: Arc<dyn CachedNumberLookup>) -> Self {
        self.cached_lookup = Some(service);
        self
    }

    /// Sets the external lookup provider (required; may be disabled).
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LookupProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the telemetry sink (default: no-op).
    #[must_use]
    pub fn telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Sets the instance-default country hint (default: `"US"`).
    #[must_use]
    pub fn default_country(mut self, country: impl Into<String>) -> Self {
        self.default_country = Some(country.into());
        self
    }

    /// Builds the resolver.
    pub fn build(self) -> Result<Resolver, ConfigError> {
        let directory = self
            .directory
            .ok_or(ConfigError::MissingCollaborator { name: "directory" })?;
        let cache = self
            .cache
            .ok_or(ConfigError::MissingCollaborator { name: "cache" })?;
        let provider = self
            .provider
            .ok_or(ConfigError::MissingCollaborator { name: "provider" })?;
        Ok(Resolver {
            directory: DirectoryClient::new(directory),
            cache,
            cached_lookup: self.cached_lookup,
            provider,
            telemetry: self
                .telemetry
                .unwrap_or_else(|| Arc::new(NoopTelemetry)),
            default_country: self.default_country.unwrap_or_else(|| "US".to_string()),
        })
    }
}

impl Resolver {
    /// Resolves an identifier and always hands back a usable record.
    ///
    /// When the cascade finds nothing, a synthesized placeholder stands in
    /// for the unmatched number so consumers never see "not found". An
    /// `Err` means the attempt FAILED: retry later, persist nothing.
    pub fn lookup(
        &self,
        identifier: &str,
        country_hint: Option<&str>,
        plugin_scoped: bool,
        cancel: &Cancellation,
    ) -> ResolveResult<IdentityRecord> {
        match self.resolve(identifier, country_hint, plugin_scoped, cancel)? {
            Resolution::Found(record) => Ok(record),
            Resolution::NotFound => {
                let country = country_hint.unwrap_or(&self.default_country);
                Ok(self.synthesize(identifier, country))
            }
        }
    }

    /// Runs the ranked cascade without placeholder synthesis.
    ///
    /// Returns the not-found marker when every source misses; `Err` on
    /// failure or bad data.
    pub fn resolve(
        &self,
        identifier: &str,
        country_hint: Option<&str>,
        plugin_scoped: bool,
        cancel: &Cancellation,
    ) -> ResolveResult<Resolution> {
        if identifier.is_empty() {
            return Err(ResolveError::EmptyIdentifier);
        }
        let country = country_hint.unwrap_or(&self.default_country);

        if is_sip_address(identifier) {
            let sip = self.resolve_sip(identifier);
            if let Ok(Resolution::Found(record)) = sip {
                return Ok(Resolution::Found(record));
            }
            // The "username" part of the address may actually be the phone
            // number of a contact.
            if let Some(user) = sip_username(identifier) {
                if is_global_phone_number(&user) {
                    return match self.resolve_phone(&user, country, false, cancel)? {
                        Resolution::Found(record) if record.is_bad_data => {
                            Err(ResolveError::BadData)
                        }
                        resolution => Ok(resolution),
                    };
                }
            }
            return sip;
        }

        match self.resolve_phone(identifier, country, plugin_scoped, cancel)? {
            Resolution::Found(record) if record.is_bad_data => Err(ResolveError::BadData),
            Resolution::NotFound => {
                // The number may have been saved as an "internet call"
                // entry; retry it through the SIP directory path.
                self.resolve_sip(identifier)
            }
            found => Ok(found),
        }
    }

    /// Resolves a SIP-style address against the local directory only.
    ///
    /// No cache tier, no external provider: non-phone identifiers stop at
    /// the directory.
    pub fn resolve_sip(&self, address: &str) -> ResolveResult<Resolution> {
        if address.is_empty() {
            return Err(ResolveError::EmptyIdentifier);
        }
        match self.directory.query_by_sip_address(address)? {
            Some(record) => Ok(Resolution::Found(record)),
            None => Ok(Resolution::NotFound),
        }
    }

    /// Forwards a business-source check to the cached-number-lookup
    /// service.
    #[must_use]
    pub fn is_business(&self, source_type: SourceType) -> bool {
        self.cached_lookup
            .as_ref()
            .is_some_and(|service| service.is_business(source_type))
    }

    /// Forwards a report-as-invalid capability check to the
    /// cached-number-lookup service.
    #[must_use]
    pub fn can_report_as_invalid(&self, source_type: SourceType, object_id: &str) -> bool {
        self.cached_lookup
            .as_ref()
            .is_some_and(|service| service.can_report_as_invalid(source_type, object_id))
    }

    /// The phone-number sub-path: directory, cache tier, then provider, in
    /// that order.
    fn resolve_phone(
        &self,
        number: &str,
        country: &str,
        plugin_scoped: bool,
        cancel: &Cancellation,
    ) -> ResolveResult<Resolution> {
        // Normalize for the directory query; the raw number is kept for
        // cache keys and display formatting.
        let normalized = normalize_to_e164(number, country);
        let key = normalized.as_deref().unwrap_or(number);

        let mut current = self.directory.query_by_phone_key(key, plugin_scoped)?;
        let is_local_contact = current.is_some();

        if let Some(record) = current.as_mut() {
            // Authoritative local match: stamp the display form of the
            // number as the caller wrote it.
            record.formatted_number = Some(format_number(number, None, country));
        } else {
            current = self.cache_step(number);
            if current.is_none() {
                current = self.cached_service_step(number)?;
            }
        }

        if !is_local_contact && self.provider.is_enabled() {
            current = self.provider_step(number, country, current, cancel)?;
        }

        match current {
            Some(record) => Ok(Resolution::Found(record)),
            None => Ok(Resolution::NotFound),
        }
    }

    /// Raw-number cache probe. Cache failures are soft: logged, then
    /// treated as a miss.
    fn cache_step(&self, number: &str) -> Option<IdentityRecord> {
        match self.cache.has_cached_contact(number) {
            Ok(true) => match self.cache.get_cached_contact(number) {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(%err, "lookup cache read failed");
                    None
                }
            },
            Ok(false) => None,
            Err(err) => {
                tracing::warn!(%err, "lookup cache probe failed");
                None
            }
        }
    }

    /// Cached-number-lookup service probe.
    ///
    /// A record the service itself flags as bad data poisons the whole
    /// attempt; it must not be silently downgraded to a miss.
    fn cached_service_step(&self, number: &str) -> ResolveResult<Option<IdentityRecord>> {
        let Some(service) = self.cached_lookup.as_ref() else {
            return Ok(None);
        };
        match service.lookup_cached_contact_from_number(number) {
            Ok(Some(cached)) => {
                if cached.record.is_bad_data {
                    Err(ResolveError::BadData)
                } else {
                    Ok(Some(cached.record))
                }
            }
            Ok(None) => Ok(None),
            Err(err) => {
                tracing::warn!(%err, "cached number lookup failed");
                Ok(None)
            }
        }
    }

    /// Blocking provider fetch for a number no local source matched.
    ///
    /// FAIL poisons the best-known record (or a fresh one when nothing was
    /// found earlier); SUCCESS supersedes whatever the cache tier produced;
    /// any other status leaves the current record untouched, as do
    /// transport errors.
    fn provider_step(
        &self,
        number: &str,
        country: &str,
        current: Option<IdentityRecord>,
        cancel: &Cancellation,
    ) -> ResolveResult<Option<IdentityRecord>> {
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }
        let normalized =
            normalize_to_e164(number, country).unwrap_or_else(|| number.to_string());
        let request = LookupRequest::new(normalized, RequestOrigin::Other);
        let response = match self.provider.blocking_fetch_info(&request, cancel) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(%err, "provider fetch failed");
                return Ok(current);
            }
        };
        match response.status {
            ProviderStatus::Fail => {
                let mut record =
                    current.unwrap_or_else(|| IdentityRecord::bad_data(number));
                record.is_bad_data = true;
                Ok(Some(record))
            }
            ProviderStatus::Success => {
                self.telemetry
                    .provider_info_fetched(&self.provider.identifier());
                Ok(Some(self.record_from_response(number, country, &response)))
            }
            ProviderStatus::None => Ok(current),
        }
    }

    /// Maps a SUCCESS provider response into an identity record.
    fn record_from_response(
        &self,
        number: &str,
        country: &str,
        response: &LookupResponse,
    ) -> IdentityRecord {
        let response_number = response.number.as_deref().unwrap_or(number);
        let formatted = format_number(response_number, None, country);

        let mut record = IdentityRecord::new(formatted.clone());
        record.source_type = SourceType::ExternalProvider;
        record.display_name = response.name.clone();
        record.provider_name = response.provider_name.clone();
        record.city = response.city.clone();
        record.country = response.country.clone();
        record.address = response.address.clone();
        record.photo_url = response.photo_url.clone();
        record.attribution_logo = response.attribution_logo.clone();
        record.is_spam = response.is_spam;
        record.spam_count = response.spam_count;
        record.formatted_number = Some(formatted.clone());
        record.type_label = succinct_location(
            response.city.as_deref(),
            response.country.as_deref(),
        );
        record.lookup_ref = provider_ref(
            &formatted,
            &ProviderAttribution {
                provider_name: response.provider_name.as_deref().unwrap_or(""),
                display_name: response.name.as_deref(),
                photo_url: response.photo_url.as_deref(),
                is_spam: response.is_spam,
                spam_count: response.spam_count,
            },
        );
        record
    }

    /// Builds the placeholder record standing in for an unmatched number.
    fn synthesize(&self, identifier: &str, country: &str) -> IdentityRecord {
        let formatted = format_number(identifier, None, country);
        let mut record = IdentityRecord::new(identifier);
        record.normalized_number = Some(
            normalize_to_e164(identifier, country)
                .unwrap_or_else(|| identifier.to_string()),
        );
        record.lookup_ref = synthesize_placeholder(&formatted);
        record.formatted_number = Some(formatted);
        record.is_synthetic = true;
        record
    }
}

/// Composes the `"<city>, <country name>"` label, omitting either half when
/// absent and never producing a leading or trailing separator.
fn succinct_location(city: Option<&str>, country_code: Option<&str>) -> Option<String> {
    let mut label = String::new();
    if let Some(city) = city.filter(|c| !c.is_empty()) {
        label.push_str(city);
    }
    if let Some(country) = country_code.and_then(country_display_name) {
        if !label.is_empty() {
            label.push_str(", ");
        }
        label.push_str(&country);
    }
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}
