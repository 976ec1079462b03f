//! External lookup provider collaborator.
//!
//! The provider is an out-of-process/network service queried only for
//! numbers the local tiers did not match. It supplies enrichment fields the
//! directory cannot know: city, country, street address, remote photo URL,
//! spam markers, and attribution. The fetch is explicitly blocking; callers
//! enforce their own deadline around the cascade, and the cascade checks
//! its cancellation token immediately before calling in.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::resolver::Cancellation;

/// Where a lookup request originated, passed through for provider-side
/// attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestOrigin {
    /// Call history annotation.
    CallLog,
    /// Incoming call screen.
    IncomingCall,
    /// Anything else.
    #[default]
    Other,
}

/// A provider lookup request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRequest {
    /// E.164-normalized number to look up.
    pub number: String,
    /// Origin tag for attribution.
    pub origin: RequestOrigin,
}

impl LookupRequest {
    /// Creates a request for the given normalized number.
    #[must_use]
    pub fn new(number: impl Into<String>, origin: RequestOrigin) -> Self {
        Self {
            number: number.into(),
            origin,
        }
    }
}

/// Provider-reported outcome of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// The provider matched the number and returned data.
    Success,
    /// The provider affirmatively flagged the number as bad data.
    Fail,
    /// The provider had nothing for this number.
    None,
}

/// A provider response.
///
/// Field presence depends on `status`: only `Success` responses carry
/// meaningful enrichment fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResponse {
    /// Outcome of the fetch.
    pub status: ProviderStatus,
    /// Display name.
    pub name: Option<String>,
    /// The number the provider matched on.
    pub number: Option<String>,
    /// City, for the "<city>, <country>" label.
    pub city: Option<String>,
    /// ISO 3166-1 country code.
    pub country: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Remote photo URL.
    pub photo_url: Option<String>,
    /// Reference to the provider's attribution logo, for display next to
    /// enriched results.
    pub attribution_logo: Option<String>,
    /// Spam flag.
    pub is_spam: bool,
    /// Spam report count.
    pub spam_count: i64,
    /// Human-readable provider name, for attribution.
    pub provider_name: Option<String>,
}

impl LookupResponse {
    /// Creates a response carrying only a status.
    #[must_use]
    pub fn with_status(status: ProviderStatus) -> Self {
        Self {
            status,
            name: None,
            number: None,
            city: None,
            country: None,
            address: None,
            photo_url: None,
            attribution_logo: None,
            is_spam: false,
            spam_count: 0,
            provider_name: None,
        }
    }
}

/// The external lookup provider.
pub trait LookupProvider: Send + Sync {
    /// True when the provider is configured and may be queried.
    fn is_enabled(&self) -> bool;

    /// A stable identifier for this provider, used for telemetry
    /// attribution.
    fn identifier(&self) -> String;

    /// Blocking network fetch for the requested number.
    ///
    /// Implementations may observe `cancel` to abandon an in-flight call;
    /// the cascade has already checked it once before calling.
    fn blocking_fetch_info(
        &self,
        request: &LookupRequest,
        cancel: &Cancellation,
    ) -> Result<LookupResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_provider_object_safe(_: &dyn LookupProvider) {}

    #[test]
    fn test_with_status_is_bare() {
        let response = LookupResponse::with_status(ProviderStatus::None);
        assert_eq!(response.status, ProviderStatus::None);
        assert!(response.name.is_none());
        assert!(!response.is_spam);
    }

    #[test]
    fn test_request_round_trips_through_json() {
        let request = LookupRequest::new("+15550100", RequestOrigin::CallLog);
        let encoded = serde_json::to_string(&request).unwrap();
        let decoded: LookupRequest = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, request);
    }
}
