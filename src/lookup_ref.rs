//! Opaque lookup references.
//!
//! A [`LookupRef`] either points at a real entry in the directory store, or
//! is a structured, self-describing stand-in built for a number no source
//! matched. The synthesized form embeds enough data (display number, type
//! marker) that a later "create contact" flow can pre-fill a form from the
//! reference alone, without another query.
//!
//! All constructors fail closed: an encoding error yields `None`, never a
//! panic.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

/// URI scheme shared by directory queries and lookup references.
pub const DIRECTORY_SCHEME: &str = "directory";

/// Host naming the contacts table of the directory store.
const CONTACTS_HOST: &str = "contacts";

/// Host marking references that do not point into the real store.
const ENCODED_HOST: &str = "lookup";

/// An opaque URI identifying where a record's details can be fetched from.
///
/// Compared by value, never by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupRef(Url);

impl LookupRef {
    /// Builds a reference to a real directory entry.
    ///
    /// The lookup key is percent-encoded into the final path segment.
    #[must_use]
    pub fn for_directory_entry(contact_id: i64, lookup_key: &str) -> Option<Self> {
        let mut url = Url::parse(&format!("{DIRECTORY_SCHEME}://{CONTACTS_HOST}")).ok()?;
        url.path_segments_mut()
            .ok()?
            .push(&contact_id.to_string())
            .push(lookup_key);
        Some(Self(url))
    }

    /// Parses a reference persisted as a string. Fails closed on anything
    /// unparsable.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        Url::parse(input).ok().map(Self)
    }

    /// True when this reference points into the real directory store.
    #[must_use]
    pub fn is_directory_entry(&self) -> bool {
        self.0.scheme() == DIRECTORY_SCHEME && self.0.host_str() == Some(CONTACTS_HOST)
    }

    /// True when this is an encoded (synthesized or provider-built)
    /// reference rather than a pointer into the store.
    #[must_use]
    pub fn is_encoded(&self) -> bool {
        self.0.scheme() == DIRECTORY_SCHEME && self.0.host_str() == Some(ENCODED_HOST)
    }

    /// The underlying URI.
    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// The URI rendered as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for LookupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The JSON document embedded in an encoded reference's fragment.
///
/// serde_json's default map keeps keys sorted, so serialization is
/// deterministic given the same inputs.
fn encoded_fragment(display_number: &str) -> Option<String> {
    let payload = json!({
        "display_name": display_number,
        "display_name_source": "phone",
        "vnd.callerid/phone": {
            "number": display_number,
            "type": "custom",
        },
    });
    serde_json::to_string(&payload).ok()
}

/// Base URL for encoded references, with the marker query parameter that
/// keeps them out of real directory resolution.
fn encoded_base() -> Option<Url> {
    let mut url = Url::parse(&format!("{DIRECTORY_SCHEME}://{ENCODED_HOST}/encoded")).ok()?;
    url.query_pairs_mut().append_pair("scope", "synthesized");
    Some(url)
}

/// Builds the deterministic reference for a number no source matched.
///
/// Deterministic given the same input; fails closed on encoding errors.
#[must_use]
pub fn synthesize_placeholder(formatted_number: &str) -> Option<LookupRef> {
    let fragment = encoded_fragment(formatted_number)?;
    let mut url = encoded_base()?;
    url.set_fragment(Some(&fragment));
    Some(LookupRef(url))
}

/// Attribution carried on a provider-built reference.
#[derive(Debug, Clone, Default)]
pub struct ProviderAttribution<'a> {
    /// Name of the provider that supplied the record.
    pub provider_name: &'a str,
    /// Display name to pre-fill, when the provider knew one.
    pub display_name: Option<&'a str>,
    /// Remote photo URL, when the provider supplied one.
    pub photo_url: Option<&'a str>,
    /// Provider spam flag.
    pub is_spam: bool,
    /// Provider spam report count.
    pub spam_count: i64,
}

/// Builds an encoded reference for a provider-enriched record.
///
/// Same shape as [`synthesize_placeholder`], with the provider name, photo
/// URL, display name, and spam markers embedded as query attributes.
#[must_use]
pub fn provider_ref(formatted_number: &str, attribution: &ProviderAttribution<'_>) -> Option<LookupRef> {
    let fragment = encoded_fragment(formatted_number)?;
    let mut url = encoded_base()?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("provider", attribution.provider_name);
        if let Some(name) = attribution.display_name {
            pairs.append_pair("display_name", name);
        }
        if let Some(photo) = attribution.photo_url {
            pairs.append_pair("photo_url", photo);
        }
        if attribution.is_spam {
            pairs.append_pair("spam", "1");
            pairs.append_pair("spam_count", &attribution.spam_count.to_string());
        }
    }
    url.set_fragment(Some(&fragment));
    Some(LookupRef(url))
}

/// Coerces a photo URI to `None` unless it points into the directory store.
///
/// Remote photo URLs (and anything else) must never be persisted in the
/// photo-URI column.
#[must_use]
pub fn null_for_non_directory(uri: Option<Url>) -> Option<Url> {
    uri.filter(|u| u.scheme() == DIRECTORY_SCHEME && u.host_str() == Some(CONTACTS_HOST))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_entry_ref() {
        let r = LookupRef::for_directory_entry(42, "key with spaces").unwrap();
        assert!(r.is_directory_entry());
        assert!(!r.is_encoded());
        assert!(r.as_str().starts_with("directory://contacts/42/"));
        assert!(!r.as_str().contains(' '));
    }

    #[test]
    fn test_placeholder_is_deterministic() {
        let a = synthesize_placeholder("(555) 010-0").unwrap();
        let b = synthesize_placeholder("(555) 010-0").unwrap();
        assert_eq!(a, b);

        let c = synthesize_placeholder("(555) 010-1").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_placeholder_is_not_a_directory_entry() {
        let r = synthesize_placeholder("(555) 010-0").unwrap();
        assert!(!r.is_directory_entry());
        assert!(r.is_encoded());
        assert!(r.as_str().contains("scope=synthesized"));
    }

    #[test]
    fn test_placeholder_embeds_display_number() {
        let r = synthesize_placeholder("(555) 010-0").unwrap();
        let fragment = r.as_url().fragment().unwrap();
        assert!(fragment.contains("display_name"));
        assert!(fragment.contains("custom"));
    }

    #[test]
    fn test_provider_ref_carries_attribution() {
        let attribution = ProviderAttribution {
            provider_name: "acme",
            display_name: Some("Pizza Palace"),
            photo_url: Some("https://cdn.example.com/p.jpg"),
            is_spam: true,
            spam_count: 7,
        };
        let r = provider_ref("(555) 010-0", &attribution).unwrap();
        assert!(r.is_encoded());
        let s = r.as_str();
        assert!(s.contains("provider=acme"));
        assert!(s.contains("spam=1"));
        assert!(s.contains("spam_count=7"));
    }

    #[test]
    fn test_null_for_non_directory() {
        let contact = Url::parse("directory://contacts/1/photo").unwrap();
        let remote = Url::parse("https://cdn.example.com/p.jpg").unwrap();
        assert_eq!(
            null_for_non_directory(Some(contact.clone())),
            Some(contact)
        );
        assert_eq!(null_for_non_directory(Some(remote)), None);
        assert_eq!(null_for_non_directory(None), None);
    }
}
