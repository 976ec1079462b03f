//! Phone number and SIP address handling.
//!
//! Pure functions backing the cascade: identifier classification, E.164
//! normalization against a compact country-calling-code table, and display
//! formatting. Nothing here touches a collaborator.

/// Characters tolerated as separators in dialable numbers.
const SEPARATORS: &str = "-. ()/";

/// Country calling codes, keyed by ISO 3166-1 alpha-2 code.
const CALLING_CODES: &[(&str, u16)] = &[
    ("US", 1),
    ("CA", 1),
    ("RU", 7),
    ("NL", 31),
    ("FR", 33),
    ("ES", 34),
    ("IT", 39),
    ("GB", 44),
    ("SE", 46),
    ("NO", 47),
    ("DE", 49),
    ("MX", 52),
    ("BR", 55),
    ("AU", 61),
    ("JP", 81),
    ("KR", 82),
    ("CN", 86),
    ("IN", 91),
];

/// English display names for the same country set.
const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("US", "United States"),
    ("CA", "Canada"),
    ("RU", "Russia"),
    ("NL", "Netherlands"),
    ("FR", "France"),
    ("ES", "Spain"),
    ("IT", "Italy"),
    ("GB", "United Kingdom"),
    ("SE", "Sweden"),
    ("NO", "Norway"),
    ("DE", "Germany"),
    ("MX", "Mexico"),
    ("BR", "Brazil"),
    ("AU", "Australia"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("CN", "China"),
    ("IN", "India"),
];

/// True when the identifier is a SIP-style address rather than a number.
#[must_use]
pub fn is_sip_address(identifier: &str) -> bool {
    identifier.contains('@')
        || identifier.contains("%40")
        || identifier.to_ascii_lowercase().starts_with("sip:")
}

/// Extracts the "user" portion of a SIP-style address.
///
/// Strips a leading `sip:` scheme and everything from the `@` (or encoded
/// `%40`) onward. Returns `None` when nothing is left.
#[must_use]
pub fn sip_username(address: &str) -> Option<String> {
    let trimmed = address.trim();
    let without_scheme = if trimmed.to_ascii_lowercase().starts_with("sip:") {
        &trimmed[4..]
    } else {
        trimmed
    };
    let user = match (without_scheme.find('@'), without_scheme.find("%40")) {
        (Some(at), Some(enc)) => &without_scheme[..at.min(enc)],
        (Some(at), None) => &without_scheme[..at],
        (None, Some(enc)) => &without_scheme[..enc],
        (None, None) => without_scheme,
    };
    if user.is_empty() {
        None
    } else {
        Some(user.to_string())
    }
}

/// True when the string is a globally dialable phone number: an optional
/// leading `+`, then digits with `.`/`-` separators, at least one digit.
#[must_use]
pub fn is_global_phone_number(number: &str) -> bool {
    let body = number.strip_prefix('+').unwrap_or(number);
    !body.is_empty()
        && body.chars().any(|c| c.is_ascii_digit())
        && body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-')
}

/// The calling code for an ISO country code, if known.
#[must_use]
pub fn country_calling_code(country: &str) -> Option<u16> {
    let iso = country.trim().to_ascii_uppercase();
    CALLING_CODES
        .iter()
        .find(|(code, _)| *code == iso)
        .map(|(_, cc)| *cc)
}

/// The display name for an ISO country code; unknown codes echo back as-is.
///
/// Mirrors locale lookup behavior: the caller always gets something
/// printable for the "<city>, <country>" label. Empty input yields `None`.
#[must_use]
pub fn country_display_name(country: &str) -> Option<String> {
    let iso = country.trim().to_ascii_uppercase();
    if iso.is_empty() {
        return None;
    }
    Some(
        DISPLAY_NAMES
            .iter()
            .find(|(code, _)| *code == iso)
            .map_or_else(|| iso.clone(), |(_, name)| (*name).to_string()),
    )
}

/// Normalizes a dialable number to an E.164-like `+<digits>` form.
///
/// A number already carrying `+` keeps its own calling code. Otherwise the
/// country hint supplies one; an unknown hint or an implausible digit count
/// makes normalization fail (`None`), and the cascade falls back to the raw
/// number.
#[must_use]
pub fn normalize_to_e164(number: &str, country: &str) -> Option<String> {
    let trimmed = number.trim();
    if trimmed.is_empty() || is_sip_address(trimmed) {
        return None;
    }
    let has_plus = trimmed.starts_with('+');
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || SEPARATORS.contains(c))
    {
        return None;
    }
    let digits: String = body.chars().filter(char::is_ascii_digit).collect();
    if has_plus {
        if (2..=15).contains(&digits.len()) {
            return Some(format!("+{digits}"));
        }
        return None;
    }
    let cc = country_calling_code(country)?;
    if (3..=14).contains(&digits.len()) {
        Some(format!("+{cc}{digits}"))
    } else {
        None
    }
}

/// Splits `digits` into (calling code, national digits) by longest known
/// calling-code prefix.
fn split_calling_code(digits: &str) -> Option<(u16, &str)> {
    for len in (1..=3).rev() {
        if digits.len() <= len {
            continue;
        }
        if let Ok(cc) = digits[..len].parse::<u16>() {
            if CALLING_CODES.iter().any(|(_, known)| *known == cc) {
                return Some((cc, &digits[len..]));
            }
        }
    }
    None
}

/// Formats a dialable number for display.
///
/// SIP addresses come back untouched. NANP numbers (calling code 1) get
/// `"(abc) def-ghij"` grouping; other recognized calling codes get a
/// `"+cc national"` rendering; anything unrecognized is returned as the
/// caller wrote it. `normalized` takes precedence over the country hint for
/// inferring the calling code, matching how the persisted normalized form
/// is the better signal when present.
#[must_use]
pub fn format_number(number: &str, normalized: Option<&str>, country: &str) -> String {
    if number.is_empty() {
        return String::new();
    }
    if is_sip_address(number) {
        return number.to_string();
    }
    let body = number.trim().trim_start_matches('+');
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || SEPARATORS.contains(c))
    {
        return number.to_string();
    }
    let digits: String = body.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return number.to_string();
    }

    let explicit_plus = number.trim_start().starts_with('+');
    let (cc, national) = if explicit_plus {
        match split_calling_code(&digits) {
            Some((cc, rest)) => (Some(cc), rest.to_string()),
            None => (None, digits.clone()),
        }
    } else if let Some(norm) = normalized.filter(|n| n.starts_with('+')) {
        let norm_digits: String = norm.chars().filter(char::is_ascii_digit).collect();
        (
            split_calling_code(&norm_digits).map(|(cc, _)| cc),
            digits.clone(),
        )
    } else {
        (country_calling_code(country), digits.clone())
    };

    match cc {
        Some(1) => format_nanp(&national),
        Some(cc) if explicit_plus => format!("+{cc} {national}"),
        _ => number.to_string(),
    }
}

/// `"(abc) def-rest"` grouping for NANP national digits.
fn format_nanp(digits: &str) -> String {
    if digits.len() < 7 {
        return digits.to_string();
    }
    format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sip_classification() {
        assert!(is_sip_address("sip:5550100@example.com"));
        assert!(is_sip_address("alice@example.com"));
        assert!(is_sip_address("alice%40example.com"));
        assert!(!is_sip_address("+15550100"));
        assert!(!is_sip_address("555-0100"));
    }

    #[test]
    fn test_sip_username_extraction() {
        assert_eq!(
            sip_username("sip:5550100@example.com"),
            Some("5550100".to_string())
        );
        assert_eq!(
            sip_username("alice%40example.com"),
            Some("alice".to_string())
        );
        assert_eq!(sip_username("sip:@example.com"), None);
    }

    #[test]
    fn test_global_phone_number() {
        assert!(is_global_phone_number("+1-555-0100"));
        assert!(is_global_phone_number("5550100"));
        assert!(is_global_phone_number("555.0100"));
        assert!(!is_global_phone_number(""));
        assert!(!is_global_phone_number("+"));
        assert!(!is_global_phone_number("alice"));
        assert!(!is_global_phone_number("555 0100"));
    }

    #[test]
    fn test_normalize_with_country_hint() {
        assert_eq!(
            normalize_to_e164("555-0100", "US"),
            Some("+15550100".to_string())
        );
        assert_eq!(
            normalize_to_e164("(555) 010-0123", "us"),
            Some("+15550100123".to_string())
        );
        assert_eq!(
            normalize_to_e164("030 1234567", "DE"),
            Some("+490301234567".to_string())
        );
    }

    #[test]
    fn test_normalize_keeps_explicit_plus() {
        assert_eq!(
            normalize_to_e164("+1-555-0100", "GB"),
            Some("+15550100".to_string())
        );
    }

    #[test]
    fn test_normalize_failures() {
        assert_eq!(normalize_to_e164("", "US"), None);
        assert_eq!(normalize_to_e164("5550100", "ZZ"), None);
        assert_eq!(normalize_to_e164("sip:a@b", "US"), None);
        assert_eq!(normalize_to_e164("call me", "US"), None);
    }

    #[test]
    fn test_format_nanp() {
        assert_eq!(format_number("+1-555-0100", None, "US"), "(555) 010-0");
        assert_eq!(format_number("5550100", None, "US"), "(555) 010-0");
        assert_eq!(
            format_number("555-010-0123", None, "US"),
            "(555) 010-0123"
        );
    }

    #[test]
    fn test_format_short_and_sip() {
        assert_eq!(format_number("411", None, "US"), "411");
        assert_eq!(
            format_number("sip:a@example.com", None, "US"),
            "sip:a@example.com"
        );
    }

    #[test]
    fn test_format_foreign() {
        assert_eq!(format_number("+49301234567", None, "US"), "+49 301234567");
        // Unknown country hint, no explicit calling code: left as written.
        assert_eq!(format_number("5550100", None, "ZZ"), "5550100");
    }

    #[test]
    fn test_format_uses_normalized_for_country() {
        assert_eq!(
            format_number("5550100", Some("+15550100"), "ZZ"),
            "(555) 010-0"
        );
    }

    #[test]
    fn test_country_display_name() {
        assert_eq!(
            country_display_name("US"),
            Some("United States".to_string())
        );
        assert_eq!(country_display_name("gb"), Some("United Kingdom".to_string()));
        assert_eq!(country_display_name("ZZ"), Some("ZZ".to_string()));
        assert_eq!(country_display_name(""), None);
    }
}
