//! URL validation and normalization.
//!
//! Inputs without a scheme get `https://`; the result must parse as an
//! absolute `http`/`https` URL whose host is a dotted domain name. The
//! returned string is the parser's serialization, so normalizing an already
//! normalized URL yields it unchanged.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use url::{Host, Url};

use crate::config::MAX_URL_LENGTH;

/// A scheme the user wrote explicitly (`ftp://x`, `javascript:...`, `mailto:...`).
/// A dotted prefix followed by digits (`example.com:8080`) is a host and port.
static EXPLICIT_SCHEME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?:([A-Za-z][A-Za-z0-9+.\-]*)://|([A-Za-z][A-Za-z0-9+\-]*):[^0-9])").ok()
});

/// Why an input was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    TooLong(usize),
    UnsupportedScheme(String),
    Unparseable(String),
    InvalidHost,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Empty => write!(f, "empty input"),
            RejectReason::TooLong(len) => {
                write!(f, "URL exceeds maximum length ({len} > {MAX_URL_LENGTH})")
            }
            RejectReason::UnsupportedScheme(scheme) => write!(f, "unsupported scheme '{scheme}'"),
            RejectReason::Unparseable(e) => write!(f, "unparseable URL: {e}"),
            RejectReason::InvalidHost => write!(f, "host is not a domain name"),
        }
    }
}

fn explicit_scheme(input: &str) -> Option<String> {
    let re = EXPLICIT_SCHEME.as_ref()?;
    let captures = re.captures(input)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Validates a raw input line and returns its canonical URL.
pub fn normalize_url(raw: &str) -> Result<String, RejectReason> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(RejectReason::Empty);
    }
    if input.len() > MAX_URL_LENGTH {
        return Err(RejectReason::TooLong(input.len()));
    }

    let candidate = match explicit_scheme(input) {
        Some(scheme) if scheme == "http" || scheme == "https" => input.to_string(),
        Some(scheme) => return Err(RejectReason::UnsupportedScheme(scheme)),
        None => format!("https://{input}"),
    };
    if candidate.len() > MAX_URL_LENGTH {
        return Err(RejectReason::TooLong(candidate.len()));
    }

    let parsed = Url::parse(&candidate).map_err(|e| RejectReason::Unparseable(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(RejectReason::UnsupportedScheme(other.to_string())),
    }
    match parsed.host() {
        Some(Host::Domain(domain)) if is_dotted_domain(domain) => {}
        _ => return Err(RejectReason::InvalidHost),
    }

    let normalized = parsed.to_string();
    if normalized.len() > MAX_URL_LENGTH {
        return Err(RejectReason::TooLong(normalized.len()));
    }
    Ok(normalized)
}

fn is_dotted_domain(domain: &str) -> bool {
    let domain = domain.trim_end_matches('.');
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

/// Compares two URLs ignoring one trailing slash on either side.
pub fn urls_match(a: &str, b: &str) -> bool {
    a == b || a.trim_end_matches('/') == b.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_https_and_canonicalizes() {
        assert_eq!(normalize_url("a.com").unwrap(), "https://a.com/");
        assert_eq!(normalize_url("https://a.com").unwrap(), "https://a.com/");
        assert_eq!(normalize_url("  Example.COM/Path  ").unwrap(), "https://example.com/Path");
        assert_eq!(
            normalize_url("http://valid-url.example.org").unwrap(),
            "http://valid-url.example.org/"
        );
    }

    #[test]
    fn test_keeps_path_query_and_port() {
        assert_eq!(
            normalize_url("example.com/path?query=value").unwrap(),
            "https://example.com/path?query=value"
        );
        assert_eq!(
            normalize_url("example.com:8080").unwrap(),
            "https://example.com:8080/"
        );
        assert_eq!(
            normalize_url("stackoverflow.com/questions/123").unwrap(),
            "https://stackoverflow.com/questions/123"
        );
    }

    #[test]
    fn test_rejects_explicit_foreign_schemes() {
        assert_eq!(
            normalize_url("ftp://x.com"),
            Err(RejectReason::UnsupportedScheme("ftp".to_string()))
        );
        assert_eq!(
            normalize_url("javascript:alert('xss')"),
            Err(RejectReason::UnsupportedScheme("javascript".to_string()))
        );
    }

    #[test]
    fn test_rejects_text_and_hosts_that_are_not_domains() {
        assert!(normalize_url("not a url").is_err());
        assert!(normalize_url("this is just text").is_err());
        assert_eq!(normalize_url("192.168.1.1"), Err(RejectReason::InvalidHost));
        assert_eq!(normalize_url("localhost"), Err(RejectReason::InvalidHost));
        assert_eq!(normalize_url("https://[::1]/"), Err(RejectReason::InvalidHost));
        assert_eq!(normalize_url("   "), Err(RejectReason::Empty));
    }

    #[test]
    fn test_rejects_too_long() {
        let long = format!("example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(matches!(normalize_url(&long), Err(RejectReason::TooLong(_))));

        // Fits as typed but not after the https:// prefix
        let borderline = format!("example.com/{}", "a".repeat(MAX_URL_LENGTH - 12));
        assert_eq!(borderline.len(), MAX_URL_LENGTH);
        assert!(matches!(
            normalize_url(&borderline),
            Err(RejectReason::TooLong(_))
        ));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in [
            "a.com",
            "HTTP://Example.com:80/a/../b",
            "github.com/test",
            "https://a.com/x?y=1#frag",
            "http://sub.example.org:8443",
        ] {
            let once = normalize_url(raw).unwrap();
            assert_eq!(normalize_url(&once).unwrap(), once, "input {raw}");
        }
    }

    #[test]
    fn test_urls_match_ignores_trailing_slash() {
        assert!(urls_match("https://a.com", "https://a.com/"));
        assert!(urls_match("https://a.com/", "https://a.com"));
        assert!(urls_match("https://a.com/x", "https://a.com/x"));
        assert!(!urls_match("https://a.com/x", "https://a.com/y"));
    }
}
