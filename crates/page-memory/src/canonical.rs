//! URL canonicalization.
//!
//! The exact normalization matters for cross-implementation compatibility:
//! lowercase host, leading `www.` stripped, fragment dropped, trailing
//! slash removed except for the root path. Unparseable input falls back
//! to string stripping so the store still gets a stable key.

use url::Url;

/// Produce the canonical key for a URL string.
pub fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => {
                let host = host.to_ascii_lowercase();
                let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

                let mut path = parsed.path().to_string();
                if path != "/" && path.ends_with('/') {
                    path.pop();
                }

                let mut out = format!("{}://{}", parsed.scheme(), host);
                if let Some(port) = parsed.port() {
                    out.push_str(&format!(":{port}"));
                }
                out.push_str(&path);
                if let Some(query) = parsed.query() {
                    out.push('?');
                    out.push_str(query);
                }
                out
            }
            // Scheme-only URLs (mailto:, data:) have no host to normalize;
            // just drop the fragment.
            None => trimmed
                .split('#')
                .next()
                .unwrap_or(trimmed)
                .to_string(),
        },
        Err(_) => fallback(trimmed),
    }
}

/// Best-effort normalization for strings `Url::parse` rejects.
fn fallback(raw: &str) -> String {
    let mut s = raw;
    for prefix in ["https://", "http://"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest;
            break;
        }
    }
    if let Some(rest) = s.strip_prefix("www.") {
        s = rest;
    }
    let end = s.find(['#', '?']).unwrap_or(s.len());
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_host_and_path() {
        assert_eq!(
            canonicalize("HTTPS://WWW.Example.COM/Pricing/"),
            "https://example.com/Pricing"
        );
        assert_eq!(canonicalize("https://example.com/"), "https://example.com/");
        assert_eq!(
            canonicalize("https://example.com/a#section"),
            "https://example.com/a"
        );
    }

    #[test]
    fn keeps_query_and_port() {
        assert_eq!(
            canonicalize("http://www.example.com:8080/search/?q=x#top"),
            "http://example.com:8080/search?q=x"
        );
    }

    #[test]
    fn fallback_for_unparseable() {
        assert_eq!(canonicalize("www.example.com/a#frag"), "example.com/a");
        assert_eq!(canonicalize("example.com/a?b=1"), "example.com/a");
    }

    #[test]
    fn idempotent() {
        for raw in [
            "https://WWW.Example.com/docs/",
            "http://example.com",
            "example.com/path#x",
            "https://example.com/search?q=rust",
            "mailto:team@example.com",
        ] {
            let once = canonicalize(raw);
            assert_eq!(canonicalize(&once), once, "not idempotent for {raw}");
        }
    }
}
