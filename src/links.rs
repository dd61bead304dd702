//! Raw interactive elements → crawlable `LinkInfo` entries.
//!
//! Filters out non-navigational hrefs (mailto:, tel:, javascript:, pure
//! in-page anchors, logout links, cross-host links), resolves relative
//! hrefs against the current page, deduplicates by normalized absolute
//! URL and drops self-links. Elements without an href (buttons, inputs)
//! are kept as interaction candidates and deduplicated by
//! `(label, selector)`.

use std::collections::HashSet;

use tracing::debug;
use url::Url;

use webrover_core_types::{InteractiveElement, LinkInfo};
use webrover_page_memory::canonicalize;

const SKIP_SCHEMES: [&str; 3] = ["mailto:", "tel:", "javascript:"];

/// Convert the session's raw element snapshot into the page's link list.
pub fn links_from_elements(current_url: &str, elements: Vec<InteractiveElement>) -> Vec<LinkInfo> {
    let base = Url::parse(current_url).ok();
    let current_canonical = canonicalize(current_url);
    let current_host = base.as_ref().and_then(|u| u.host_str().map(host_key));

    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut seen_plain: HashSet<(String, String)> = HashSet::new();
    let mut links = Vec::new();

    for element in elements {
        match element.href.as_deref().map(str::trim) {
            Some(href) if !href.is_empty() => {
                if !navigational(href) {
                    continue;
                }
                let Some(absolute) = absolutize(base.as_ref(), href) else {
                    debug!(href, "dropping unresolvable href");
                    continue;
                };
                if let (Some(page_host), Some(link_host)) =
                    (&current_host, absolute.host_str().map(host_key))
                {
                    if *page_host != link_host {
                        continue;
                    }
                }
                let canonical = canonicalize(absolute.as_str());
                if canonical == current_canonical {
                    continue;
                }
                if !seen_urls.insert(canonical) {
                    continue;
                }
                links.push(LinkInfo {
                    description: element.label,
                    selector: element.selector,
                    href: Some(absolute.into()),
                    method: element.method,
                    args: element.args,
                    visited: false,
                });
            }
            _ => {
                let key = (element.label.clone(), element.selector.clone());
                if !seen_plain.insert(key) {
                    continue;
                }
                links.push(LinkInfo {
                    description: element.label,
                    selector: element.selector,
                    href: None,
                    method: element.method,
                    args: element.args,
                    visited: false,
                });
            }
        }
    }
    links
}

fn navigational(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    if href.starts_with('#') {
        return false;
    }
    if SKIP_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return false;
    }
    // Never follow sign-out links; they would end the authenticated crawl.
    if lower.contains("logout") || lower.contains("sign-out") || lower.contains("signout") {
        return false;
    }
    true
}

fn absolutize(base: Option<&Url>, href: &str) -> Option<Url> {
    match Url::parse(href) {
        Ok(url) => Some(url),
        Err(_) => base.and_then(|b| b.join(href).ok()),
    }
}

fn host_key(host: &str) -> String {
    let lower = host.to_ascii_lowercase();
    lower.strip_prefix("www.").unwrap_or(&lower).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(label: &str, selector: &str, href: Option<&str>) -> InteractiveElement {
        InteractiveElement {
            label: label.into(),
            selector: selector.into(),
            href: href.map(Into::into),
            method: None,
            args: Vec::new(),
        }
    }

    #[test]
    fn filters_non_navigational_hrefs() {
        let links = links_from_elements(
            "https://example.com/home",
            vec![
                element("Mail us", "a.mail", Some("mailto:hi@example.com")),
                element("Call", "a.tel", Some("tel:+1555")),
                element("Popup", "a.js", Some("javascript:void(0)")),
                element("Top", "a.top", Some("#top")),
                element("Log out", "a.exit", Some("/logout")),
                element("About", "a.about", Some("/about")),
            ],
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].description, "About");
        assert_eq!(links[0].href.as_deref(), Some("https://example.com/about"));
    }

    #[test]
    fn drops_cross_host_and_self_links() {
        let links = links_from_elements(
            "https://example.com/home",
            vec![
                element("Twitter", "a.tw", Some("https://twitter.com/example")),
                element("Home", "a.home", Some("https://www.example.com/home/")),
                element("Docs", "a.docs", Some("https://example.com/docs")),
            ],
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].description, "Docs");
    }

    #[test]
    fn dedupes_by_canonical_url() {
        let links = links_from_elements(
            "https://example.com/home",
            vec![
                element("Pricing", "a.nav", Some("/pricing")),
                element("See pricing", "a.cta", Some("https://www.example.com/pricing/")),
            ],
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].description, "Pricing");
    }

    #[test]
    fn keeps_hrefless_elements_once() {
        let links = links_from_elements(
            "https://example.com/form",
            vec![
                element("Submit", "form button", None),
                element("Submit", "form button", None),
                element("Search", "input#q", None),
            ],
        );
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.href.is_none()));
    }
}
