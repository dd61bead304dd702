//! Fuzzy resolution of a model-chosen label back to a concrete link.
//!
//! Three tiers, in order: exact match on description, selector or href;
//! case/punctuation-normalized substring match in either direction;
//! Levenshtein similarity ≥ 0.8 against descriptions, highest score
//! first. Ties break toward queue order, so resolution is deterministic
//! for a fixed queue and candidate string.

use webrover_core_types::LinkInfo;

/// Minimum Levenshtein similarity for a tier-3 match.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Resolve `step` (plus any action args) against the link queue.
pub fn resolve<'a>(links: &'a [LinkInfo], step: &str, args: &[String]) -> Option<&'a LinkInfo> {
    let mut candidates: Vec<&str> = vec![step];
    candidates.extend(args.iter().map(String::as_str));

    // Tier 1: exact identity.
    for link in links {
        for candidate in &candidates {
            if link.description == *candidate
                || link.selector == *candidate
                || link.href.as_deref() == Some(*candidate)
            {
                return Some(link);
            }
        }
    }

    // Tier 2: normalized substring in either direction.
    let step_norm = normalize(step);
    if !step_norm.is_empty() {
        for link in links {
            let desc_norm = normalize(&link.description);
            if desc_norm.is_empty() {
                continue;
            }
            if desc_norm.contains(&step_norm) || step_norm.contains(&desc_norm) {
                return Some(link);
            }
        }
    }

    // Tier 3: similarity against descriptions; strictly-greater keeps the
    // first of equals.
    let mut best: Option<(&LinkInfo, f64)> = None;
    for link in links {
        let score = similarity(&step_norm, &normalize(&link.description));
        if score >= SIMILARITY_THRESHOLD && best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((link, score));
        }
    }
    best.map(|(link, _)| link)
}

/// Lowercase, strip punctuation, collapse whitespace.
fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = true;
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Similarity in `[0, 1]`: 1 minus the edit distance over the longer
/// length.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Classic two-row Levenshtein distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> Vec<LinkInfo> {
        vec![
            LinkInfo::new("Pricing", "a.pricing").with_href("https://example.com/pricing"),
            LinkInfo::new("About us", "a.about").with_href("https://example.com/about"),
            LinkInfo::new("Contact", "a.contact").with_href("https://example.com/contact"),
        ]
    }

    #[test]
    fn exact_match_wins() {
        let links = queue();
        let link = resolve(&links, "About us", &[]).unwrap();
        assert_eq!(link.selector, "a.about");
    }

    #[test]
    fn exact_match_on_href_via_args() {
        let links = queue();
        let args = vec!["https://example.com/contact".to_string()];
        let link = resolve(&links, "click the contact link", &args).unwrap();
        assert_eq!(link.description, "Contact");
    }

    #[test]
    fn substring_match_both_directions() {
        let links = queue();
        assert_eq!(
            resolve(&links, "about", &[]).unwrap().description,
            "About us"
        );
        assert_eq!(
            resolve(&links, "go to the Pricing page now", &[])
                .unwrap()
                .description,
            "Pricing",
            "a verbose step containing the label still resolves"
        );
        assert_eq!(
            resolve(&links, "PRICING!", &[]).unwrap().description,
            "Pricing"
        );
    }

    #[test]
    fn levenshtein_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn similarity_tier_with_threshold() {
        let links = queue();
        // One edit away from "pricing" (7 chars): 1 - 1/7 ≈ 0.857.
        assert_eq!(
            resolve(&links, "Pricng", &[]).unwrap().description,
            "Pricing"
        );
        // Far beyond the 0.8 bound.
        assert!(resolve(&links, "Zxqwvy", &[]).is_none());
    }

    #[test]
    fn deterministic_tie_break() {
        let links = vec![
            LinkInfo::new("Paged", "a.one"),
            LinkInfo::new("Pages", "a.two"),
        ];
        // Both score identically against "Pagez"; the first in queue
        // order must win every time.
        for _ in 0..10 {
            assert_eq!(resolve(&links, "Pagez", &[]).unwrap().selector, "a.one");
        }
    }
}
