use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, warn};

use webrover_core_types::{LinkInfo, PageAnalysis};

use crate::canonical::canonicalize;
use crate::model::{Edge, ElementTestResult, PageDetails, PageRecord};

/// Shared page/link graph store.
///
/// One instance per crawl session, passed by reference to every agent
/// that needs it. All operations key by canonical URL, so callers may
/// pass raw URLs freely.
#[derive(Default)]
pub struct PageMemory {
    pages: RwLock<HashMap<String, PageRecord>>,
    /// LIFO backtracking trail of canonical URLs.
    stack: Mutex<Vec<String>>,
    /// `(href|description)` identifiers tested anywhere in the session.
    visited_links: RwLock<HashSet<String>>,
    edges: RwLock<Vec<Edge>>,
}

/// Counters surfaced in the run summary.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct MemoryStats {
    pub pages_discovered: usize,
    pub pages_visited: usize,
    pub links_total: usize,
    pub links_visited: usize,
    pub edges_recorded: usize,
}

impl PageMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent insert. Returns true when the page was new; on a
    /// repeat discovery only scalar metadata merges and the link list is
    /// left untouched.
    pub fn add_page(&self, details: PageDetails) -> bool {
        self.add_page_with_links(details, Vec::new())
    }

    pub fn add_page_with_links(&self, details: PageDetails, links: Vec<LinkInfo>) -> bool {
        let key = canonicalize(&details.url);
        let mut pages = self.pages.write();
        match pages.get_mut(&key) {
            Some(existing) => {
                existing.merge_details(details);
                false
            }
            None => {
                debug!(url = %key, links = links.len(), "page registered");
                pages.insert(key.clone(), PageRecord::new(key, details, links));
                true
            }
        }
    }

    pub fn page_exists(&self, url: &str) -> bool {
        self.pages.read().contains_key(&canonicalize(url))
    }

    pub fn get_page(&self, url: &str) -> Option<PageRecord> {
        self.pages.read().get(&canonicalize(url)).cloned()
    }

    pub fn mark_page_visited(&self, url: &str) {
        if let Some(page) = self.pages.write().get_mut(&canonicalize(url)) {
            page.visited = true;
        }
    }

    /// Locate a link on `url` by href or description equality and mark it
    /// visited; the identifier also joins the session-global visited set.
    ///
    /// A missing match is a recoverable inconsistency (the model-chosen
    /// label may not exactly match stored text), so it only logs.
    pub fn mark_link_visited(&self, url: &str, identifier: &str) {
        self.visited_links.write().insert(identifier.to_string());
        let key = canonicalize(url);
        let mut pages = self.pages.write();
        let Some(page) = pages.get_mut(&key) else {
            warn!(url = %key, identifier, "mark_link_visited: page not in store");
            return;
        };
        match page
            .links
            .iter_mut()
            .find(|link| link.matches_identifier(identifier))
        {
            Some(link) => link.visited = true,
            None => {
                warn!(url = %key, identifier, "mark_link_visited: no matching link");
            }
        }
    }

    /// Force-mark every remaining link on a page (the `all_done` path).
    pub fn mark_all_links_visited(&self, url: &str) {
        let mut pages = self.pages.write();
        if let Some(page) = pages.get_mut(&canonicalize(url)) {
            let mut global = self.visited_links.write();
            for link in page.links.iter_mut().filter(|l| !l.visited) {
                global.insert(link.visit_key());
                link.visited = true;
            }
        }
    }

    /// True iff every link on the page is visited. A page that is not in
    /// the store is vacuously explored.
    pub fn is_fully_explored(&self, url: &str) -> bool {
        self.pages
            .read()
            .get(&canonicalize(url))
            .map(|page| page.is_fully_explored())
            .unwrap_or(true)
    }

    /// Links on `url` still awaiting a visit. A link already tested
    /// elsewhere in the session (global set) is excluded so it is only
    /// exercised once per crawl.
    pub fn unvisited_links(&self, url: &str) -> Vec<LinkInfo> {
        let global = self.visited_links.read();
        self.pages
            .read()
            .get(&canonicalize(url))
            .map(|page| {
                page.links
                    .iter()
                    .filter(|link| !link.visited && !global.contains(&link.visit_key()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn link_seen_globally(&self, identifier: &str) -> bool {
        self.visited_links.read().contains(identifier)
    }

    /// Push onto the backtracking trail; a no-op when `url` already sits
    /// at the top (no self-loops).
    pub fn push_stack(&self, url: &str) {
        let key = canonicalize(url);
        let mut stack = self.stack.lock();
        if stack.last() != Some(&key) {
            stack.push(key);
        }
    }

    pub fn pop_stack(&self) -> Option<String> {
        self.stack.lock().pop()
    }

    pub fn stack_snapshot(&self) -> Vec<String> {
        self.stack.lock().clone()
    }

    /// Record a traversal edge once; an identical `(from, to, label)`
    /// triple is a no-op, so candidate and actually-taken hops can both
    /// be reported without duplication.
    pub fn record_edge(&self, from: &str, to: &str, label: &str) {
        let edge = Edge {
            from: canonicalize(from),
            to: canonicalize(to),
            label: label.to_string(),
        };
        let mut edges = self.edges.write();
        if !edges.contains(&edge) {
            edges.push(edge);
        }
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.edges.read().clone()
    }

    pub fn set_analysis(&self, url: &str, analysis: PageAnalysis) {
        if let Some(page) = self.pages.write().get_mut(&canonicalize(url)) {
            page.analysis = Some(analysis);
        }
    }

    pub fn set_screenshot(&self, url: &str, path: PathBuf) {
        if let Some(page) = self.pages.write().get_mut(&canonicalize(url)) {
            page.screenshot = Some(path);
        }
    }

    pub fn record_test_result(&self, url: &str, result: ElementTestResult) {
        if let Some(page) = self.pages.write().get_mut(&canonicalize(url)) {
            page.test_results.push(result);
        }
    }

    pub fn pages_snapshot(&self) -> Vec<PageRecord> {
        let mut pages: Vec<PageRecord> = self.pages.read().values().cloned().collect();
        pages.sort_by(|a, b| a.url.cmp(&b.url));
        pages
    }

    pub fn stats(&self) -> MemoryStats {
        let pages = self.pages.read();
        MemoryStats {
            pages_discovered: pages.len(),
            pages_visited: pages.values().filter(|p| p.visited).count(),
            links_total: pages.values().map(|p| p.links.len()).sum(),
            links_visited: pages
                .values()
                .flat_map(|p| p.links.iter())
                .filter(|l| l.visited)
                .count(),
            edges_recorded: self.edges.read().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(description: &str, href: &str) -> LinkInfo {
        LinkInfo::new(description, format!("a[href='{href}']")).with_href(href)
    }

    #[test]
    fn one_record_per_canonical_url() {
        let memory = PageMemory::new();
        assert!(memory.add_page_with_links(
            PageDetails::new("https://www.example.com/a/"),
            vec![link("B", "https://example.com/b")],
        ));
        // Same page under a different spelling: metadata merges, the
        // link list never changes.
        assert!(!memory.add_page_with_links(
            PageDetails::new("https://example.com/a").with_title("A"),
            vec![link("C", "https://example.com/c")],
        ));

        let page = memory.get_page("HTTPS://EXAMPLE.COM/a").unwrap();
        assert_eq!(page.title.as_deref(), Some("A"));
        assert_eq!(page.links.len(), 1);
        assert_eq!(page.links[0].description, "B");
    }

    #[test]
    fn visited_flags_are_monotonic() {
        let memory = PageMemory::new();
        memory.add_page_with_links(
            PageDetails::new("https://example.com/a"),
            vec![link("B", "https://example.com/b")],
        );

        memory.mark_page_visited("https://example.com/a");
        memory.mark_link_visited("https://example.com/a", "https://example.com/b");
        // Re-registering must not reset anything.
        memory.add_page_with_links(PageDetails::new("https://example.com/a"), Vec::new());

        let page = memory.get_page("https://example.com/a").unwrap();
        assert!(page.visited);
        assert!(page.links[0].visited);
        assert!(memory.link_seen_globally("https://example.com/b"));
    }

    #[test]
    fn mark_link_by_description() {
        let memory = PageMemory::new();
        memory.add_page_with_links(
            PageDetails::new("https://example.com/a"),
            vec![LinkInfo::new("Submit form", "form button")],
        );
        memory.mark_link_visited("https://example.com/a", "Submit form");
        assert!(memory.is_fully_explored("https://example.com/a"));
    }

    #[test]
    fn unknown_identifier_is_nonfatal() {
        let memory = PageMemory::new();
        memory.add_page_with_links(
            PageDetails::new("https://example.com/a"),
            vec![link("B", "https://example.com/b")],
        );
        memory.mark_link_visited("https://example.com/a", "no such link");
        assert!(!memory.is_fully_explored("https://example.com/a"));
    }

    #[test]
    fn fully_explored_semantics() {
        let memory = PageMemory::new();
        // Vacuously explored when unknown.
        assert!(memory.is_fully_explored("https://example.com/missing"));

        memory.add_page_with_links(
            PageDetails::new("https://example.com/a"),
            vec![link("B", "https://example.com/b")],
        );
        assert!(!memory.is_fully_explored("https://example.com/a"));
        memory.mark_all_links_visited("https://example.com/a");
        assert!(memory.is_fully_explored("https://example.com/a"));
    }

    #[test]
    fn globally_visited_links_drop_out_of_queue() {
        let memory = PageMemory::new();
        memory.add_page_with_links(
            PageDetails::new("https://example.com/a"),
            vec![link("Docs", "https://example.com/docs")],
        );
        memory.add_page_with_links(
            PageDetails::new("https://example.com/b"),
            vec![link("Docs", "https://example.com/docs")],
        );

        memory.mark_link_visited("https://example.com/a", "https://example.com/docs");
        assert!(memory.unvisited_links("https://example.com/b").is_empty());
    }

    #[test]
    fn stack_skips_consecutive_duplicates() {
        let memory = PageMemory::new();
        memory.push_stack("https://example.com/a");
        memory.push_stack("https://www.example.com/a/");
        memory.push_stack("https://example.com/b");
        memory.push_stack("https://example.com/a");

        assert_eq!(
            memory.stack_snapshot(),
            vec![
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/a",
            ]
        );
        assert_eq!(memory.pop_stack().as_deref(), Some("https://example.com/a"));
        assert_eq!(memory.pop_stack().as_deref(), Some("https://example.com/b"));
        assert_eq!(memory.pop_stack().as_deref(), Some("https://example.com/a"));
        assert_eq!(memory.pop_stack(), None);
    }

    #[test]
    fn stats_track_progress() {
        let memory = PageMemory::new();
        memory.add_page_with_links(
            PageDetails::new("https://example.com/a"),
            vec![link("B", "https://example.com/b")],
        );
        memory.mark_page_visited("https://example.com/a");
        memory.mark_link_visited("https://example.com/a", "https://example.com/b");
        memory.record_edge("https://example.com/a", "https://example.com/b", "B");
        memory.record_edge("https://www.example.com/a/", "https://example.com/b", "B");

        let stats = memory.stats();
        assert_eq!(stats.pages_discovered, 1);
        assert_eq!(stats.pages_visited, 1);
        assert_eq!(stats.links_visited, 1);
        assert_eq!(stats.edges_recorded, 1);
    }
}
