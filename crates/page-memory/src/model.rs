use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use webrover_core_types::{LinkInfo, PageAnalysis};

/// Scalar metadata supplied when registering or re-registering a page.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PageDetails {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub parent: Option<String>,
    pub depth: Option<u32>,
    pub screenshot: Option<PathBuf>,
}

impl PageDetails {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>, depth: u32) -> Self {
        self.parent = Some(parent.into());
        self.depth = Some(depth);
        self
    }
}

/// Result of exercising one interactive element on a page.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElementTestResult {
    pub label: String,
    pub action_taken: String,
    pub success: bool,
}

/// One discovered page, keyed in the store by its canonical URL.
///
/// Created exactly once per canonical URL; later discoveries of the same
/// URL merge scalar metadata but never replace the link list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Page-level visited flag; monotonic false→true.
    pub visited: bool,
    pub links: Vec<LinkInfo>,
    pub screenshot: Option<PathBuf>,
    pub analysis: Option<PageAnalysis>,
    #[serde(default)]
    pub test_results: Vec<ElementTestResult>,
    pub parent: Option<String>,
    pub depth: Option<u32>,
}

impl PageRecord {
    pub fn new(canonical_url: impl Into<String>, details: PageDetails, links: Vec<LinkInfo>) -> Self {
        Self {
            url: canonical_url.into(),
            title: details.title,
            description: details.description,
            visited: false,
            links,
            screenshot: details.screenshot,
            analysis: None,
            test_results: Vec::new(),
            parent: details.parent,
            depth: details.depth,
        }
    }

    /// Merge scalar metadata from a re-discovery. The link list is
    /// immutable after first insertion and is deliberately untouched.
    pub fn merge_details(&mut self, details: PageDetails) {
        if self.title.is_none() {
            self.title = details.title;
        }
        if self.description.is_none() {
            self.description = details.description;
        }
        if self.screenshot.is_none() {
            self.screenshot = details.screenshot;
        }
        if self.parent.is_none() {
            self.parent = details.parent;
            self.depth = details.depth;
        }
    }

    pub fn is_fully_explored(&self) -> bool {
        self.links.iter().all(|link| link.visited)
    }

    pub fn unvisited_links(&self) -> Vec<LinkInfo> {
        self.links
            .iter()
            .filter(|link| !link.visited)
            .cloned()
            .collect()
    }
}

/// A recorded traversal edge, kept for reporting only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: String,
}
