use serde::{Deserialize, Serialize};

/// Reserved thinker step: the current page task is complete.
pub const DONE_STEP: &str = "done";
/// Reserved thinker step: every link on the page is exhausted.
pub const ALL_DONE_STEP: &str = "all_done";
/// Reserved thinker step: the thinker could not produce a decision.
pub const ERROR_STEP: &str = "error";

/// A raw interactive element as extracted by the browser session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractiveElement {
    pub label: String,
    pub selector: String,
    pub href: Option<String>,
    /// Invocation method when the element is not a plain link (e.g. "click",
    /// "fill").
    pub method: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

/// A candidate interaction on a discovered page.
///
/// Identity for matching purposes is `(description, selector, href)`; any
/// one of them may serve as the lookup key depending on context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub description: String,
    pub selector: String,
    pub href: Option<String>,
    pub method: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub visited: bool,
}

impl LinkInfo {
    pub fn new(description: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            selector: selector.into(),
            href: None,
            method: None,
            args: Vec::new(),
            visited: false,
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// Key recorded in the session-global visited-link set.
    pub fn visit_key(&self) -> String {
        self.href
            .clone()
            .unwrap_or_else(|| self.description.clone())
    }

    /// Whether `identifier` addresses this link by href or description.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.href.as_deref() == Some(identifier) || self.description == identifier
    }
}

/// Context handed to the external thinker for one decision.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ThinkContext {
    pub goal: String,
    pub last_action: Option<String>,
    /// Free-form memory line (progress so far, notable observations).
    pub memory: Option<String>,
    /// Labels of the interactions still open on the current page.
    pub possible_labels: Vec<String>,
    /// Validator feedback injected after a rewind, if any.
    pub feedback: Option<String>,
}

/// The thinker's chosen next action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThinkAction {
    /// Free-form step label, or one of the reserved steps.
    pub step: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub reason: String,
    pub new_goal: Option<String>,
    pub next_link: Option<String>,
}

impl ThinkAction {
    pub fn step(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            args: Vec::new(),
            reason: reason.into(),
            new_goal: None,
            next_link: None,
        }
    }

    pub fn done(reason: impl Into<String>) -> Self {
        Self::step(DONE_STEP, reason)
    }

    pub fn all_done(reason: impl Into<String>) -> Self {
        Self::step(ALL_DONE_STEP, reason)
    }

    pub fn is_done(&self) -> bool {
        self.step == DONE_STEP
    }

    pub fn is_all_done(&self) -> bool {
        self.step == ALL_DONE_STEP
    }

    /// The reserved step a thinker returns when it could not decide.
    pub fn is_error(&self) -> bool {
        self.step == ERROR_STEP
    }
}

/// Full thinker reply: the action plus any page analysis it volunteered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThinkDecision {
    pub action: ThinkAction,
    pub analysis: Option<PageAnalysis>,
}

impl ThinkDecision {
    pub fn action(action: ThinkAction) -> Self {
        Self {
            action,
            analysis: None,
        }
    }
}

/// Observations recorded against a page while analyzing it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysis {
    #[serde(default)]
    pub bugs: Vec<String>,
    #[serde(default)]
    pub ui_issues: Vec<String>,
    pub notes: Option<String>,
}

/// Where an executed action took the browser.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    /// The browser stayed on the same logical page.
    None,
    /// Navigated to another page on the crawled site.
    Internal,
    /// Navigated off-site; the executor restored the original page.
    External,
}

/// Result of executing one action against a page element.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub action_taken: String,
    pub navigation: Navigation,
}

/// Convergence metrics computed by the external goal evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalMetrics {
    pub goal_similarity: f32,
    pub intent_confidence: f32,
    pub overall: f32,
}

impl GoalMetrics {
    /// True iff every metric clears its threshold simultaneously.
    pub fn clears(&self, thresholds: &GoalThresholds) -> bool {
        self.goal_similarity >= thresholds.similarity
            && self.intent_confidence >= thresholds.intent
            && self.overall >= thresholds.overall
    }

    /// Progress counts as improving when any metric gains at least
    /// `epsilon` over the previous round.
    pub fn improved_over(&self, previous: &GoalMetrics, epsilon: f32) -> bool {
        self.goal_similarity - previous.goal_similarity >= epsilon
            || self.intent_confidence - previous.intent_confidence >= epsilon
            || self.overall - previous.overall >= epsilon
    }
}

/// Fixed thresholds a goal run must clear to be declared achieved.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalThresholds {
    pub similarity: f32,
    pub intent: f32,
    pub overall: f32,
}

/// Payload of an inter-agent handoff: one page's worth of work.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PageTask {
    pub url: String,
    pub goal: Option<String>,
    pub links: Vec<LinkInfo>,
}
