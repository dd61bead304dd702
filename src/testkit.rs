//! Scripted in-memory collaborators.
//!
//! Stand-ins for the external browser session, thinker and action
//! executor, driven by a static site map. The demo binary and the
//! integration tests use these to exercise the full agent stack without
//! a browser or an LLM.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use webrover_agent_fsm::{handle, AgentRegistry, Driver};
use webrover_core_types::{
    ActionOutcome, GoalMetrics, InteractiveElement, LinkInfo, Navigation, RoverError, ThinkAction,
    ThinkContext, ThinkDecision,
};
use webrover_event_bus::EventBus;
use webrover_page_memory::{canonicalize, PageMemory};

use crate::actions::ActionExecutor;
use crate::agents::{Analyzer, AnalyzerMode, Crawler, ANALYZER_NAME, CLICKER_NAME, CRAWLER_NAME};
use crate::config::CrawlConfig;
use crate::session::{Session, WaitPolicy};
use crate::thinker::{GoalEvaluator, Thinker};

/// A static site: canonical URL → interactive elements on that page.
#[derive(Clone, Default)]
pub struct ScriptedSite {
    pages: HashMap<String, Vec<InteractiveElement>>,
}

impl ScriptedSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, elements: Vec<InteractiveElement>) -> Self {
        self.pages.insert(canonicalize(url), elements);
        self
    }

    pub fn contains(&self, url: &str) -> bool {
        self.pages.contains_key(&canonicalize(url))
    }

    fn elements(&self, url: &str) -> Vec<InteractiveElement> {
        self.pages
            .get(&canonicalize(url))
            .cloned()
            .unwrap_or_default()
    }
}

/// Link-element shorthand for building scripted sites.
pub fn nav_link(label: &str, href: &str) -> InteractiveElement {
    InteractiveElement {
        label: label.to_string(),
        selector: format!("a[href='{href}']"),
        href: Some(href.to_string()),
        method: None,
        args: Vec::new(),
    }
}

/// Session over a [`ScriptedSite`]; navigation succeeds only onto pages
/// the site defines.
pub struct ScriptedSession {
    site: ScriptedSite,
    current: Mutex<String>,
}

impl ScriptedSession {
    pub fn new(site: ScriptedSite) -> Arc<Self> {
        Arc::new(Self {
            site,
            current: Mutex::new(String::new()),
        })
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn start(&self, url: &str) -> Result<bool, RoverError> {
        let canonical = canonicalize(url);
        let known = self.site.contains(&canonical);
        *self.current.lock() = canonical;
        Ok(known)
    }

    async fn current_url(&self) -> Result<String, RoverError> {
        Ok(self.current.lock().clone())
    }

    async fn navigate(&self, url: &str, _wait: WaitPolicy) -> Result<(), RoverError> {
        let canonical = canonicalize(url);
        if !self.site.contains(&canonical) {
            return Err(RoverError::navigation(format!("no such page: {canonical}")));
        }
        *self.current.lock() = canonical;
        Ok(())
    }

    async fn take_screenshot(
        &self,
        _dir: &Path,
        _name: &str,
    ) -> Result<Option<PathBuf>, RoverError> {
        Ok(None)
    }

    async fn extract_interactive_elements(&self) -> Result<Vec<InteractiveElement>, RoverError> {
        Ok(self.site.elements(&self.current.lock().clone()))
    }

    async fn close(&self) -> Result<(), RoverError> {
        Ok(())
    }
}

/// Thinker that always picks the first remaining label, yielding
/// exhaustive coverage.
pub struct CoverageThinker;

#[async_trait]
impl Thinker for CoverageThinker {
    async fn think(
        &self,
        context: &ThinkContext,
        _screenshot: Option<&Path>,
    ) -> Result<ThinkDecision, RoverError> {
        let action = match context.possible_labels.first() {
            Some(label) => ThinkAction::step(label.clone(), format!("try '{label}' next")),
            None => ThinkAction::done("no interactions left on this page"),
        };
        Ok(ThinkDecision::action(action))
    }

    async fn health_check(&self) -> Result<(), RoverError> {
        Ok(())
    }
}

/// Thinker that replays a fixed script of decisions, then reports done.
/// Records every context it was asked about, so tests can assert on
/// feedback threading.
pub struct QueueThinker {
    decisions: Mutex<VecDeque<ThinkDecision>>,
    seen: Mutex<Vec<ThinkContext>>,
}

impl QueueThinker {
    pub fn new(decisions: impl IntoIterator<Item = ThinkDecision>) -> Arc<Self> {
        Arc::new(Self {
            decisions: Mutex::new(decisions.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn contexts(&self) -> Vec<ThinkContext> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Thinker for QueueThinker {
    async fn think(
        &self,
        context: &ThinkContext,
        _screenshot: Option<&Path>,
    ) -> Result<ThinkDecision, RoverError> {
        self.seen.lock().push(context.clone());
        Ok(self
            .decisions
            .lock()
            .pop_front()
            .unwrap_or_else(|| ThinkDecision::action(ThinkAction::done("script exhausted"))))
    }

    async fn health_check(&self) -> Result<(), RoverError> {
        Ok(())
    }
}

/// Executor that applies link clicks as navigations on the scripted
/// session.
pub struct SiteExecutor {
    session: Arc<ScriptedSession>,
}

impl SiteExecutor {
    pub fn new(session: Arc<ScriptedSession>) -> Arc<Self> {
        Arc::new(Self { session })
    }
}

#[async_trait]
impl ActionExecutor for SiteExecutor {
    async fn execute_action(
        &self,
        action: &ThinkAction,
        target: Option<&LinkInfo>,
        _state_label: &str,
    ) -> Result<ActionOutcome, RoverError> {
        let Some(link) = target else {
            // Free-form goal action; nothing to click in the script.
            return Ok(ActionOutcome {
                success: true,
                action_taken: action.step.clone(),
                navigation: Navigation::None,
            });
        };

        match &link.href {
            Some(href) => {
                self.session.navigate(href, WaitPolicy::Load).await?;
                Ok(ActionOutcome {
                    success: true,
                    action_taken: format!("clicked '{}'", link.description),
                    navigation: Navigation::Internal,
                })
            }
            None => Ok(ActionOutcome {
                success: true,
                action_taken: format!("interacted with '{}'", link.description),
                navigation: Navigation::None,
            }),
        }
    }
}

/// Goal evaluator replaying a fixed metric script; the last entry
/// repeats once the script runs out.
pub struct StaticEvaluator {
    script: Mutex<VecDeque<GoalMetrics>>,
    last: Mutex<GoalMetrics>,
}

impl StaticEvaluator {
    pub fn new(script: impl IntoIterator<Item = GoalMetrics>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(GoalMetrics {
                goal_similarity: 0.0,
                intent_confidence: 0.0,
                overall: 0.0,
            }),
        })
    }
}

#[async_trait]
impl GoalEvaluator for StaticEvaluator {
    async fn evaluate(&self, _goal: &str, _progress: &[String]) -> Result<GoalMetrics, RoverError> {
        match self.script.lock().pop_front() {
            Some(metrics) => {
                *self.last.lock() = metrics;
                Ok(metrics)
            }
            None => Ok(*self.last.lock()),
        }
    }
}

/// Fully wired crawl over a scripted site.
pub struct CrawlHarness {
    pub bus: Arc<EventBus>,
    pub memory: Arc<PageMemory>,
    pub registry: Arc<AgentRegistry>,
    pub session: Arc<ScriptedSession>,
    pub driver: Driver,
}

/// Assemble crawler + both delegates over a scripted site and start the
/// session at the configured URL.
pub async fn assemble_crawl(site: ScriptedSite, config: CrawlConfig) -> CrawlHarness {
    let bus = EventBus::new(256);
    let memory = Arc::new(PageMemory::new());
    let registry = Arc::new(AgentRegistry::new());
    let session = ScriptedSession::new(site);
    let thinker: Arc<dyn Thinker> = Arc::new(CoverageThinker);
    let executor = SiteExecutor::new(session.clone());

    let analyzer = handle(Analyzer::new(
        ANALYZER_NAME,
        bus.clone(),
        session.clone(),
        thinker.clone(),
        executor.clone(),
        memory.clone(),
        config.clone(),
        AnalyzerMode::Thorough,
    ));
    let clicker = handle(Analyzer::new(
        CLICKER_NAME,
        bus.clone(),
        session.clone(),
        thinker.clone(),
        executor.clone(),
        memory.clone(),
        config.clone(),
        AnalyzerMode::Quick,
    ));
    let crawler = handle(Crawler::new(
        CRAWLER_NAME,
        bus.clone(),
        session.clone(),
        memory.clone(),
        registry.clone(),
        config.clone(),
    ));

    registry.register(ANALYZER_NAME, analyzer.clone());
    registry.register(CLICKER_NAME, clicker.clone());
    registry.register(CRAWLER_NAME, crawler.clone());

    let _ = session.start(&config.start_url).await;

    let mut driver = Driver::new(
        bus.clone(),
        Duration::from_millis(config.tick_interval_ms),
        config.max_rounds,
    );
    driver.add(crawler);
    driver.add_worker(analyzer);
    driver.add_worker(clicker);

    CrawlHarness {
        bus,
        memory,
        registry,
        session,
        driver,
    }
}

/// Three-page demo site with a cycle back to the start page.
pub fn demo_site() -> ScriptedSite {
    ScriptedSite::new()
        .page(
            "https://demo.rover/home",
            vec![
                nav_link("About", "https://demo.rover/about"),
                nav_link("Pricing", "https://demo.rover/pricing"),
                nav_link("Mail us", "mailto:hi@demo.rover"),
            ],
        )
        .page(
            "https://demo.rover/about",
            vec![nav_link("Team", "https://demo.rover/team")],
        )
        .page(
            "https://demo.rover/team",
            vec![nav_link("Back home", "https://demo.rover/home")],
        )
        .page(
            "https://demo.rover/pricing",
            vec![nav_link("Home", "https://demo.rover/home")],
        )
}
