//! Per-page delegate agent.
//!
//! `Start → Observe → Decide → Act → (Observe | Done | Error)`.
//! Observes the page, asks the thinker for the next interaction,
//! resolves the chosen label back to a concrete element and executes it.
//! An unresolvable label emits a `validator_warning`; the base handler
//! rewinds the agent to `Observe` with the warning injected as feedback
//! for the next decision.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use webrover_agent_fsm::{Agent, FsmCore};
use webrover_core_types::{
    AgentState, Event, LinkInfo, Navigation, PageTask, RoverError, ThinkAction, ThinkContext,
    ThinkDecision,
};
use webrover_event_bus::EventBus;
use webrover_page_memory::{ElementTestResult, PageMemory};

use crate::actions::ActionExecutor;
use crate::config::CrawlConfig;
use crate::escalate::escalate_decision_failure;
use crate::resolve::resolve;
use crate::session::Session;
use crate::thinker::Thinker;

/// How thoroughly a page visit is handled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnalyzerMode {
    /// First visit: screenshots and analysis recorded into the page.
    Thorough,
    /// Revisit: fast click-through, no analysis capture.
    Quick,
}

pub struct Analyzer {
    core: FsmCore,
    session: Arc<dyn Session>,
    thinker: Arc<dyn Thinker>,
    executor: Arc<dyn ActionExecutor>,
    memory: Arc<PageMemory>,
    config: CrawlConfig,
    mode: AnalyzerMode,

    // Per-invocation working state, reset on every enqueue.
    queue: Vec<LinkInfo>,
    task_url: String,
    goal: String,
    steps: u32,
    last_action: Option<String>,
    pending: Option<ThinkDecision>,
    screenshot: Option<PathBuf>,
    next_link: Option<LinkInfo>,
}

impl Analyzer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        bus: Arc<EventBus>,
        session: Arc<dyn Session>,
        thinker: Arc<dyn Thinker>,
        executor: Arc<dyn ActionExecutor>,
        memory: Arc<PageMemory>,
        config: CrawlConfig,
        mode: AnalyzerMode,
    ) -> Self {
        // Delegates wait to be triggered; warnings rewind to Observe.
        let core = FsmCore::new(name, bus, AgentState::Wait, AgentState::Observe);
        Self {
            core,
            session,
            thinker,
            executor,
            memory,
            config,
            mode,
            queue: Vec::new(),
            task_url: String::new(),
            goal: String::new(),
            steps: 0,
            last_action: None,
            pending: None,
            screenshot: None,
            next_link: None,
        }
    }

    fn finish(&mut self) {
        self.core.set_state(AgentState::Done);
        self.core.bus().emit(Event::Done {
            agent: self.core.name().to_string(),
        });
    }

    fn on_start(&mut self) {
        self.steps = 0;
        self.next_link = None;
        self.pending = None;
        self.screenshot = None;
        if self.queue.is_empty() {
            self.finish();
        } else {
            self.core.set_state(AgentState::Observe);
        }
    }

    async fn on_observe(&mut self) -> Result<(), RoverError> {
        if self.mode == AnalyzerMode::Quick {
            // Click-through mode never looks at pixels.
            self.core.set_state(AgentState::Decide);
            return Ok(());
        }

        // Reuse a cached screenshot for already-visited pages while the
        // artifact still exists on disk.
        if let Some(page) = self.memory.get_page(&self.task_url) {
            if page.visited {
                if let Some(path) = page.screenshot {
                    if path.exists() {
                        self.screenshot = Some(path);
                        self.core.set_state(AgentState::Decide);
                        return Ok(());
                    }
                }
            }
        }

        let name = format!("{}-{}", self.core.name(), self.steps);
        let shot = self
            .session
            .take_screenshot(&self.config.screenshot_dir, &name)
            .await?;
        if let Some(path) = shot {
            self.memory.set_screenshot(&self.task_url, path.clone());
            self.core.bus().emit(Event::ScreenshotTaken {
                agent: self.core.name().to_string(),
                path: path.display().to_string(),
            });
            self.screenshot = Some(path);
        }
        self.core.set_state(AgentState::Decide);
        Ok(())
    }

    async fn on_decide(&mut self) -> Result<(), RoverError> {
        let context = ThinkContext {
            goal: self.goal.clone(),
            last_action: self.last_action.clone(),
            memory: None,
            possible_labels: self.queue.iter().map(|l| l.description.clone()).collect(),
            feedback: self.core.take_feedback(),
        };

        match self.thinker.think(&context, self.screenshot.as_deref()).await {
            Ok(decision) => {
                if self.mode == AnalyzerMode::Thorough {
                    if let Some(analysis) = &decision.analysis {
                        self.memory.set_analysis(&self.task_url, analysis.clone());
                    }
                }
                self.pending = Some(decision);
                self.core.set_state(AgentState::Act);
                Ok(())
            }
            Err(err) => {
                escalate_decision_failure(self.core.bus(), &self.thinker, &err).await;
                Err(err)
            }
        }
    }

    async fn on_act(&mut self) -> Result<(), RoverError> {
        let Some(decision) = self.pending.take() else {
            // A warning rewound us between Decide and Act; observe again.
            self.core.set_state(AgentState::Observe);
            return Ok(());
        };
        let action = decision.action;

        if action.is_error() {
            warn!(reason = %action.reason, "thinker could not produce a decision");
            self.core.bus().emit(Event::ValidatorWarning {
                agent: Some(self.core.name().to_string()),
                message: format!(
                    "decision failed: {}; choose one of the listed labels or report done",
                    action.reason
                ),
            });
            return Ok(());
        }

        if action.is_done() {
            // Page task complete. A next-link hint is only reported
            // upward after the navigation actually happened: the
            // enqueuing agent reads `next_link` as "the browser has
            // already moved there". An unresolvable hint or a failed
            // follow degrades to a plain dead end.
            if let Some(hint) = &action.next_link {
                if let Some(link) = resolve(&self.queue, hint, &[]).cloned() {
                    self.next_link = self.follow_hint(link, &action).await?;
                }
            }
            self.finish();
            return Ok(());
        }

        if action.is_all_done() {
            self.memory.mark_all_links_visited(&self.task_url);
            self.queue.clear();
            self.next_link = None;
            self.finish();
            return Ok(());
        }

        let Some(link) = resolve(&self.queue, &action.step, &action.args).cloned() else {
            warn!(step = %action.step, "no element matches the chosen label");
            // The base handler rewinds us to Observe with this text as
            // feedback; state is not advanced here.
            self.core.bus().emit(Event::ValidatorWarning {
                agent: Some(self.core.name().to_string()),
                message: format!(
                    "no interactive element matches '{}'; choose one of the listed labels",
                    action.step
                ),
            });
            return Ok(());
        };

        self.core.bus().emit(Event::ActionStarted {
            agent: self.core.name().to_string(),
            step: action.step.clone(),
            target: Some(link.description.clone()),
        });

        let outcome = self
            .executor
            .execute_action(&action, Some(&link), AgentState::Act.as_str())
            .await?;

        self.core.bus().emit(Event::ActionFinished {
            agent: self.core.name().to_string(),
            step: action.step.clone(),
            success: outcome.success,
        });

        self.memory.record_test_result(
            &self.task_url,
            ElementTestResult {
                label: link.description.clone(),
                action_taken: outcome.action_taken.clone(),
                success: outcome.success,
            },
        );

        self.steps += 1;
        self.last_action = Some(outcome.action_taken.clone());
        let key = link.visit_key();
        self.queue.retain(|queued| queued.visit_key() != key);

        if !outcome.success {
            debug!(step = %action.step, "action failed, continuing with the rest of the page");
            self.core.set_state(AgentState::Observe);
            return Ok(());
        }

        match outcome.navigation {
            // An internal navigation is the chosen next link; the
            // enqueuing agent consumes it and marks it visited.
            Navigation::Internal => {
                self.next_link = Some(link);
                self.finish();
            }
            Navigation::External | Navigation::None => {
                // Tested in place (or off-site and restored); the link is
                // exhausted here and now.
                self.memory.mark_link_visited(&self.task_url, &key);
                if self.queue.is_empty() || self.steps >= self.config.max_steps_per_page {
                    self.next_link = None;
                    self.finish();
                } else {
                    self.core.set_state(AgentState::Observe);
                }
            }
        }
        Ok(())
    }

    /// Execute the navigation a `done` hint names. Only a successful
    /// internal navigation is worth handing upward as the next hop; a
    /// failed or in-place outcome leaves the link for a later revisit.
    async fn follow_hint(
        &mut self,
        link: LinkInfo,
        done: &ThinkAction,
    ) -> Result<Option<LinkInfo>, RoverError> {
        let follow = ThinkAction::step(link.description.clone(), done.reason.clone());

        self.core.bus().emit(Event::ActionStarted {
            agent: self.core.name().to_string(),
            step: follow.step.clone(),
            target: Some(link.description.clone()),
        });
        let outcome = self
            .executor
            .execute_action(&follow, Some(&link), AgentState::Act.as_str())
            .await?;
        self.core.bus().emit(Event::ActionFinished {
            agent: self.core.name().to_string(),
            step: follow.step.clone(),
            success: outcome.success,
        });

        self.memory.record_test_result(
            &self.task_url,
            ElementTestResult {
                label: link.description.clone(),
                action_taken: outcome.action_taken.clone(),
                success: outcome.success,
            },
        );

        if !outcome.success {
            debug!(step = %follow.step, "hinted navigation failed, reporting a dead end");
            return Ok(None);
        }
        match outcome.navigation {
            Navigation::Internal => Ok(Some(link)),
            Navigation::External | Navigation::None => {
                self.memory.mark_link_visited(&self.task_url, &link.visit_key());
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Agent for Analyzer {
    fn core(&self) -> &FsmCore {
        &self.core
    }

    async fn tick(&mut self) -> Result<(), RoverError> {
        match self.core.state() {
            AgentState::Start => {
                self.on_start();
                Ok(())
            }
            AgentState::Observe => self.on_observe().await,
            AgentState::Decide => self.on_decide().await,
            AgentState::Act => self.on_act().await,
            _ => Ok(()),
        }
    }

    fn enqueue(&mut self, task: PageTask) -> Result<(), RoverError> {
        self.task_url = task.url;
        self.goal = task
            .goal
            .unwrap_or_else(|| self.config.default_goal.clone());
        self.queue = task.links;
        self.steps = 0;
        self.last_action = None;
        self.pending = None;
        self.next_link = None;
        self.core.set_state(AgentState::Start);
        Ok(())
    }

    fn take_next_link(&mut self) -> Option<LinkInfo> {
        self.next_link.take()
    }
}
