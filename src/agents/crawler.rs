//! The crawler agent: depth-first traversal with explicit backtracking.
//!
//! `Start → Evaluate → Visit → Wait → Act → (Start | Done | Error)`.
//! Page exploration itself is delegated: the crawler registers pages,
//! hands the unvisited-link queue to a per-page delegate, polls for its
//! completion, then consumes the delegate's chosen next link to advance
//! or backtracks through the navigation stack.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use webrover_agent_fsm::{Agent, AgentHandle, AgentRegistry, FsmCore};
use webrover_core_types::{AgentState, Event, PageTask, RoverError};
use webrover_event_bus::EventBus;
use webrover_page_memory::{canonicalize, PageDetails, PageMemory};

use crate::agents::{ANALYZER_NAME, CLICKER_NAME};
use crate::config::CrawlConfig;
use crate::links::links_from_elements;
use crate::session::{Session, WaitPolicy};

pub struct Crawler {
    core: FsmCore,
    session: Arc<dyn Session>,
    memory: Arc<PageMemory>,
    registry: Arc<AgentRegistry>,
    config: CrawlConfig,
    current_url: String,
    /// Page the last advance left, consumed as the parent of the next
    /// newly discovered page.
    referrer: Option<String>,
    /// Delegate currently being polled during `Wait`/`Act`.
    waiting_on: Option<AgentHandle>,
}

impl Crawler {
    pub fn new(
        name: impl Into<String>,
        bus: Arc<EventBus>,
        session: Arc<dyn Session>,
        memory: Arc<PageMemory>,
        registry: Arc<AgentRegistry>,
        config: CrawlConfig,
    ) -> Self {
        // The crawler runs immediately; a warning rewinds it to a fresh
        // page evaluation.
        let core = FsmCore::new(name, bus, AgentState::Start, AgentState::Evaluate);
        Self {
            core,
            session,
            memory,
            registry,
            config,
            current_url: String::new(),
            referrer: None,
            waiting_on: None,
        }
    }

    /// Register the page under the driver's current URL if it is new.
    /// The first discovery fixes the page's parent and depth.
    async fn on_start(&mut self) -> Result<(), RoverError> {
        let raw_url = self.session.current_url().await?;
        let canonical = canonicalize(&raw_url);
        let referrer = self.referrer.take();

        if !self.memory.page_exists(&canonical) {
            let elements = self.session.extract_interactive_elements().await?;
            let links = links_from_elements(&raw_url, elements);
            debug!(url = %canonical, links = links.len(), "discovered page");

            let mut details = PageDetails::new(&raw_url);
            match referrer {
                Some(parent) => {
                    let depth = self
                        .memory
                        .get_page(&parent)
                        .and_then(|page| page.depth)
                        .unwrap_or(0)
                        + 1;
                    details = details.with_parent(parent, depth);
                }
                // The crawl root.
                None => details.depth = Some(0),
            }
            self.memory.add_page_with_links(details, links);
            self.core.bus().emit(Event::NewPageVisited {
                url: canonical.clone(),
                title: None,
            });
        }

        self.current_url = canonical;
        self.core.set_state(AgentState::Evaluate);
        Ok(())
    }

    /// Decide whether to go deeper, backtrack, or finish.
    async fn on_evaluate(&mut self) -> Result<(), RoverError> {
        if self.memory.is_fully_explored(&self.current_url) {
            self.backtrack_or_finish().await?;
        } else {
            self.core.set_state(AgentState::Visit);
        }
        Ok(())
    }

    /// Hand the unvisited-link queue to the appropriate delegate.
    async fn on_visit(&mut self) -> Result<(), RoverError> {
        let unvisited = self.memory.unvisited_links(&self.current_url);
        let page_visited = self
            .memory
            .get_page(&self.current_url)
            .map(|page| page.visited)
            .unwrap_or(false);

        if !page_visited {
            self.memory.mark_page_visited(&self.current_url);
            for link in &unvisited {
                let to = link.href.clone().unwrap_or_else(|| link.selector.clone());
                self.memory
                    .record_edge(&self.current_url, &to, &link.description);
            }
        }

        let delegate_name = if page_visited {
            CLICKER_NAME
        } else {
            ANALYZER_NAME
        };
        let delegate = self.registry.require(delegate_name)?;
        delegate.lock().await.enqueue(PageTask {
            url: self.current_url.clone(),
            goal: Some(self.config.default_goal.clone()),
            links: unvisited,
        })?;
        debug!(url = %self.current_url, delegate = delegate_name, "page handed off");

        self.waiting_on = Some(delegate);
        self.core.set_state(AgentState::Wait);
        Ok(())
    }

    /// Poll the delegate; this is deliberately a polling handoff so the
    /// single-tick contract (and with it stop interruptibility) holds.
    async fn on_wait(&mut self) -> Result<(), RoverError> {
        let Some(delegate) = &self.waiting_on else {
            return Err(RoverError::internal("wait state without a delegate"));
        };
        if delegate.lock().await.is_done() {
            self.core.set_state(AgentState::Act);
        }
        Ok(())
    }

    /// Consume the delegate's outcome: advance into the chosen link or
    /// backtrack on a dead end.
    async fn on_act(&mut self) -> Result<(), RoverError> {
        let Some(delegate) = self.waiting_on.take() else {
            return Err(RoverError::internal("act state without a delegate"));
        };
        let next_link = delegate.lock().await.take_next_link();

        match next_link {
            Some(link) => {
                self.memory
                    .mark_link_visited(&self.current_url, &link.visit_key());
                self.memory.push_stack(&self.current_url);

                // The action may have landed somewhere other than the
                // nominal target; trust the browser, not the link.
                let landed = canonicalize(&self.session.current_url().await?);
                self.memory
                    .record_edge(&self.current_url, &landed, &link.description);
                debug!(from = %self.current_url, to = %landed, "advancing");
                self.referrer = Some(self.current_url.clone());
                self.current_url = landed;
                self.core.set_state(AgentState::Start);
            }
            // A delegate reporting done with nothing left is a dead end,
            // never an error.
            None => self.backtrack_or_finish().await?,
        }
        Ok(())
    }

    async fn backtrack_or_finish(&mut self) -> Result<(), RoverError> {
        match self.memory.pop_stack() {
            Some(previous) => {
                debug!(to = %previous, "backtracking");
                self.session.navigate(&previous, WaitPolicy::Load).await?;
                self.current_url = previous;
                self.core.set_state(AgentState::Start);
            }
            None => {
                info!("traversal complete, navigation stack empty");
                self.core.set_state(AgentState::Done);
                self.core.bus().emit(Event::Done {
                    agent: self.core.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Agent for Crawler {
    fn core(&self) -> &FsmCore {
        &self.core
    }

    async fn tick(&mut self) -> Result<(), RoverError> {
        match self.core.state() {
            AgentState::Start => self.on_start().await,
            AgentState::Evaluate => self.on_evaluate().await,
            AgentState::Visit => self.on_visit().await,
            AgentState::Wait => self.on_wait().await,
            AgentState::Act => self.on_act().await,
            // Terminal or parked; driver normally filters these out.
            _ => Ok(()),
        }
    }
}

// Integration coverage for the crawler lives in tests/crawl_flow.rs,
// where the scripted session and delegates drive full traversals.
