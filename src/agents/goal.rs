//! Goal-directed delegate agent.
//!
//! `Plan → Act → Wait → Validate → (Decide→Plan | Done | Plan-with-warning)`.
//! Instead of exhaustive coverage, pursues a free-form goal with a
//! plan→act→validate loop. Convergence is judged by an external
//! embedding/classification evaluator against fixed thresholds; the goal
//! counts as achieved only when the planner self-reports achievement and
//! every metric clears its threshold in the same round. Stalled progress
//! resets the page position and retries the plan with a warning naming
//! the metrics that fell short.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use webrover_agent_fsm::{Agent, FsmCore};
use webrover_core_types::{
    AgentState, Event, GoalMetrics, PageTask, RoverError, ThinkAction, ThinkContext,
};
use webrover_event_bus::EventBus;

use crate::actions::ActionExecutor;
use crate::config::GoalConfig;
use crate::escalate::escalate_decision_failure;
use crate::session::{Session, WaitPolicy};
use crate::thinker::{GoalEvaluator, Thinker};

pub struct GoalAgent {
    core: FsmCore,
    session: Arc<dyn Session>,
    thinker: Arc<dyn Thinker>,
    executor: Arc<dyn ActionExecutor>,
    evaluator: Arc<dyn GoalEvaluator>,
    config: GoalConfig,

    goal: String,
    /// Page to reset to when progress stalls.
    origin_url: Option<String>,
    progress: Vec<String>,
    pending: Option<ThinkAction>,
    proposed_goal: Option<String>,
    last_metrics: Option<GoalMetrics>,
    /// The planner self-reported achievement this round.
    claimed: bool,
    rounds: u32,
}

impl GoalAgent {
    pub fn new(
        name: impl Into<String>,
        bus: Arc<EventBus>,
        session: Arc<dyn Session>,
        thinker: Arc<dyn Thinker>,
        executor: Arc<dyn ActionExecutor>,
        evaluator: Arc<dyn GoalEvaluator>,
        config: GoalConfig,
    ) -> Self {
        // Waits for a handoff; warnings restart planning.
        let core = FsmCore::new(name, bus, AgentState::Wait, AgentState::Plan);
        Self {
            core,
            session,
            thinker,
            executor,
            evaluator,
            config,
            goal: String::new(),
            origin_url: None,
            progress: Vec::new(),
            pending: None,
            proposed_goal: None,
            last_metrics: None,
            claimed: false,
            rounds: 0,
        }
    }

    pub fn achieved(&self) -> bool {
        self.core.state() == AgentState::Done && self.claimed
    }

    async fn on_plan(&mut self) -> Result<(), RoverError> {
        let context = ThinkContext {
            goal: self.goal.clone(),
            last_action: self.progress.last().cloned(),
            memory: Some(self.progress.join("; ")),
            possible_labels: Vec::new(),
            feedback: self.core.take_feedback(),
        };

        match self.thinker.think(&context, None).await {
            Ok(decision) => {
                let action = decision.action;
                self.claimed = action.is_done();
                self.proposed_goal = action.new_goal.clone();
                self.pending = Some(action);
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
        let Some(action) = self.pending.take() else {
            self.core.set_state(AgentState::Plan);
            return Ok(());
        };

        if self.claimed {
            // Nothing to execute; the claim still has to survive
            // validation.
            self.core.set_state(AgentState::Wait);
            return Ok(());
        }

        self.core.bus().emit(Event::ActionStarted {
            agent: self.core.name().to_string(),
            step: action.step.clone(),
            target: None,
        });
        let outcome = self
            .executor
            .execute_action(&action, None, AgentState::Act.as_str())
            .await?;
        self.core.bus().emit(Event::ActionFinished {
            agent: self.core.name().to_string(),
            step: action.step.clone(),
            success: outcome.success,
        });

        self.progress.push(action.reason.clone());
        self.core.set_state(AgentState::Wait);
        Ok(())
    }

    /// One settle round between acting and validating, so the page state
    /// the evaluator sees is post-navigation.
    fn on_wait(&mut self) {
        self.core.set_state(AgentState::Validate);
    }

    async fn on_validate(&mut self) -> Result<(), RoverError> {
        self.rounds += 1;
        let metrics = self.evaluator.evaluate(&self.goal, &self.progress).await?;
        let thresholds = self.config.thresholds();

        if self.claimed && metrics.clears(&thresholds) {
            info!(goal = %self.goal, rounds = self.rounds, "goal achieved");
            self.core.set_state(AgentState::Done);
            self.core.bus().emit(Event::Done {
                agent: self.core.name().to_string(),
            });
            return Ok(());
        }

        if self.rounds >= self.config.max_validation_rounds {
            warn!(
                goal = %self.goal,
                rounds = self.rounds,
                "validation round budget exhausted, giving up on goal"
            );
            self.claimed = false;
            self.core.set_state(AgentState::Done);
            self.core.bus().emit(Event::Done {
                agent: self.core.name().to_string(),
            });
            return Ok(());
        }

        let improving = match &self.last_metrics {
            Some(previous) => metrics.improved_over(previous, self.config.improvement_epsilon),
            None => true,
        };
        self.last_metrics = Some(metrics);

        if improving {
            debug!(?metrics, "progress improving, planning next step");
            self.core.set_state(AgentState::Decide);
        } else {
            // Stall: reset the page position and retry planning with a
            // warning naming the short metrics.
            if let Some(origin) = &self.origin_url {
                self.session.navigate(origin, WaitPolicy::Load).await?;
            }
            let message = shortfall_message(&metrics, &self.config);
            warn!(%message, "goal progress stalled");
            self.core.bus().emit(Event::ValidatorWarning {
                agent: Some(self.core.name().to_string()),
                message,
            });
            // The warning handler moved us back to Plan with feedback.
        }
        Ok(())
    }

    /// Adopt any re-plan hints before the next planning round.
    fn on_decide(&mut self) {
        if let Some(goal) = self.proposed_goal.take() {
            debug!(new_goal = %goal, "adopting refined goal");
            self.goal = goal;
        }
        self.core.set_state(AgentState::Plan);
    }
}

fn shortfall_message(metrics: &GoalMetrics, config: &GoalConfig) -> String {
    let mut short = Vec::new();
    if metrics.goal_similarity < config.similarity_threshold {
        short.push(format!(
            "goal similarity {:.2} < {:.2}",
            metrics.goal_similarity, config.similarity_threshold
        ));
    }
    if metrics.intent_confidence < config.intent_threshold {
        short.push(format!(
            "intent confidence {:.2} < {:.2}",
            metrics.intent_confidence, config.intent_threshold
        ));
    }
    if metrics.overall < config.overall_threshold {
        short.push(format!(
            "overall score {:.2} < {:.2}",
            metrics.overall, config.overall_threshold
        ));
    }
    if short.is_empty() {
        "no metric improved enough to count as progress".to_string()
    } else {
        format!("progress stalled: {}", short.join(", "))
    }
}

#[async_trait]
impl Agent for GoalAgent {
    fn core(&self) -> &FsmCore {
        &self.core
    }

    async fn tick(&mut self) -> Result<(), RoverError> {
        match self.core.state() {
            AgentState::Start | AgentState::Plan => self.on_plan().await,
            AgentState::Act => self.on_act().await,
            AgentState::Wait => {
                // Wait doubles as the idle state before any handoff.
                if self.origin_url.is_some() {
                    self.on_wait();
                }
                Ok(())
            }
            AgentState::Validate => self.on_validate().await,
            AgentState::Decide => {
                self.on_decide();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn enqueue(&mut self, task: PageTask) -> Result<(), RoverError> {
        let Some(goal) = task.goal else {
            return Err(RoverError::internal(
                "goal agent requires an explicit goal in the handoff",
            ));
        };
        self.goal = goal;
        self.origin_url = Some(task.url);
        self.progress.clear();
        self.pending = None;
        self.proposed_goal = None;
        self.last_metrics = None;
        self.claimed = false;
        self.rounds = 0;
        self.core.set_state(AgentState::Plan);
        Ok(())
    }
}
