use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use webrover_core_types::{AgentState, Event, EventKind};
use webrover_event_bus::EventBus;

struct CoreInner {
    state: AgentState,
    /// State to restore after a global pause.
    resume_to: Option<AgentState>,
    /// Warning text injected into the next decision round.
    feedback: Option<String>,
}

/// Shared FSM core embedded by every concrete agent.
///
/// Owns the name, the current state, and the validator feedback slot.
/// `set_state` is the only way state changes and always emits a
/// `state_transition` event, which downstream observers rely on for
/// visibility.
#[derive(Clone)]
pub struct FsmCore {
    name: Arc<str>,
    bus: Arc<EventBus>,
    warning_state: AgentState,
    inner: Arc<Mutex<CoreInner>>,
}

impl FsmCore {
    /// Build the core and install the two standing subscriptions.
    ///
    /// `initial` is `Start` for agents that run immediately and `Wait`
    /// for delegates that sit idle until triggered. `warning_state` is
    /// where a validator warning rewinds this agent (typically
    /// `Observe`).
    pub fn new(
        name: impl Into<String>,
        bus: Arc<EventBus>,
        initial: AgentState,
        warning_state: AgentState,
    ) -> Self {
        let core = Self {
            name: Arc::from(name.into()),
            bus,
            warning_state,
            inner: Arc::new(Mutex::new(CoreInner {
                state: initial,
                resume_to: None,
                feedback: None,
            })),
        };
        core.install_subscriptions();
        core
    }

    fn install_subscriptions(&self) {
        // Validator warning: record the feedback and rewind to the retry
        // state. A finished agent stays finished.
        let this = self.clone();
        self.bus.on(EventKind::ValidatorWarning, move |event| {
            if let Event::ValidatorWarning { agent, message } = event {
                let addressed = agent.is_none() || agent.as_deref() == Some(this.name());
                if addressed && !this.is_done() {
                    this.inner.lock().feedback = Some(message.clone());
                    this.set_state(this.warning_state);
                }
            }
            Ok(())
        });

        // Stop: unconditional kill. Any agent dies on the global stop
        // broadcast, whatever it is doing.
        let this = self.clone();
        self.bus.on(EventKind::Stop, move |_| {
            if this.state() != AgentState::Error {
                this.set_state(AgentState::Error);
            }
            Ok(())
        });

        // Pause/resume broadcast: park a live agent, remembering where to
        // come back to.
        let this = self.clone();
        self.bus.on(EventKind::PauseAll, move |_| {
            let resume_to = {
                let mut inner = this.inner.lock();
                if inner.state.is_terminal() || inner.state == AgentState::Pause {
                    None
                } else {
                    inner.resume_to = Some(inner.state);
                    Some(())
                }
            };
            if resume_to.is_some() {
                this.set_state(AgentState::Pause);
            }
            Ok(())
        });

        let this = self.clone();
        self.bus.on(EventKind::ResumeAll, move |_| {
            let target = {
                let mut inner = this.inner.lock();
                if inner.state == AgentState::Pause {
                    inner.resume_to.take()
                } else {
                    None
                }
            };
            if let Some(state) = target {
                this.set_state(state);
            }
            Ok(())
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn state(&self) -> AgentState {
        self.inner.lock().state
    }

    pub fn is_done(&self) -> bool {
        self.state().is_terminal()
    }

    /// Transition and emit. Never bypass this.
    pub fn set_state(&self, next: AgentState) {
        let from = {
            let mut inner = self.inner.lock();
            let from = inner.state;
            inner.state = next;
            from
        };
        if from != next {
            debug!(agent = %self.name, %from, to = %next, "state transition");
        }
        self.bus.emit(Event::StateTransition {
            agent: self.name.to_string(),
            from,
            to: next,
        });
    }

    /// Consume pending validator feedback, if any.
    pub fn take_feedback(&self) -> Option<String> {
        self.inner.lock().feedback.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core(initial: AgentState) -> (Arc<EventBus>, FsmCore) {
        let bus = EventBus::new(64);
        let core = FsmCore::new("tester", bus.clone(), initial, AgentState::Observe);
        (bus, core)
    }

    #[tokio::test]
    async fn set_state_emits_transition() {
        let (bus, core) = core(AgentState::Start);
        let mut tap = bus.tap();
        core.set_state(AgentState::Evaluate);

        match tap.recv().await.unwrap() {
            Event::StateTransition { agent, from, to } => {
                assert_eq!(agent, "tester");
                assert_eq!(from, AgentState::Start);
                assert_eq!(to, AgentState::Evaluate);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_forces_error() {
        let (bus, core) = core(AgentState::Wait);
        bus.stop("upstream dead");
        assert_eq!(core.state(), AgentState::Error);
    }

    #[tokio::test]
    async fn warning_rewinds_with_feedback() {
        let (bus, core) = core(AgentState::Act);
        bus.emit(Event::ValidatorWarning {
            agent: Some("tester".into()),
            message: "no element matches 'Pricng'".into(),
        });
        assert_eq!(core.state(), AgentState::Observe);
        assert_eq!(
            core.take_feedback().as_deref(),
            Some("no element matches 'Pricng'")
        );
        assert!(core.take_feedback().is_none());
    }

    #[tokio::test]
    async fn warning_for_other_agent_is_ignored() {
        let (bus, core) = core(AgentState::Act);
        bus.emit(Event::ValidatorWarning {
            agent: Some("someone-else".into()),
            message: "not for you".into(),
        });
        assert_eq!(core.state(), AgentState::Act);
        assert!(core.take_feedback().is_none());
    }

    #[tokio::test]
    async fn warning_does_not_resurrect_done_agent() {
        let (bus, core) = core(AgentState::Act);
        core.set_state(AgentState::Done);
        bus.emit(Event::ValidatorWarning {
            agent: None,
            message: "late warning".into(),
        });
        assert_eq!(core.state(), AgentState::Done);
    }

    #[tokio::test]
    async fn pause_and_resume_roundtrip() {
        let (bus, core) = core(AgentState::Decide);
        bus.pause_all();
        assert_eq!(core.state(), AgentState::Pause);
        bus.resume_all();
        assert_eq!(core.state(), AgentState::Decide);
    }

    #[tokio::test]
    async fn pause_skips_terminal_agents() {
        let (bus, core) = core(AgentState::Act);
        core.set_state(AgentState::Done);
        bus.pause_all();
        assert_eq!(core.state(), AgentState::Done);
    }
}
