use serde::{Deserialize, Serialize};

use crate::state::AgentState;

/// Closed union of everything that travels on the event bus.
///
/// The serialized form is the wire format consumed by log sinks and UI
/// bridges: a tagged JSON object keyed by `type`. Variants carry only
/// plain data so an event can always cross a process boundary; live
/// resources (page handles, channels) never appear here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    StateTransition {
        agent: String,
        from: AgentState,
        to: AgentState,
    },
    ActionStarted {
        agent: String,
        step: String,
        target: Option<String>,
    },
    ActionFinished {
        agent: String,
        step: String,
        success: bool,
    },
    ScreenshotTaken {
        agent: String,
        path: String,
    },
    NewPageVisited {
        url: String,
        title: Option<String>,
    },
    /// Recoverable-error signal: rewinds the addressed agent (or every
    /// agent, when `agent` is `None`) to its retry state with feedback.
    ValidatorWarning {
        agent: Option<String>,
        message: String,
    },
    Error {
        agent: Option<String>,
        message: String,
    },
    PauseAll,
    ResumeAll,
    /// Global kill switch: every agent's base handler treats this as an
    /// unconditional transition to `Error`.
    Stop {
        reason: String,
    },
    Done {
        agent: String,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StateTransition { .. } => EventKind::StateTransition,
            Self::ActionStarted { .. } => EventKind::ActionStarted,
            Self::ActionFinished { .. } => EventKind::ActionFinished,
            Self::ScreenshotTaken { .. } => EventKind::ScreenshotTaken,
            Self::NewPageVisited { .. } => EventKind::NewPageVisited,
            Self::ValidatorWarning { .. } => EventKind::ValidatorWarning,
            Self::Error { .. } => EventKind::Error,
            Self::PauseAll => EventKind::PauseAll,
            Self::ResumeAll => EventKind::ResumeAll,
            Self::Stop { .. } => EventKind::Stop,
            Self::Done { .. } => EventKind::Done,
        }
    }
}

/// Discriminant used for per-type subscription.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    StateTransition,
    ActionStarted,
    ActionFinished,
    ScreenshotTaken,
    NewPageVisited,
    ValidatorWarning,
    Error,
    PauseAll,
    ResumeAll,
    Stop,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_wire_format() {
        let event = Event::StateTransition {
            agent: "crawler".into(),
            from: AgentState::Start,
            to: AgentState::Evaluate,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_transition");
        assert_eq!(json["from"], "start");
        assert_eq!(json["to"], "evaluate");

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            Event::Stop {
                reason: "fatal".into()
            }
            .kind(),
            EventKind::Stop
        );
        assert_eq!(Event::PauseAll.kind(), EventKind::PauseAll);
    }
}
