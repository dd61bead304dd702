use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle states shared by every agent.
///
/// Each concrete agent declares its own transition subset; the full set
/// exists so the wire format stays stable across agent variants.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Start,
    Observe,
    Decide,
    Act,
    Visit,
    Evaluate,
    Wait,
    Validate,
    Plan,
    Pause,
    Resume,
    Done,
    Error,
}

impl AgentState {
    /// Terminal states: the driver stops ticking an agent once reached.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Observe => "observe",
            Self::Decide => "decide",
            Self::Act => "act",
            Self::Visit => "visit",
            Self::Evaluate => "evaluate",
            Self::Wait => "wait",
            Self::Validate => "validate",
            Self::Plan => "plan",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(AgentState::Done.is_terminal());
        assert!(AgentState::Error.is_terminal());
        assert!(!AgentState::Wait.is_terminal());
        assert!(!AgentState::Pause.is_terminal());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&AgentState::Evaluate).unwrap();
        assert_eq!(json, "\"evaluate\"");
    }
}
