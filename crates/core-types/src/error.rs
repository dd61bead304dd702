use thiserror::Error;

/// Errors shared by the webrover crates.
///
/// The taxonomy matters more than the payload: `Decision { fatal: true }`
/// marks a known-unrecoverable decision-service failure that triggers the
/// global pause/stop escalation; every other variant is contained at the
/// failing agent's tick boundary.
#[derive(Debug, Error, Clone)]
pub enum RoverError {
    /// Browser session failure (start, screenshot, element extraction).
    #[error("session error: {0}")]
    Session(String),

    /// Navigation to a URL failed or timed out.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The external decision service (thinker) failed.
    #[error("decision service error: {message}")]
    Decision { message: String, fatal: bool },

    /// Executing an action against a page element failed.
    #[error("action failed: {0}")]
    Action(String),

    /// A declared dependency agent was not found in the registry.
    #[error("agent not registered: {0}")]
    MissingAgent(String),

    /// The addressed agent does not accept page-task handoffs.
    #[error("agent {0} does not accept handoffs")]
    HandoffUnsupported(String),

    /// A URL could not be parsed or resolved.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Internal(String),
}

impl RoverError {
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }

    pub fn navigation(message: impl Into<String>) -> Self {
        Self::Navigation(message.into())
    }

    /// A recoverable decision-service failure.
    pub fn decision(message: impl Into<String>) -> Self {
        Self::Decision {
            message: message.into(),
            fatal: false,
        }
    }

    /// A decision-service failure from the known-unrecoverable list
    /// (auth, quota, network, configuration).
    pub fn decision_fatal(message: impl Into<String>) -> Self {
        Self::Decision {
            message: message.into(),
            fatal: true,
        }
    }

    pub fn action(message: impl Into<String>) -> Self {
        Self::Action(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for failures that must escalate to the global pause/stop path.
    pub fn is_fatal_decision(&self) -> bool {
        matches!(self, Self::Decision { fatal: true, .. })
    }
}
