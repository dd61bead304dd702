//! Decision-service contracts.

use std::path::Path;

use async_trait::async_trait;

use webrover_core_types::{GoalMetrics, RoverError, ThinkContext, ThinkDecision};

/// The external black-box decision function: given textual context and an
/// optional screenshot, choose the next interaction.
#[async_trait]
pub trait Thinker: Send + Sync {
    async fn think(
        &self,
        context: &ThinkContext,
        screenshot: Option<&Path>,
    ) -> Result<ThinkDecision, RoverError>;

    /// One-shot liveness check used by the fatal-failure escalation path.
    async fn health_check(&self) -> Result<(), RoverError>;
}

/// Embedding/classification collaborator that scores goal convergence.
#[async_trait]
pub trait GoalEvaluator: Send + Sync {
    async fn evaluate(&self, goal: &str, progress: &[String]) -> Result<GoalMetrics, RoverError>;
}
