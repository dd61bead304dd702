//! Action-execution contract.

use async_trait::async_trait;

use webrover_core_types::{ActionOutcome, LinkInfo, RoverError, ThinkAction};

/// Executes one chosen action against the live page.
///
/// `target` is the resolved element when the action maps to a concrete
/// link; free-form goal actions pass `None`. `state_label` names the
/// calling agent's state for telemetry.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute_action(
        &self,
        action: &ThinkAction,
        target: Option<&LinkInfo>,
        state_label: &str,
    ) -> Result<ActionOutcome, RoverError>;
}
