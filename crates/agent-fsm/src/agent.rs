use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use webrover_core_types::{AgentState, LinkInfo, PageTask, RoverError};

use crate::core::FsmCore;

/// The common agent contract.
///
/// `tick` performs at most one state transition's worth of work and
/// returns; the driver owns the loop. Errors returned from `tick` are
/// caught at the driver boundary and converted into the `Error` state —
/// they never unwind further.
#[async_trait]
pub trait Agent: Send {
    fn core(&self) -> &FsmCore;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn state(&self) -> AgentState {
        self.core().state()
    }

    /// `state ∈ {Done, Error}`.
    fn is_done(&self) -> bool {
        self.core().is_done()
    }

    async fn tick(&mut self) -> Result<(), RoverError>;

    /// Hand a page's worth of work to this agent. Only delegate agents
    /// accept handoffs; the default refuses.
    fn enqueue(&mut self, _task: PageTask) -> Result<(), RoverError> {
        Err(RoverError::HandoffUnsupported(self.name().to_string()))
    }

    /// The next link chosen during the delegate's run, consumed by the
    /// agent that enqueued the work. `None` means dead end.
    fn take_next_link(&mut self) -> Option<LinkInfo> {
        None
    }
}

impl std::fmt::Debug for dyn Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent").field("name", &self.name()).finish()
    }
}

/// Shared handle the registry hands around. The async mutex lets one
/// agent poll another mid-tick without assuming anything about layout.
pub type AgentHandle = Arc<Mutex<dyn Agent>>;

pub fn handle(agent: impl Agent + 'static) -> AgentHandle {
    Arc::new(Mutex::new(agent))
}
