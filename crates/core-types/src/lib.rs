//! Shared primitives for the webrover crawling agents.
//!
//! Everything that crosses a crate boundary lives here: the common error
//! type, the agent state enum, the event wire format, and the payload
//! types exchanged with the external collaborators (session, thinker,
//! action executor).

pub mod error;
pub mod event;
pub mod model;
pub mod state;

pub use error::RoverError;
pub use event::{Event, EventKind};
pub use model::{
    ActionOutcome, GoalMetrics, GoalThresholds, InteractiveElement, LinkInfo, Navigation,
    PageAnalysis, PageTask, ThinkAction, ThinkContext, ThinkDecision, ALL_DONE_STEP, DONE_STEP,
    ERROR_STEP,
};
pub use state::AgentState;
