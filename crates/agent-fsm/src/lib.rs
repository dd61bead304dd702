//! Agent FSM base, registry and cooperative driver.
//!
//! Every agent shares one lifecycle contract: a single mutating `tick`
//! that performs at most one state transition's worth of work, a
//! `set_state` that always emits a `state_transition` event, and two
//! standing bus subscriptions (validator-warning rewind, unconditional
//! stop). The driver ticks every not-done agent once per round; there is
//! no other scheduling primitive.

pub mod agent;
pub mod core;
pub mod driver;
pub mod registry;

pub use agent::{handle, Agent, AgentHandle};
pub use core::FsmCore;
pub use driver::{Driver, DriverReport};
pub use registry::AgentRegistry;
