//! webrover — multi-agent exhaustive site crawler.
//!
//! A set of cooperating FSM agents performs a depth-first, stateful
//! crawl of a website: the crawler discovers pages and backtracks
//! through a navigation trail, per-page delegates exercise each page's
//! interactive elements, and an optional goal-directed agent pursues a
//! free-form mission instead of exhaustive coverage. Browser driving and
//! LLM decisions are external collaborators behind the [`session`],
//! [`thinker`] and [`actions`] traits.

pub mod actions;
pub mod agents;
pub mod cli;
pub mod config;
pub mod escalate;
pub mod links;
pub mod resolve;
pub mod session;
pub mod summary;
pub mod testkit;
pub mod thinker;

pub use actions::ActionExecutor;
pub use config::{CrawlConfig, GoalConfig};
pub use session::{Session, WaitPolicy};
pub use summary::RunSummary;
pub use thinker::{GoalEvaluator, Thinker};

pub use webrover_agent_fsm::{handle, Agent, AgentHandle, AgentRegistry, Driver, FsmCore};
pub use webrover_core_types as types;
pub use webrover_event_bus::EventBus;
pub use webrover_page_memory::{canonicalize, PageDetails, PageMemory};
