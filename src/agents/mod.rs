//! The concrete FSM agents.

pub mod analyzer;
pub mod crawler;
pub mod goal;

pub use analyzer::{Analyzer, AnalyzerMode};
pub use crawler::Crawler;
pub use goal::GoalAgent;

/// Well-known registry names. The crawler declares its delegate
/// dependencies through these instead of holding references.
pub const CRAWLER_NAME: &str = "crawler";
/// First-visit delegate: full analysis.
pub const ANALYZER_NAME: &str = "analyzer";
/// Revisit delegate: fast click-through.
pub const CLICKER_NAME: &str = "clicker";
pub const GOAL_NAME: &str = "goal";
