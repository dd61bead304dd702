//! Run summary emitted after a crawl.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use webrover_agent_fsm::DriverReport;
use webrover_core_types::AgentState;
use webrover_page_memory::PageMemory;

#[derive(Clone, Debug, Serialize)]
pub struct AgentSummary {
    pub name: String,
    pub state: AgentState,
}

/// JSON-serializable outcome of a crawl run.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rounds: u64,
    pub pages_discovered: usize,
    pub pages_visited: usize,
    pub links_total: usize,
    pub links_visited: usize,
    pub edges_recorded: usize,
    /// Leftover backtracking trail; empty means the traversal completed.
    pub stack_remaining: usize,
    pub agents: Vec<AgentSummary>,
}

impl RunSummary {
    pub fn new_run_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn build(
        run_id: String,
        started_at: DateTime<Utc>,
        memory: &PageMemory,
        report: &DriverReport,
    ) -> Self {
        let stats = memory.stats();
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            rounds: report.rounds,
            pages_discovered: stats.pages_discovered,
            pages_visited: stats.pages_visited,
            links_total: stats.links_total,
            links_visited: stats.links_visited,
            edges_recorded: stats.edges_recorded,
            stack_remaining: memory.stack_snapshot().len(),
            agents: report
                .agents
                .iter()
                .map(|status| AgentSummary {
                    name: status.name.clone(),
                    state: status.state,
                })
                .collect(),
        }
    }

    /// The traversal ran to completion: nothing left on the backtracking
    /// trail and no agent stranded in an error state. Idle delegates may
    /// finish parked in `Wait`.
    pub fn completed(&self) -> bool {
        self.stack_remaining == 0
            && self
                .agents
                .iter()
                .all(|agent| agent.state != AgentState::Error)
    }

    /// Human-readable rendering for the CLI's text output.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("run {}\n", self.run_id));
        out.push_str(&format!(
            "  pages: {} discovered, {} visited\n",
            self.pages_discovered, self.pages_visited
        ));
        out.push_str(&format!(
            "  links: {} tested of {}\n",
            self.links_visited, self.links_total
        ));
        out.push_str(&format!(
            "  rounds: {}, stack remaining: {}\n",
            self.rounds, self.stack_remaining
        ));
        for agent in &self.agents {
            out.push_str(&format!("  agent {}: {}\n", agent.name, agent.state));
        }
        out
    }
}
