use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use webrover_core_types::{AgentState, Event};
use webrover_event_bus::EventBus;

use crate::agent::AgentHandle;

/// Terminal snapshot of one agent after a run.
#[derive(Clone, Debug)]
pub struct AgentStatus {
    pub name: String,
    pub state: AgentState,
}

#[derive(Clone, Debug, Default)]
pub struct DriverReport {
    pub rounds: u64,
    pub agents: Vec<AgentStatus>,
}

/// Single-threaded cooperative scheduler.
///
/// Repeatedly ticks every not-yet-done agent, once per agent per round,
/// until all are done. Ticks are awaited sequentially, never run
/// concurrently, so agents may rely on strict interleaving. An error
/// from a tick is absorbed here: the agent transitions to `Error` and
/// its siblings keep running.
struct Entry {
    handle: AgentHandle,
    /// Primary agents must finish for the run to end; workers (on-call
    /// delegates) are ticked but may stay parked in `Wait` forever.
    primary: bool,
}

pub struct Driver {
    bus: Arc<EventBus>,
    agents: Vec<Entry>,
    tick_interval: Duration,
    /// Safety valve against a livelocked round loop; 0 disables it.
    max_rounds: u64,
}

impl Driver {
    pub fn new(bus: Arc<EventBus>, tick_interval: Duration, max_rounds: u64) -> Self {
        Self {
            bus,
            agents: Vec::new(),
            tick_interval,
            max_rounds,
        }
    }

    /// Add an agent whose completion the run waits for.
    pub fn add(&mut self, handle: AgentHandle) {
        self.agents.push(Entry {
            handle,
            primary: true,
        });
    }

    /// Add an on-call delegate: ticked every round, never required to
    /// reach a terminal state on its own.
    pub fn add_worker(&mut self, handle: AgentHandle) {
        self.agents.push(Entry {
            handle,
            primary: false,
        });
    }

    pub async fn run(&self) -> DriverReport {
        let mut rounds = 0u64;
        loop {
            rounds += 1;
            let mut all_done = true;

            for entry in &self.agents {
                let mut agent = entry.handle.lock().await;
                if !agent.is_done() {
                    // Paused agents hold their place until resume_all.
                    if agent.state() != AgentState::Pause {
                        if let Err(err) = agent.tick().await {
                            let name = agent.name().to_string();
                            warn!(agent = %name, error = %err, "tick failed; agent stops participating");
                            agent.core().set_state(AgentState::Error);
                            self.bus.emit(Event::Error {
                                agent: Some(name),
                                message: err.to_string(),
                            });
                        }
                    }
                }
                if entry.primary && !agent.is_done() {
                    all_done = false;
                }
            }

            if all_done {
                break;
            }
            if self.max_rounds > 0 && rounds >= self.max_rounds {
                warn!(rounds, "driver round budget exhausted, broadcasting stop");
                self.bus.stop("driver round budget exhausted");
                break;
            }
            if !self.tick_interval.is_zero() {
                sleep(self.tick_interval).await;
            }
        }

        let mut report = DriverReport {
            rounds,
            agents: Vec::new(),
        };
        for entry in &self.agents {
            let agent = entry.handle.lock().await;
            report.agents.push(AgentStatus {
                name: agent.name().to_string(),
                state: agent.state(),
            });
        }
        info!(rounds = report.rounds, "driver finished");
        report
    }
}
