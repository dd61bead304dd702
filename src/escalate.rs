//! Session-fatal failure escalation.
//!
//! A fixed list of decision-service failures (auth, quota, network,
//! configuration) is known to be unrecoverable for a single agent. When
//! one surfaces, every agent is paused, the decision service gets one
//! health re-check, and if that fails a stop broadcast kills the crawl.

use std::sync::Arc;

use tracing::{error, info, warn};

use webrover_core_types::RoverError;
use webrover_event_bus::EventBus;

use crate::thinker::Thinker;

/// Handle a decision-service error. Non-fatal errors pass straight
/// through; fatal ones run the pause → health-check → stop/resume path
/// before the caller's own error handling continues.
pub async fn escalate_decision_failure(
    bus: &Arc<EventBus>,
    thinker: &Arc<dyn Thinker>,
    err: &RoverError,
) {
    if !err.is_fatal_decision() {
        return;
    }

    warn!(error = %err, "fatal decision-service failure, pausing all agents");
    bus.pause_all();

    match thinker.health_check().await {
        Ok(()) => {
            info!("decision service recovered, resuming agents");
            bus.resume_all();
        }
        Err(check_err) => {
            error!(error = %check_err, "decision service health check failed, stopping crawl");
            bus.stop(format!("decision service unavailable: {check_err}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use webrover_core_types::{Event, EventKind, ThinkContext, ThinkDecision};

    struct SickThinker {
        healthy: bool,
    }

    #[async_trait]
    impl Thinker for SickThinker {
        async fn think(
            &self,
            _context: &ThinkContext,
            _screenshot: Option<&Path>,
        ) -> Result<ThinkDecision, RoverError> {
            Err(RoverError::decision_fatal("quota exhausted"))
        }

        async fn health_check(&self) -> Result<(), RoverError> {
            if self.healthy {
                Ok(())
            } else {
                Err(RoverError::decision_fatal("still down"))
            }
        }
    }

    #[tokio::test]
    async fn recovered_service_resumes() {
        let bus = EventBus::new(16);
        let thinker: Arc<dyn Thinker> = Arc::new(SickThinker { healthy: true });
        let mut tap = bus.tap();

        escalate_decision_failure(&bus, &thinker, &RoverError::decision_fatal("quota")).await;

        assert_eq!(tap.recv().await.unwrap(), Event::PauseAll);
        assert_eq!(tap.recv().await.unwrap(), Event::ResumeAll);
    }

    #[tokio::test]
    async fn dead_service_stops_crawl() {
        let bus = EventBus::new(16);
        let thinker: Arc<dyn Thinker> = Arc::new(SickThinker { healthy: false });
        let mut tap = bus.tap();

        escalate_decision_failure(&bus, &thinker, &RoverError::decision_fatal("auth")).await;

        assert_eq!(tap.recv().await.unwrap(), Event::PauseAll);
        assert_eq!(tap.recv().await.unwrap().kind(), EventKind::Stop);
    }

    #[tokio::test]
    async fn non_fatal_errors_do_not_escalate() {
        let bus = EventBus::new(16);
        let thinker: Arc<dyn Thinker> = Arc::new(SickThinker { healthy: true });
        let mut tap = bus.tap();

        escalate_decision_failure(&bus, &thinker, &RoverError::decision("garbled reply")).await;

        assert!(tap.try_recv().is_err());
    }
}
