//! Goal-directed runs: convergence, stall recovery, and the round budget.

use std::sync::Arc;

use parking_lot::Mutex;

use webrover::agents::{GoalAgent, GOAL_NAME};
use webrover::testkit::{demo_site, QueueThinker, ScriptedSession, SiteExecutor, StaticEvaluator};
use webrover::types::{
    AgentState, Event, EventKind, GoalMetrics, PageTask, ThinkAction, ThinkDecision,
};
use webrover::{canonicalize, Agent, EventBus, GoalConfig, Session};

fn metrics(value: f32) -> GoalMetrics {
    GoalMetrics {
        goal_similarity: value,
        intent_confidence: value,
        overall: value,
    }
}

struct Rig {
    agent: GoalAgent,
    session: Arc<ScriptedSession>,
    bus: Arc<EventBus>,
    thinker: Arc<QueueThinker>,
}

async fn rig(
    decisions: Vec<ThinkDecision>,
    scores: Vec<GoalMetrics>,
    config: GoalConfig,
) -> Rig {
    let bus = EventBus::new(1024);
    let session = ScriptedSession::new(demo_site());
    session.start("https://demo.rover/home").await.unwrap();
    let thinker = QueueThinker::new(decisions);
    let agent = GoalAgent::new(
        GOAL_NAME,
        bus.clone(),
        session.clone(),
        thinker.clone(),
        SiteExecutor::new(session.clone()),
        StaticEvaluator::new(scores),
        config,
    );
    Rig {
        agent,
        session,
        bus,
        thinker,
    }
}

fn handoff(goal: &str) -> PageTask {
    PageTask {
        url: canonicalize("https://demo.rover/home"),
        goal: Some(goal.into()),
        links: Vec::new(),
    }
}

#[tokio::test]
async fn improving_run_achieves_the_goal() {
    let mut rig = rig(
        vec![
            ThinkDecision::action(ThinkAction::step(
                "open pricing",
                "opened the pricing page",
            )),
            ThinkDecision::action(ThinkAction::done("pricing page reached")),
        ],
        vec![metrics(0.5), metrics(0.9)],
        GoalConfig::default(),
    )
    .await;

    rig.agent.enqueue(handoff("find the pricing page")).unwrap();
    for _ in 0..30 {
        if rig.agent.is_done() {
            break;
        }
        rig.agent.tick().await.unwrap();
    }

    assert!(rig.agent.is_done());
    assert!(
        rig.agent.achieved(),
        "claimed done plus clearing metrics counts as achievement"
    );
    // Two planning rounds, one executed action in between.
    assert_eq!(rig.thinker.contexts().len(), 2);
}

#[tokio::test]
async fn stalled_run_resets_position_and_warns() {
    let mut rig = rig(
        vec![
            ThinkDecision::action(ThinkAction::step("poke around", "poked the menu")),
            ThinkDecision::action(ThinkAction::step("poke again", "poked the footer")),
        ],
        // Second round gains 0.02, below the 0.05 epsilon.
        vec![metrics(0.40), metrics(0.42)],
        GoalConfig::default(),
    )
    .await;

    let warnings = Arc::new(Mutex::new(Vec::new()));
    let sink = warnings.clone();
    rig.bus.on(EventKind::ValidatorWarning, move |event| {
        sink.lock().push(event.clone());
        Ok(())
    });

    rig.agent.enqueue(handoff("find the pricing page")).unwrap();
    // Wander off the origin page; a stall must bring the browser back.
    rig.session
        .navigate("https://demo.rover/about", webrover::WaitPolicy::Load)
        .await
        .unwrap();

    for _ in 0..30 {
        if !warnings.lock().is_empty() {
            break;
        }
        rig.agent.tick().await.unwrap();
    }

    let warnings = warnings.lock();
    assert_eq!(warnings.len(), 1);
    match &warnings[0] {
        Event::ValidatorWarning { agent, message } => {
            assert_eq!(agent.as_deref(), Some(GOAL_NAME));
            assert!(message.contains("progress stalled"));
        }
        other => panic!("unexpected event {other:?}"),
    }

    // The warning handler rewound planning, and the browser is back at
    // the origin page.
    assert_eq!(rig.agent.state(), AgentState::Plan);
    assert_eq!(
        rig.session.current_url().await.unwrap(),
        canonicalize("https://demo.rover/home")
    );
}

#[tokio::test]
async fn validation_round_budget_gives_up() {
    let mut rig = rig(
        vec![
            ThinkDecision::action(ThinkAction::step("step one", "did step one")),
            ThinkDecision::action(ThinkAction::step("step two", "did step two")),
            ThinkDecision::action(ThinkAction::step("step three", "did step three")),
        ],
        vec![metrics(0.3)],
        GoalConfig {
            max_validation_rounds: 2,
            ..GoalConfig::default()
        },
    )
    .await;

    rig.agent.enqueue(handoff("an impossible goal")).unwrap();
    for _ in 0..40 {
        if rig.agent.is_done() {
            break;
        }
        rig.agent.tick().await.unwrap();
    }

    assert!(rig.agent.is_done());
    assert!(!rig.agent.achieved(), "giving up is not achievement");
}
