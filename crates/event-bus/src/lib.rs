//! Typed publish/subscribe channel used for decoupled agent coordination.
//!
//! Subscribers register per event kind. `emit` never fails and never
//! propagates a subscriber error to the emitter: a failing subscriber is
//! logged and surfaced as a nested [`Event::Error`] instead, so a
//! misbehaving observer cannot destabilize the emitting agent. A
//! `broadcast` tap carries every event to external consumers (log sinks,
//! UI bridges, tests) that prefer an async receiver.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::warn;

use webrover_core_types::{Event, EventKind, RoverError};

/// Callback invoked synchronously during `emit`.
pub type Subscriber = Arc<dyn Fn(&Event) -> Result<(), RoverError> + Send + Sync>;

pub struct EventBus {
    subscribers: RwLock<HashMap<EventKind, Vec<Subscriber>>>,
    tap: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(tap_capacity: usize) -> Arc<Self> {
        let (tap, _) = broadcast::channel(tap_capacity.max(1));
        Arc::new(Self {
            subscribers: RwLock::new(HashMap::new()),
            tap,
        })
    }

    /// Register a subscriber for one event kind.
    pub fn on<F>(&self, kind: EventKind, subscriber: F)
    where
        F: Fn(&Event) -> Result<(), RoverError> + Send + Sync + 'static,
    {
        self.subscribers
            .write()
            .entry(kind)
            .or_default()
            .push(Arc::new(subscriber));
    }

    /// Receiver over every event published on this bus.
    pub fn tap(&self) -> broadcast::Receiver<Event> {
        self.tap.subscribe()
    }

    /// Publish an event to all matching subscribers and the tap.
    ///
    /// Subscribers may themselves emit (e.g. a stop handler forcing a
    /// state transition), so the subscriber list is snapshotted before
    /// dispatch and the lock is never held across a callback.
    pub fn emit(&self, event: Event) {
        let kind = event.kind();
        let snapshot: Vec<Subscriber> = self
            .subscribers
            .read()
            .get(&kind)
            .map(|subs| subs.to_vec())
            .unwrap_or_default();

        for subscriber in snapshot {
            if let Err(err) = subscriber(&event) {
                warn!(event = ?kind, error = %err, "event subscriber failed");
                // Failed handlers of an error event are only logged,
                // otherwise two broken subscribers could ping-pong forever.
                if kind != EventKind::Error {
                    self.emit(Event::Error {
                        agent: None,
                        message: format!("subscriber failed on {kind:?}: {err}"),
                    });
                }
            }
        }

        // No receivers is fine; the tap is best-effort.
        let _ = self.tap.send(event);
    }

    /// Broadcast a global pause; agents park until `resume_all`.
    pub fn pause_all(&self) {
        self.emit(Event::PauseAll);
    }

    pub fn resume_all(&self) {
        self.emit(Event::ResumeAll);
    }

    /// Broadcast the global kill switch.
    pub fn stop(&self, reason: impl Into<String>) {
        self.emit(Event::Stop {
            reason: reason.into(),
        });
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("kinds", &self.subscribers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn warning(message: &str) -> Event {
        Event::ValidatorWarning {
            agent: None,
            message: message.into(),
        }
    }

    #[tokio::test]
    async fn delivers_to_matching_subscribers_only() {
        let bus = EventBus::new(16);
        let warnings = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));

        let w = warnings.clone();
        bus.on(EventKind::ValidatorWarning, move |_| {
            w.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let s = stops.clone();
        bus.on(EventKind::Stop, move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.emit(warning("label mismatch"));
        bus.stop("fatal upstream failure");

        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscriber_failure_is_contained() {
        let bus = EventBus::new(16);
        let delivered = Arc::new(AtomicUsize::new(0));

        bus.on(EventKind::ValidatorWarning, |_| {
            Err(RoverError::internal("broken sink"))
        });
        let d = delivered.clone();
        bus.on(EventKind::ValidatorWarning, move |_| {
            d.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut tap = bus.tap();
        bus.emit(warning("still delivered"));

        // The healthy subscriber still ran.
        assert_eq!(delivered.load(Ordering::SeqCst), 1);

        // The failure surfaced as a nested error event.
        let first = tap.recv().await.unwrap();
        assert_eq!(first.kind(), EventKind::Error);
        let second = tap.recv().await.unwrap();
        assert_eq!(second, warning("still delivered"));
    }

    #[tokio::test]
    async fn reentrant_emit_from_subscriber() {
        let bus = EventBus::new(16);
        let inner = bus.clone();
        bus.on(EventKind::PauseAll, move |_| {
            inner.emit(Event::ResumeAll);
            Ok(())
        });

        let mut tap = bus.tap();
        bus.pause_all();

        assert_eq!(tap.recv().await.unwrap(), Event::ResumeAll);
        assert_eq!(tap.recv().await.unwrap(), Event::PauseAll);
    }
}
