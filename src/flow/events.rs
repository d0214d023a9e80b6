//! Flow Events
//!
//! Broadcast log of every decision the flow makes, for analytics hooks,
//! UI bindings and tests. Events are fire-and-forget: a missing or lagging
//! subscriber never affects the flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::ads::{AdLoadState, RequestId};
use crate::flow::offer::{ExitPath, Outcome};
use crate::{FailCount, Score};

/// Broadcast channel capacity.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEventKind {
    /// Continue offer became visible.
    OfferOpened {
        /// Countdown length (seconds).
        timeout_seconds: f64,
    },
    /// Ad controller changed state.
    AdStateChanged {
        /// New state.
        state: AdLoadState,
    },
    /// Ad presentation requested from the provider.
    AdShown {
        /// Show request id.
        request: RequestId,
    },
    /// Countdown ran out.
    CountdownExpired,
    /// The single outcome of a presentation.
    OutcomeEmitted {
        /// Resume or end.
        outcome: Outcome,
        /// Path that produced it.
        exit: ExitPath,
    },
    /// Continue offer closed and reset.
    OfferClosed,
    /// Failed run handed back to the engine.
    RunResumed {
        /// Score at failure time.
        score: Score,
    },
    /// Terminal screen opened.
    GameOverOpened {
        /// Final score.
        score: Score,
        /// Fail count that led here.
        fail_count: FailCount,
    },
    /// Fresh run started from game over.
    RunRestarted,
}

/// A timestamped flow event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEvent {
    /// Offer presentation this belongs to, if any.
    pub offer_id: Option<Uuid>,
    /// Wall-clock time of emission.
    pub at: DateTime<Utc>,
    /// Payload.
    pub kind: FlowEventKind,
}

impl FlowEvent {
    /// Stamp an event with the current time.
    pub fn new(offer_id: Option<Uuid>, kind: FlowEventKind) -> Self {
        Self {
            offer_id,
            at: Utc::now(),
            kind,
        }
    }
}

/// Cloneable publisher shared by the offer and the router.
#[derive(Debug, Clone)]
pub struct FlowEvents {
    tx: broadcast::Sender<FlowEvent>,
}

impl FlowEvents {
    /// Create a publisher with no subscribers.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.tx.subscribe()
    }

    /// Publish an event.
    pub fn emit(&self, offer_id: Option<Uuid>, kind: FlowEventKind) {
        debug!(?offer_id, ?kind, "Flow event");
        // No subscribers is fine
        let _ = self.tx.send(FlowEvent::new(offer_id, kind));
    }
}

impl Default for FlowEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let events = FlowEvents::new();
        events.emit(None, FlowEventKind::RunRestarted);
    }

    #[test]
    fn test_subscriber_receives_in_order() {
        let events = FlowEvents::new();
        let mut rx = events.subscribe();
        let offer = Uuid::new_v4();

        events.emit(Some(offer), FlowEventKind::OfferOpened { timeout_seconds: 5.0 });
        events.emit(Some(offer), FlowEventKind::OfferClosed);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.offer_id, Some(offer));
        assert!(matches!(first.kind, FlowEventKind::OfferOpened { .. }));
        assert_eq!(rx.try_recv().unwrap().kind, FlowEventKind::OfferClosed);
    }

    #[test]
    fn test_event_serialization() {
        let event = FlowEvent::new(None, FlowEventKind::GameOverOpened { score: 42, fail_count: 2 });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"]["type"], "game_over_opened");
        assert_eq!(json["kind"]["score"], 42);

        let back: FlowEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
