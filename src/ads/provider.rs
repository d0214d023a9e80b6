//! Rewarded Ad Provider
//!
//! Capability boundary to the platform ad SDK.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Identifies one load or show request. Never reused.
pub type RequestId = u64;

/// Events a provider may report.
///
/// Ordering guarantees: `Show` precedes `Dismissed`, and `UserEarnedReward`
/// precedes `Dismissed` when the reward is granted. Nothing else is assumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdEvent {
    /// Ad finished loading and can be shown.
    Loaded,
    /// Load or show failed.
    Error {
        /// SDK error description.
        message: String,
    },
    /// Ad became visible.
    Show,
    /// Player watched to completion.
    UserEarnedReward,
    /// Ad was closed.
    Dismissed,
}

impl AdEvent {
    /// Create an error event.
    pub fn error(message: impl Into<String>) -> Self {
        AdEvent::Error {
            message: message.into(),
        }
    }
}

/// An event tagged with the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdEnvelope {
    /// Originating request.
    pub request: RequestId,
    /// Event payload.
    pub event: AdEvent,
}

/// Handle a provider uses to report events for one request.
#[derive(Debug, Clone)]
pub struct AdEventSink {
    request: RequestId,
    tx: mpsc::UnboundedSender<AdEnvelope>,
}

impl AdEventSink {
    /// Create a sink for `request`.
    pub fn new(request: RequestId, tx: mpsc::UnboundedSender<AdEnvelope>) -> Self {
        Self { request, tx }
    }

    /// Request this sink reports for.
    pub fn request(&self) -> RequestId {
        self.request
    }

    /// Report an event. Dropped silently if the controller is gone.
    pub fn emit(&self, event: AdEvent) {
        let envelope = AdEnvelope {
            request: self.request,
            event,
        };
        if self.tx.send(envelope).is_err() {
            debug!(request = self.request, "Ad event dropped, controller gone");
        }
    }
}

/// Platform rewarded-ad capability.
///
/// `load` and `show` return immediately; results arrive through the sink,
/// possibly much later, possibly never.
pub trait RewardedAdProvider {
    /// Whether this platform can load rewarded ads.
    fn supports_load(&self) -> bool;

    /// Whether this platform can present rewarded ads.
    fn supports_show(&self) -> bool;

    /// Start loading an ad. Reports `Loaded` or `Error`.
    fn load(&mut self, ad_unit_id: &str, sink: AdEventSink);

    /// Present a loaded ad. Reports `Show`, `UserEarnedReward`, `Dismissed`
    /// or `Error`.
    fn show(&mut self, ad_unit_id: &str, sink: AdEventSink);
}

impl<P: RewardedAdProvider + ?Sized> RewardedAdProvider for Box<P> {
    fn supports_load(&self) -> bool {
        (**self).supports_load()
    }

    fn supports_show(&self) -> bool {
        (**self).supports_show()
    }

    fn load(&mut self, ad_unit_id: &str, sink: AdEventSink) {
        (**self).load(ad_unit_id, sink)
    }

    fn show(&mut self, ad_unit_id: &str, sink: AdEventSink) {
        (**self).show(ad_unit_id, sink)
    }
}
