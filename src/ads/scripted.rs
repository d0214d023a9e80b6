//! Scripted Ad Provider
//!
//! Stand-in for the platform SDK. Each call plays a fixed script on a
//! spawned task, so events arrive asynchronously just like real SDK
//! callbacks. Used by the demo binary and tests.

use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::ads::provider::{AdEvent, AdEventSink, RewardedAdProvider};

/// What happens when an ad is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadScript {
    /// Report `Loaded` after a delay.
    Succeed {
        /// Network latency.
        after: Duration,
    },
    /// Report an error after a delay.
    Fail {
        /// Network latency.
        after: Duration,
        /// SDK error text.
        message: String,
    },
    /// Never report anything.
    Never,
    /// Platform cannot load ads.
    Unsupported,
}

/// What happens when an ad is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowScript {
    /// `Show`, then `UserEarnedReward` and `Dismissed` once watched.
    Complete {
        /// Ad length.
        watch: Duration,
    },
    /// `Show`, then `Dismissed` without reward.
    Skip {
        /// Time before the player closes the ad.
        after: Duration,
    },
    /// Immediate error, nothing becomes visible.
    Fail {
        /// SDK error text.
        message: String,
    },
    /// `Show`, then an error.
    FailAfterShow {
        /// SDK error text.
        message: String,
    },
    /// `Show`, then nothing.
    NeverDismiss,
    /// Platform cannot present ads.
    Unsupported,
}

/// Provider that plays scripted responses.
#[derive(Debug, Clone)]
pub struct ScriptedAdProvider {
    load: LoadScript,
    show: ShowScript,
    load_calls: usize,
    show_calls: usize,
}

impl ScriptedAdProvider {
    /// Create a provider from a load and a show script.
    pub fn new(load: LoadScript, show: ShowScript) -> Self {
        Self {
            load,
            show,
            load_calls: 0,
            show_calls: 0,
        }
    }

    /// Loads in 100 ms, plays a 2 s ad to completion.
    pub fn rewarding() -> Self {
        Self::new(
            LoadScript::Succeed {
                after: Duration::from_millis(100),
            },
            ShowScript::Complete {
                watch: Duration::from_secs(2),
            },
        )
    }

    /// Platform without rewarded-ad support.
    pub fn unsupported() -> Self {
        Self::new(LoadScript::Unsupported, ShowScript::Unsupported)
    }

    /// Number of `load` calls received.
    pub fn load_calls(&self) -> usize {
        self.load_calls
    }

    /// Number of `show` calls received.
    pub fn show_calls(&self) -> usize {
        self.show_calls
    }
}

impl RewardedAdProvider for ScriptedAdProvider {
    fn supports_load(&self) -> bool {
        self.load != LoadScript::Unsupported
    }

    fn supports_show(&self) -> bool {
        self.show != ShowScript::Unsupported
    }

    fn load(&mut self, ad_unit_id: &str, sink: AdEventSink) {
        self.load_calls += 1;
        debug!(ad_unit_id, request = sink.request(), script = ?self.load, "Scripted load");

        match self.load.clone() {
            LoadScript::Succeed { after } => {
                tokio::spawn(async move {
                    sleep(after).await;
                    sink.emit(AdEvent::Loaded);
                });
            }
            LoadScript::Fail { after, message } => {
                tokio::spawn(async move {
                    sleep(after).await;
                    sink.emit(AdEvent::error(message));
                });
            }
            LoadScript::Never | LoadScript::Unsupported => {}
        }
    }

    fn show(&mut self, ad_unit_id: &str, sink: AdEventSink) {
        self.show_calls += 1;
        debug!(ad_unit_id, request = sink.request(), script = ?self.show, "Scripted show");

        match self.show.clone() {
            ShowScript::Complete { watch } => {
                tokio::spawn(async move {
                    sink.emit(AdEvent::Show);
                    sleep(watch).await;
                    sink.emit(AdEvent::UserEarnedReward);
                    sink.emit(AdEvent::Dismissed);
                });
            }
            ShowScript::Skip { after } => {
                tokio::spawn(async move {
                    sink.emit(AdEvent::Show);
                    sleep(after).await;
                    sink.emit(AdEvent::Dismissed);
                });
            }
            ShowScript::Fail { message } => sink.emit(AdEvent::error(message)),
            ShowScript::FailAfterShow { message } => {
                sink.emit(AdEvent::Show);
                sink.emit(AdEvent::error(message));
            }
            ShowScript::NeverDismiss => sink.emit(AdEvent::Show),
            ShowScript::Unsupported => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_load_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut provider = ScriptedAdProvider::rewarding();
        provider.load("unit", AdEventSink::new(1, tx));

        let started = tokio::time::Instant::now();
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event, AdEvent::Loaded);
        assert_eq!(started.elapsed(), Duration::from_millis(100));
        assert_eq!(provider.load_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_show_sequence() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut provider = ScriptedAdProvider::rewarding();
        provider.show("unit", AdEventSink::new(2, tx));

        let mut events = Vec::new();
        for _ in 0..3 {
            events.push(rx.recv().await.unwrap().event);
        }
        assert_eq!(
            events,
            vec![AdEvent::Show, AdEvent::UserEarnedReward, AdEvent::Dismissed]
        );
        assert_eq!(provider.show_calls(), 1);
    }

    #[test]
    fn test_unsupported_capabilities() {
        let provider = ScriptedAdProvider::unsupported();
        assert!(!provider.supports_load());
        assert!(!provider.supports_show());
    }
}
