//! Ad Load Controller
//!
//! Owns the rewarded-ad state for one offer presentation:
//! `Idle → Loading → Loaded | Failed`, back to `Idle` only via reset or a
//! finished presentation. Every failure degrades to "no ad"; nothing here
//! can block the player.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ads::provider::{AdEnvelope, AdEvent, AdEventSink, RequestId, RewardedAdProvider};
use crate::platform::AudioService;

/// Ad load state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdLoadState {
    /// Nothing requested.
    #[default]
    Idle,
    /// Load in flight.
    Loading,
    /// Ready to present.
    Loaded,
    /// Load failed or unsupported.
    Failed,
}

/// Why no reward was granted. All variants are recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum AdError {
    /// Platform cannot present ads, or no ad is ready.
    #[error("ad unavailable")]
    Unavailable,
    /// Network or SDK error while loading.
    #[error("ad load failed: {0}")]
    LoadFailure(String),
    /// SDK error while presenting.
    #[error("ad show failed: {0}")]
    ShowFailure(String),
    /// Ad was dismissed before the reward was earned.
    #[error("ad dismissed without reward")]
    RewardNotEarned,
}

/// How an ad presentation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdResolution {
    /// Watched to completion and dismissed.
    Rewarded,
    /// No reward, for the given reason.
    Skipped(AdError),
}

impl AdResolution {
    /// Whether the reward was earned.
    pub fn is_rewarded(&self) -> bool {
        matches!(self, AdResolution::Rewarded)
    }
}

/// Progress of the presentation currently on screen.
#[derive(Debug, Clone, Copy)]
struct ShowProgress {
    request: RequestId,
    audio_paused: bool,
    rewarded: bool,
}

/// Rewarded-ad state machine.
///
/// Single slot: at most one load and one presentation per cycle. Events
/// tagged with any other request id are stale and ignored.
pub struct AdLoadController<P> {
    provider: P,
    audio: Box<dyn AudioService>,
    ads_enabled: bool,
    state: AdLoadState,
    last_error: Option<AdError>,
    loading: Option<RequestId>,
    showing: Option<ShowProgress>,
    next_request: RequestId,
    tx: mpsc::UnboundedSender<AdEnvelope>,
    rx: mpsc::UnboundedReceiver<AdEnvelope>,
}

impl<P: RewardedAdProvider> AdLoadController<P> {
    /// Create an idle controller.
    pub fn new(provider: P, audio: Box<dyn AudioService>, ads_enabled: bool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            provider,
            audio,
            ads_enabled,
            state: AdLoadState::Idle,
            last_error: None,
            loading: None,
            showing: None,
            next_request: 1,
            tx,
            rx,
        }
    }

    /// Request an ad. No-op unless idle.
    pub fn preload(&mut self, ad_unit_id: &str) {
        if self.state != AdLoadState::Idle {
            debug!(state = ?self.state, "Preload ignored, slot in use");
            return;
        }

        if !self.ads_enabled {
            debug!("Ads disabled, skipping preload");
            return;
        }

        let request = self.allocate_request();
        self.state = AdLoadState::Loading;

        if !self.provider.supports_load() {
            warn!("Rewarded ads not supported on this platform");
            self.fail(AdError::Unavailable);
            return;
        }

        self.loading = Some(request);
        info!(request, ad_unit_id, "Loading rewarded ad");
        self.provider.load(ad_unit_id, AdEventSink::new(request, self.tx.clone()));
    }

    /// Whether `present` would start a presentation.
    pub fn is_presentable(&self) -> bool {
        self.ads_enabled
            && self.state == AdLoadState::Loaded
            && self.showing.is_none()
            && self.provider.supports_show()
    }

    /// Present the loaded ad.
    ///
    /// Outside `Loaded` this returns the reason no ad can be shown: the load
    /// failure if there was one, otherwise [`AdError::Unavailable`].
    pub fn present(&mut self, ad_unit_id: &str) -> Result<RequestId, AdError> {
        if !self.ads_enabled {
            return Err(AdError::Unavailable);
        }

        match self.state {
            AdLoadState::Loaded => {}
            AdLoadState::Failed => {
                return Err(self.last_error.clone().unwrap_or(AdError::Unavailable));
            }
            AdLoadState::Idle | AdLoadState::Loading => return Err(AdError::Unavailable),
        }

        if self.showing.is_some() {
            return Err(AdError::Unavailable);
        }

        if !self.provider.supports_show() {
            warn!("Rewarded ad presentation not supported on this platform");
            return Err(AdError::Unavailable);
        }

        let request = self.allocate_request();
        self.showing = Some(ShowProgress {
            request,
            audio_paused: false,
            rewarded: false,
        });

        info!(request, ad_unit_id, "Presenting rewarded ad");
        self.provider.show(ad_unit_id, AdEventSink::new(request, self.tx.clone()));
        Ok(request)
    }

    /// Wait for the next provider event.
    ///
    /// Cancel safe. Never yields `None` while the controller is alive.
    pub async fn next_envelope(&mut self) -> Option<AdEnvelope> {
        self.rx.recv().await
    }

    /// Apply a provider event.
    ///
    /// Returns the resolution when the event ends a presentation.
    pub fn handle_event(&mut self, envelope: AdEnvelope) -> Option<AdResolution> {
        if let Some(show) = self.showing {
            if show.request == envelope.request {
                return self.handle_show_event(show, envelope.event);
            }
        }

        if self.loading == Some(envelope.request) && self.state == AdLoadState::Loading {
            self.handle_load_event(envelope.event);
            return None;
        }

        debug!(request = envelope.request, event = ?envelope.event, "Ignoring stale ad event");
        None
    }

    fn handle_load_event(&mut self, event: AdEvent) {
        match event {
            AdEvent::Loaded => {
                info!("Rewarded ad loaded");
                self.loading = None;
                self.state = AdLoadState::Loaded;
            }
            AdEvent::Error { message } => {
                warn!(%message, "Rewarded ad failed to load");
                self.fail(AdError::LoadFailure(message));
            }
            other => debug!(event = ?other, "Unexpected event while loading"),
        }
    }

    fn handle_show_event(&mut self, mut show: ShowProgress, event: AdEvent) -> Option<AdResolution> {
        match event {
            AdEvent::Show => {
                if !show.audio_paused {
                    info!("Rewarded ad visible");
                    self.audio.pause();
                    show.audio_paused = true;
                }
                self.showing = Some(show);
                None
            }
            AdEvent::UserEarnedReward => {
                info!("Reward earned");
                show.rewarded = true;
                self.showing = Some(show);
                None
            }
            AdEvent::Dismissed => {
                let resolution = if show.rewarded {
                    info!("Rewarded ad dismissed after reward");
                    AdResolution::Rewarded
                } else {
                    warn!("Rewarded ad dismissed without reward");
                    AdResolution::Skipped(AdError::RewardNotEarned)
                };
                Some(self.finish_show(show, resolution))
            }
            AdEvent::Error { message } => {
                warn!(%message, "Rewarded ad failed to show");
                Some(self.finish_show(show, AdResolution::Skipped(AdError::ShowFailure(message))))
            }
            AdEvent::Loaded => {
                debug!("Unexpected load event during presentation");
                None
            }
        }
    }

    /// Give up on the presentation in flight (provider never dismissed).
    pub fn abandon_show(&mut self, reason: &str) -> Option<AdResolution> {
        let show = self.showing?;
        warn!(reason, "Abandoning rewarded ad presentation");
        Some(self.finish_show(show, AdResolution::Skipped(AdError::ShowFailure(reason.to_string()))))
    }

    fn finish_show(&mut self, show: ShowProgress, resolution: AdResolution) -> AdResolution {
        if show.audio_paused {
            self.audio.resume();
        }
        self.showing = None;
        self.state = AdLoadState::Idle;
        resolution
    }

    /// Force back to idle, whatever is in flight.
    ///
    /// Audio paused by a presentation is resumed. Later events from the
    /// abandoned requests are ignored.
    pub fn reset(&mut self) {
        if let Some(show) = self.showing.take() {
            if show.audio_paused {
                self.audio.resume();
            }
        }
        if self.state != AdLoadState::Idle {
            debug!(from = ?self.state, "Ad controller reset");
        }
        self.state = AdLoadState::Idle;
        self.loading = None;
        self.last_error = None;
    }

    fn fail(&mut self, error: AdError) {
        self.loading = None;
        self.last_error = Some(error);
        self.state = AdLoadState::Failed;
    }

    fn allocate_request(&mut self) -> RequestId {
        let request = self.next_request;
        self.next_request += 1;
        request
    }

    /// Current state.
    pub fn state(&self) -> AdLoadState {
        self.state
    }

    /// Why the last load failed, while `Failed`.
    pub fn last_error(&self) -> Option<&AdError> {
        self.last_error.as_ref()
    }

    /// Whether an ad is being presented.
    pub fn is_showing(&self) -> bool {
        self.showing.is_some()
    }

    /// Whether ad monetization is enabled.
    pub fn ads_enabled(&self) -> bool {
        self.ads_enabled
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }
}
