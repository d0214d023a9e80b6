//! Continue Offer
//!
//! Composes the countdown and the ad controller behind one modal. A
//! presentation ends through exactly one of three exit paths (continue,
//! give up, timeout), produces exactly one [`Outcome`], and leaves the
//! offer fully reset for the next failure.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ads::{AdEnvelope, AdError, AdLoadController, AdLoadState, AdResolution, RewardedAdProvider};
use crate::config::{ConfigError, FlowConfig};
use crate::core::{
    ClockSource, CountdownSample, CountdownState, CountdownTick, CountdownTimer, DualClock,
    ModalControl, ModalHooks, ModalLifecycle, ModalPhase,
};
use crate::flow::events::{FlowEventKind, FlowEvents};
use crate::platform::AudioService;

// ============================================================================
// Types
// ============================================================================

/// Player input while the offer is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    /// Watch an ad (if any) and keep playing.
    Continue,
    /// End the run.
    GiveUp,
}

/// Terminal decision of one presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Hand the failed run back to the engine.
    Resume,
    /// End the run and show game over.
    End,
}

/// How the presentation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum ExitPath {
    /// Player chose to continue. Always resumes, rewarded or not.
    Continue {
        /// What happened with the ad.
        ad: AdResolution,
    },
    /// Player gave up (or input went away).
    GiveUp,
    /// Countdown expired.
    Timeout,
}

impl ExitPath {
    /// Outcome this path maps to.
    pub fn outcome(&self) -> Outcome {
        match self {
            ExitPath::Continue { .. } => Outcome::Resume,
            ExitPath::GiveUp | ExitPath::Timeout => Outcome::End,
        }
    }
}

/// Result of one presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferReport {
    /// Presentation id, matches the flow events it produced.
    pub offer_id: Uuid,
    /// Resume or end.
    pub outcome: Outcome,
    /// Path that produced the outcome.
    pub exit: ExitPath,
    /// Time from open to outcome, ad included.
    pub elapsed: Duration,
}

// ============================================================================
// Modal hooks
// ============================================================================

/// The parts of the offer the modal hooks drive.
struct OfferParts<P> {
    ad_unit_id: String,
    timeout: Duration,
    timer: CountdownTimer,
    ads: AdLoadController<P>,
    display: watch::Sender<CountdownSample>,
}

impl<P: RewardedAdProvider> ModalHooks for OfferParts<P> {
    fn on_before_open(&mut self, _control: &mut ModalControl) {
        self.ads.preload(&self.ad_unit_id);
    }

    fn render(&mut self) {
        self.display.send_replace(CountdownSample::resting(self.timeout));
    }

    fn on_after_open(&mut self, _control: &mut ModalControl) {
        self.timer.start(self.timeout, Instant::now());
    }

    fn on_before_close(&mut self) {
        self.timer.stop();
    }

    fn on_after_close(&mut self) {
        self.timer.reset();
        self.ads.reset();
        self.display.send_replace(CountdownSample::resting(self.timer.total()));
    }
}

/// Drop input that does not belong to the open presentation.
fn discard_pending(actions: &mut mpsc::Receiver<PlayerAction>, when: &str) {
    let mut dropped = 0;
    while let Ok(action) = actions.try_recv() {
        debug!(?action, when, "Discarding stale player input");
        dropped += 1;
    }
    if dropped > 0 {
        info!(dropped, when, "Ignored player input outside the offer");
    }
}

enum Step {
    Tick(ClockSource, Instant),
    Ad(AdEnvelope),
    Action(Option<PlayerAction>),
}

// ============================================================================
// Continue offer
// ============================================================================

/// Rewarded-ad continue offer, reusable across failures.
pub struct ContinueOffer<P> {
    config: FlowConfig,
    modal: ModalLifecycle,
    parts: OfferParts<P>,
    events: FlowEvents,
    published_ad_state: AdLoadState,
    current: Option<Uuid>,
}

impl<P: RewardedAdProvider> ContinueOffer<P> {
    /// Create a closed offer. Fails if the configuration is invalid.
    pub fn new(
        config: FlowConfig,
        provider: P,
        audio: Box<dyn AudioService>,
        events: FlowEvents,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let timeout = config.timeout()?;
        let (display, _) = watch::channel(CountdownSample::resting(timeout));

        let parts = OfferParts {
            ad_unit_id: config.ad_unit_id.clone(),
            timeout,
            timer: CountdownTimer::new(timeout),
            ads: AdLoadController::new(provider, audio, config.ads_enabled),
            display,
        };

        Ok(Self {
            config,
            modal: ModalLifecycle::new("continue_offer"),
            parts,
            events,
            published_ad_state: AdLoadState::Idle,
            current: None,
        })
    }

    /// Open the offer and run it to its single outcome.
    ///
    /// Player input is read from `actions` only while the offer is open.
    /// Taps queued before it opened, or sent while the ad was on screen,
    /// are discarded. A closed channel counts as giving up.
    pub async fn present(&mut self, actions: &mut mpsc::Receiver<PlayerAction>) -> OfferReport {
        if self.modal.is_open() {
            // A previous presentation was dropped mid-flight
            warn!(offer_id = ?self.current, "Closing abandoned continue offer");
            self.modal.close(&mut self.parts);
        }

        let offer_id = Uuid::new_v4();
        let started = Instant::now();
        self.current = Some(offer_id);
        self.published_ad_state = AdLoadState::Idle;

        let mut clock = DualClock::new(self.config.frame_interval());
        self.modal.open(&mut self.parts);
        discard_pending(actions, "before open");
        info!(%offer_id, timeout = ?self.parts.timeout, "Continue offer opened");
        self.emit(FlowEventKind::OfferOpened {
            timeout_seconds: self.config.timeout_seconds,
        });
        self.publish_ad_state();

        let exit = loop {
            let step = tokio::select! {
                (source, now) = clock.next() => Step::Tick(source, now),
                Some(envelope) = self.parts.ads.next_envelope() => Step::Ad(envelope),
                action = actions.recv() => Step::Action(action),
            };

            match step {
                Step::Tick(source, now) => match self.parts.timer.sample(now, source) {
                    CountdownTick::Running(sample) => {
                        self.parts.display.send_replace(sample);
                    }
                    CountdownTick::Expired(sample) => {
                        self.parts.display.send_replace(sample);
                        info!(%offer_id, ?source, "Continue offer timed out");
                        self.emit(FlowEventKind::CountdownExpired);
                        break ExitPath::Timeout;
                    }
                    CountdownTick::Idle => {}
                },
                Step::Ad(envelope) => {
                    if let Some(resolution) = self.parts.ads.handle_event(envelope) {
                        debug!(?resolution, "Ad resolved outside a presentation");
                    }
                    self.publish_ad_state();
                }
                Step::Action(Some(PlayerAction::Continue)) => {
                    info!(%offer_id, "Player chose continue");
                    break ExitPath::Continue {
                        ad: self.watch_ad().await,
                    };
                }
                Step::Action(Some(PlayerAction::GiveUp)) => {
                    info!(%offer_id, "Player gave up");
                    self.parts.timer.stop();
                    break ExitPath::GiveUp;
                }
                Step::Action(None) => {
                    warn!(%offer_id, "Player input closed, treating as give up");
                    self.parts.timer.stop();
                    break ExitPath::GiveUp;
                }
            }
        };

        let outcome = exit.outcome();
        self.emit(FlowEventKind::OutcomeEmitted {
            outcome,
            exit: exit.clone(),
        });

        self.modal.close(&mut self.parts);
        discard_pending(actions, "after outcome");
        self.publish_ad_state();
        self.emit(FlowEventKind::OfferClosed);
        self.current = None;

        let elapsed = started.elapsed();
        info!(%offer_id, ?outcome, ?elapsed, "Continue offer closed");
        OfferReport {
            offer_id,
            outcome,
            exit,
            elapsed,
        }
    }

    /// Continue path: stop the countdown, show the ad if one is ready.
    async fn watch_ad(&mut self) -> AdResolution {
        self.parts.timer.stop();

        let request = match self.parts.ads.present(&self.config.ad_unit_id) {
            Ok(request) => request,
            Err(error) => {
                info!(%error, "No ad to show, continuing");
                return AdResolution::Skipped(error);
            }
        };
        self.emit(FlowEventKind::AdShown { request });

        let ads = &mut self.parts.ads;
        let waited = timeout(self.config.ad_show_timeout(), async {
            while let Some(envelope) = ads.next_envelope().await {
                if let Some(resolution) = ads.handle_event(envelope) {
                    return Some(resolution);
                }
            }
            None
        })
        .await;

        let resolution = match waited {
            Ok(Some(resolution)) => resolution,
            Ok(None) | Err(_) => {
                warn!(request, "Ad presentation never finished");
                self.parts
                    .ads
                    .abandon_show("ad presentation timed out")
                    .unwrap_or(AdResolution::Skipped(AdError::Unavailable))
            }
        };
        self.publish_ad_state();
        resolution
    }

    fn publish_ad_state(&mut self) {
        let state = self.parts.ads.state();
        if state != self.published_ad_state {
            self.published_ad_state = state;
            self.emit(FlowEventKind::AdStateChanged { state });
        }
    }

    fn emit(&self, kind: FlowEventKind) {
        self.events.emit(self.current, kind);
    }

    /// Watch the countdown display. Only the latest sample is kept.
    pub fn subscribe_countdown(&self) -> watch::Receiver<CountdownSample> {
        self.parts.display.subscribe()
    }

    /// Whether the offer is on screen.
    pub fn is_open(&self) -> bool {
        self.modal.is_open()
    }

    /// Modal phase.
    pub fn phase(&self) -> ModalPhase {
        self.modal.phase()
    }

    /// Number of completed presentations.
    pub fn presentations(&self) -> u64 {
        self.modal.presentations()
    }

    /// Countdown snapshot.
    pub fn countdown(&self) -> CountdownState {
        self.parts.timer.state()
    }

    /// Ad controller.
    pub fn ads(&self) -> &AdLoadController<P> {
        &self.parts.ads
    }

}
