//! Run Outcome Router
//!
//! Owns the continue offer and the game-over screen as sibling states.
//! A failure either opens the offer or, once the fail limit is reached,
//! goes straight to game over. The score is captured at failure time and
//! carried by value.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ads::RewardedAdProvider;
use crate::config::{ConfigError, FlowConfig};
use crate::flow::events::{FlowEvent, FlowEventKind, FlowEvents};
use crate::flow::game_over::GameOverScreen;
use crate::flow::offer::{ContinueOffer, OfferReport, Outcome, PlayerAction};
use crate::platform::{AudioService, GameEngine};
use crate::{FailCount, Score};

/// Where a failure leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Present the continue offer.
    Offer,
    /// Skip the offer, end the run.
    GameOver,
}

/// Decide the route for a failure.
pub fn route(fail_count: FailCount, fail_limit: FailCount) -> Route {
    if fail_count >= fail_limit {
        Route::GameOver
    } else {
        Route::Offer
    }
}

/// Run state captured by the engine at the moment of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    /// Fail count including this failure.
    pub fail_count: FailCount,
    /// Score when the run failed.
    pub score: Score,
}

/// Router state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// Game is running.
    #[default]
    Running,
    /// Continue offer on screen.
    Offering,
    /// Terminal screen on screen.
    GameOver {
        /// Final score.
        score: Score,
    },
}

/// Routes failures to the continue offer or game over.
pub struct RunOutcomeRouter<P> {
    config: FlowConfig,
    offer: ContinueOffer<P>,
    game_over: GameOverScreen,
    events: FlowEvents,
    state: RunState,
    last_report: Option<OfferReport>,
}

impl<P: RewardedAdProvider> RunOutcomeRouter<P> {
    /// Create a router in the `Running` state. Fails if the configuration
    /// is invalid.
    pub fn new(
        config: FlowConfig,
        provider: P,
        audio: Box<dyn AudioService>,
    ) -> Result<Self, ConfigError> {
        let events = FlowEvents::new();
        let offer = ContinueOffer::new(config.clone(), provider, audio, events.clone())?;

        Ok(Self {
            config,
            offer,
            game_over: GameOverScreen::new(),
            events,
            state: RunState::Running,
            last_report: None,
        })
    }

    /// Subscribe to the flow event log.
    pub fn subscribe_events(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    /// Handle a failure reported by the engine.
    ///
    /// Returns once the flow has settled: back to `Running` or in `GameOver`.
    pub async fn handle_failure(
        &mut self,
        failure: RunFailure,
        engine: &mut dyn GameEngine,
        actions: &mut mpsc::Receiver<PlayerAction>,
    ) -> RunState {
        if let RunState::GameOver { score } = self.state {
            warn!(score, ?failure, "Failure reported after game over, ignoring");
            return self.state;
        }

        // Captured before any ad interaction
        let score = failure.score;

        match route(failure.fail_count, self.config.fail_limit) {
            Route::GameOver => {
                info!(fail_count = failure.fail_count, score, "Fail limit reached");
                self.enter_game_over(None, failure.fail_count, score);
            }
            Route::Offer => {
                info!(fail_count = failure.fail_count, score, "Offering continue");
                self.state = RunState::Offering;
                let report = self.offer.present(actions).await;

                match report.outcome {
                    Outcome::Resume => {
                        engine.resume_run();
                        self.state = RunState::Running;
                        self.events
                            .emit(Some(report.offer_id), FlowEventKind::RunResumed { score });
                    }
                    Outcome::End => {
                        engine.end_run();
                        self.enter_game_over(Some(report.offer_id), failure.fail_count, score);
                    }
                }
                self.last_report = Some(report);
            }
        }

        self.state
    }

    fn enter_game_over(&mut self, offer_id: Option<Uuid>, fail_count: FailCount, score: Score) {
        self.game_over.show(score);
        self.state = RunState::GameOver { score };
        self.events
            .emit(offer_id, FlowEventKind::GameOverOpened { score, fail_count });
    }

    /// Start a fresh run from game over. Returns `false` outside game over.
    pub fn restart(&mut self, engine: &mut dyn GameEngine) -> bool {
        if !matches!(self.state, RunState::GameOver { .. }) {
            warn!(state = ?self.state, "Restart requested outside game over");
            return false;
        }

        self.game_over.close();
        engine.restart();
        self.state = RunState::Running;
        self.last_report = None;
        info!("New run started");
        self.events.emit(None, FlowEventKind::RunRestarted);
        true
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The continue offer.
    pub fn offer(&self) -> &ContinueOffer<P> {
        &self.offer
    }

    /// The game-over screen.
    pub fn game_over(&self) -> &GameOverScreen {
        &self.game_over
    }

    /// Report of the most recent offer in this run.
    pub fn last_report(&self) -> Option<&OfferReport> {
        self.last_report.as_ref()
    }
}
