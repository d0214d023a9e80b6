//! Game Over Screen
//!
//! Terminal modal. The score is handed over by value, either just before
//! opening or together with it.

use tracing::info;

use crate::core::{ModalHooks, ModalLifecycle, ModalPhase};
use crate::Score;

#[derive(Debug, Default)]
struct GameOverView {
    score: Score,
    displayed: Option<Score>,
}

impl ModalHooks for GameOverView {
    fn render(&mut self) {
        info!(score = self.score, "Game over");
        self.displayed = Some(self.score);
    }

    fn teardown(&mut self) {
        self.displayed = None;
    }
}

/// Game-over screen showing the final score.
#[derive(Debug)]
pub struct GameOverScreen {
    modal: ModalLifecycle,
    view: GameOverView,
}

impl GameOverScreen {
    /// Create a closed screen.
    pub fn new() -> Self {
        Self {
            modal: ModalLifecycle::new("game_over"),
            view: GameOverView::default(),
        }
    }

    /// Set the score shown on the next open.
    pub fn update_score(&mut self, score: Score) {
        self.view.score = score;
    }

    /// Open with the last score set. No-op if already open.
    pub fn open(&mut self) -> bool {
        self.modal.open(&mut self.view)
    }

    /// Set the score and open.
    pub fn show(&mut self, score: Score) -> bool {
        if self.modal.is_open() {
            return false;
        }
        self.update_score(score);
        self.open()
    }

    /// Close. No-op if not open.
    pub fn close(&mut self) -> bool {
        self.modal.close(&mut self.view)
    }

    /// Whether the screen is visible.
    pub fn is_open(&self) -> bool {
        self.modal.is_open()
    }

    /// Modal phase.
    pub fn phase(&self) -> ModalPhase {
        self.modal.phase()
    }

    /// Score on screen, while open.
    pub fn displayed_score(&self) -> Option<Score> {
        self.view.displayed
    }
}

impl Default for GameOverScreen {
    fn default() -> Self {
        Self::new()
    }
}
