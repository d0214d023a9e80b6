//! Modal Lifecycle
//!
//! Generic open/close state shared by the continue offer and the game-over
//! screen. Hooks fire only on real phase transitions and always in the
//! order Before → visual change → After.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Modal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalPhase {
    /// Not visible. Initial and terminal phase.
    #[default]
    Closed,
    /// `on_before_open` has run, content is being shown.
    Opening,
    /// Visible and interactive.
    Open,
    /// `on_before_close` has run, content is being torn down.
    Closing,
}

/// Lets a hook ask for the modal to close once the current transition ends.
#[derive(Debug, Default)]
pub struct ModalControl {
    close_requested: bool,
}

impl ModalControl {
    /// Close the modal after the open transition completes.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// Whether a close was requested.
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}

/// Lifecycle hooks. All default to no-ops.
pub trait ModalHooks {
    /// Runs before anything becomes visible.
    fn on_before_open(&mut self, _control: &mut ModalControl) {}

    /// Make the modal visible.
    fn render(&mut self) {}

    /// Runs once the modal is open.
    fn on_after_open(&mut self, _control: &mut ModalControl) {}

    /// Runs before teardown. Stop anything still in flight here.
    fn on_before_close(&mut self) {}

    /// Remove visible state.
    fn teardown(&mut self) {}

    /// Runs once the modal is closed and quiesced.
    fn on_after_close(&mut self) {}
}

/// Open/close state for one modal instance, reusable across presentations.
#[derive(Debug, Clone)]
pub struct ModalLifecycle {
    name: &'static str,
    phase: ModalPhase,
    presentations: u64,
}

impl ModalLifecycle {
    /// Create a closed modal.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            phase: ModalPhase::Closed,
            presentations: 0,
        }
    }

    /// Open the modal. Returns `false` (and fires nothing) unless closed.
    ///
    /// A close requested by either open hook runs after `on_after_open`.
    pub fn open(&mut self, hooks: &mut dyn ModalHooks) -> bool {
        if self.phase != ModalPhase::Closed {
            debug!(modal = self.name, phase = ?self.phase, "Ignoring open");
            return false;
        }

        let mut control = ModalControl::default();
        hooks.on_before_open(&mut control);
        self.phase = ModalPhase::Opening;
        hooks.render();
        self.phase = ModalPhase::Open;
        self.presentations += 1;
        hooks.on_after_open(&mut control);
        debug!(modal = self.name, "Opened");

        if control.close_requested() {
            self.close(hooks);
        }
        true
    }

    /// Close the modal. Returns `false` (and fires nothing) unless open.
    pub fn close(&mut self, hooks: &mut dyn ModalHooks) -> bool {
        if self.phase != ModalPhase::Open {
            debug!(modal = self.name, phase = ?self.phase, "Ignoring close");
            return false;
        }

        hooks.on_before_close();
        self.phase = ModalPhase::Closing;
        hooks.teardown();
        self.phase = ModalPhase::Closed;
        hooks.on_after_close();
        debug!(modal = self.name, "Closed");
        true
    }

    /// Current phase.
    pub fn phase(&self) -> ModalPhase {
        self.phase
    }

    /// Whether the modal is open.
    pub fn is_open(&self) -> bool {
        self.phase == ModalPhase::Open
    }

    /// Number of completed opens.
    pub fn presentations(&self) -> u64 {
        self.presentations
    }
}
