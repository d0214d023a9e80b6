//! Clock Sources
//!
//! A high-frequency frame clock for smooth display updates and a fixed
//! 1 second fallback that keeps ticking when the frame clock is throttled
//! (screen lock, background tab). Both only say "look at the wall clock
//! now"; remaining time is always recomputed from the start timestamp.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

/// Fallback clock period.
pub const FALLBACK_INTERVAL: Duration = Duration::from_secs(1);

/// Which clock produced a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockSource {
    /// High-frequency display clock.
    Frame,
    /// Low-frequency correction clock.
    Fallback,
}

/// Frame clock plus fallback clock behind a single `next()`.
///
/// Both intervals skip missed ticks instead of bursting, so a stalled
/// host produces one catch-up tick rather than a backlog.
pub struct DualClock {
    frame: Option<Interval>,
    fallback: Interval,
}

impl DualClock {
    /// Start both clocks. The first tick of each fires immediately.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn new(frame_interval: Option<Duration>) -> Self {
        let frame = frame_interval.map(|period| {
            let mut frame = interval(period);
            frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
            frame
        });

        let mut fallback = interval(FALLBACK_INTERVAL);
        fallback.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self { frame, fallback }
    }

    /// Fallback clock only (no high-frequency source available).
    pub fn fallback_only() -> Self {
        Self::new(None)
    }

    /// Whether the high-frequency source is running.
    pub fn has_frame_source(&self) -> bool {
        self.frame.is_some()
    }

    /// Wait for the next tick from either source.
    ///
    /// Returns the source and the wall-clock time observed after the tick.
    /// Cancel safe.
    pub async fn next(&mut self) -> (ClockSource, Instant) {
        let source = match self.frame.as_mut() {
            Some(frame) => tokio::select! {
                _ = frame.tick() => ClockSource::Frame,
                _ = self.fallback.tick() => ClockSource::Fallback,
            },
            None => {
                self.fallback.tick().await;
                ClockSource::Fallback
            }
        };
        (source, Instant::now())
    }
}
