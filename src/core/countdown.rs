//! Countdown Timer
//!
//! Remaining time is always `total - (now - start)`, recomputed from the
//! captured start timestamp on every sample. Nothing is decremented, so a
//! throttled or irregular clock cannot accumulate drift: the next sample
//! from any source lands on the true value.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::core::clock::ClockSource;

/// Seconds at or below which the countdown turns to `Warning`.
pub const WARNING_THRESHOLD_SECS: f64 = 3.0;

/// Seconds at or below which the countdown turns to `Critical`.
pub const CRITICAL_THRESHOLD_SECS: f64 = 2.0;

/// How close the countdown is to running out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// Plenty of time left.
    Calm,
    /// Three seconds or less.
    Warning,
    /// Two seconds or less.
    Critical,
}

impl Urgency {
    /// Classify a remaining time.
    pub fn from_remaining(remaining_seconds: f64) -> Self {
        if remaining_seconds <= CRITICAL_THRESHOLD_SECS {
            Urgency::Critical
        } else if remaining_seconds <= WARNING_THRESHOLD_SECS {
            Urgency::Warning
        } else {
            Urgency::Calm
        }
    }
}

/// One observation of the countdown, ready for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountdownSample {
    /// Exact remaining time.
    pub remaining_seconds: f64,
    /// `ceil(remaining_seconds)`, the number shown to the player.
    pub display_seconds: u32,
    /// Fraction of the countdown consumed (0.0 to 1.0).
    pub progress: f64,
    /// Display urgency.
    pub urgency: Urgency,
    /// Clock that produced the sample. `None` for a resting timer.
    pub source: Option<ClockSource>,
}

impl CountdownSample {
    fn new(remaining: Duration, total: Duration, source: Option<ClockSource>) -> Self {
        let remaining_seconds = remaining.as_secs_f64();
        let progress = if total.is_zero() {
            1.0
        } else {
            (1.0 - remaining_seconds / total.as_secs_f64()).clamp(0.0, 1.0)
        };

        Self {
            remaining_seconds,
            display_seconds: remaining_seconds.ceil() as u32,
            progress,
            urgency: Urgency::from_remaining(remaining_seconds),
            source,
        }
    }

    /// Sample of a full, not yet started countdown.
    pub fn resting(total: Duration) -> Self {
        Self::new(total, total, None)
    }
}

/// Snapshot of the timer state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountdownState {
    /// Remaining time (seconds).
    pub remaining_seconds: f64,
    /// Configured duration (seconds).
    pub total_seconds: f64,
    /// Expiry has fired and not been reset.
    pub expired: bool,
}

/// Result of sampling the timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CountdownTick {
    /// Timer is not running.
    Idle,
    /// Timer is running.
    Running(CountdownSample),
    /// Deadline reached. Returned once per `start()`.
    Expired(CountdownSample),
}

/// Wall-clock countdown with a one-shot expiry.
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    total: Duration,
    remaining: Duration,
    started_at: Option<Instant>,
    expired: bool,
}

impl CountdownTimer {
    /// Create a resting timer.
    pub fn new(total: Duration) -> Self {
        Self {
            total,
            remaining: total,
            started_at: None,
            expired: false,
        }
    }

    /// Start counting down `duration` from `now`.
    ///
    /// Restarting a running or expired timer re-arms expiry.
    pub fn start(&mut self, duration: Duration, now: Instant) {
        if self.started_at.is_some() {
            debug!("Countdown restarted while running");
        }
        self.total = duration;
        self.remaining = duration;
        self.started_at = Some(now);
        self.expired = false;
    }

    /// Recompute remaining time at `now`.
    ///
    /// Samples never increase, even if sources are observed out of order.
    pub fn sample(&mut self, now: Instant, source: ClockSource) -> CountdownTick {
        let Some(started_at) = self.started_at else {
            return CountdownTick::Idle;
        };

        let elapsed = now.saturating_duration_since(started_at);
        self.remaining = self.total.saturating_sub(elapsed).min(self.remaining);

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(?source, remaining = ?self.remaining, "Countdown sample");

        let sample = CountdownSample::new(self.remaining, self.total, Some(source));
        if self.remaining.is_zero() {
            self.expired = true;
            self.started_at = None;
            debug!(?source, "Countdown expired");
            CountdownTick::Expired(sample)
        } else {
            CountdownTick::Running(sample)
        }
    }

    /// Halt sampling without firing expiry. No-op once expired.
    pub fn stop(&mut self) {
        if self.expired {
            return;
        }
        self.started_at = None;
    }

    /// Restore the full duration and clear expiry.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.remaining = self.total;
        self.expired = false;
    }

    /// Whether the timer is counting down.
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Whether expiry has fired since the last reset.
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Configured duration.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Remaining time as of the last sample.
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Current state snapshot.
    pub fn state(&self) -> CountdownState {
        CountdownState {
            remaining_seconds: self.remaining.as_secs_f64(),
            total_seconds: self.total.as_secs_f64(),
            expired: self.expired,
        }
    }
}
