//! Platform Collaborators
//!
//! Narrow interfaces to the services the flow drives but does not own:
//! game audio and the game engine. Recording implementations are provided
//! for the demo binary and tests.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::flow::router::RunFailure;
use crate::{FailCount, Score};

/// Game audio, paused while an ad is visible.
pub trait AudioService {
    /// Pause all game audio.
    fn pause(&mut self);

    /// Resume game audio.
    fn resume(&mut self);
}

/// Game engine hand-off points.
pub trait GameEngine {
    /// Continue the failed run where it stopped.
    fn resume_run(&mut self);

    /// Zero out the run state after the player gave up or timed out.
    fn end_run(&mut self);

    /// Start a fresh run. Resets score and fail count.
    fn restart(&mut self);
}

/// Audio call observed by [`RecordingAudio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCall {
    /// `pause()` was called.
    Pause,
    /// `resume()` was called.
    Resume,
}

/// Audio service that records calls. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    calls: Arc<Mutex<Vec<AudioCall>>>,
}

impl RecordingAudio {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls so far, oldest first.
    pub fn calls(&self) -> Vec<AudioCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Whether audio is currently paused.
    pub fn is_paused(&self) -> bool {
        self.calls().last() == Some(&AudioCall::Pause)
    }

    fn record(&self, call: AudioCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl AudioService for RecordingAudio {
    fn pause(&mut self) {
        info!("Game audio paused");
        self.record(AudioCall::Pause);
    }

    fn resume(&mut self) {
        info!("Game audio resumed");
        self.record(AudioCall::Resume);
    }
}

/// Engine call observed by [`RecordingEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineCall {
    /// `resume_run()` was called.
    ResumeRun,
    /// `end_run()` was called.
    EndRun,
    /// `restart()` was called.
    Restart,
}

/// Minimal engine: tracks score and fail count, records hand-offs.
#[derive(Debug, Clone, Default)]
pub struct RecordingEngine {
    score: Score,
    fail_count: FailCount,
    calls: Vec<EngineCall>,
}

impl RecordingEngine {
    /// Fresh run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Award points.
    pub fn add_points(&mut self, points: Score) {
        self.score += points;
    }

    /// Register a failure and capture the state handed to the router.
    pub fn fail(&mut self) -> RunFailure {
        self.fail_count += 1;
        RunFailure {
            fail_count: self.fail_count,
            score: self.score,
        }
    }

    /// Current score.
    pub fn score(&self) -> Score {
        self.score
    }

    /// Current fail count.
    pub fn fail_count(&self) -> FailCount {
        self.fail_count
    }

    /// Hand-offs so far, oldest first.
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }
}

impl GameEngine for RecordingEngine {
    fn resume_run(&mut self) {
        info!(score = self.score, "Run resumed");
        self.calls.push(EngineCall::ResumeRun);
    }

    fn end_run(&mut self) {
        info!(score = self.score, "Run ended");
        self.score = 0;
        self.calls.push(EngineCall::EndRun);
    }

    fn restart(&mut self) {
        info!("Run restarted");
        self.score = 0;
        self.fail_count = 0;
        self.calls.push(EngineCall::Restart);
    }
}
