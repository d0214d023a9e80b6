//! # Continue Flow
//!
//! Continue-or-end orchestration for a casual game run: after a failed
//! attempt, decide between a rewarded-ad continue offer and game over.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CONTINUE FLOW                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Leaf state machines                      │
//! │  ├── clock.rs     - Frame + fallback clock sources           │
//! │  ├── countdown.rs - Wall-clock countdown, fires expiry once  │
//! │  └── modal.rs     - Open/close lifecycle with four hooks     │
//! │                                                              │
//! │  ads/             - Rewarded-ad lifecycle                    │
//! │  ├── provider.rs  - Provider capability + event vocabulary   │
//! │  ├── controller.rs- idle → loading → loaded/failed           │
//! │  └── scripted.rs  - Timed scripted provider                  │
//! │                                                              │
//! │  flow/            - Orchestration                            │
//! │  ├── offer.rs     - Continue offer, exactly one outcome      │
//! │  ├── game_over.rs - Terminal game-over screen                │
//! │  ├── router.rs    - Fail count → offer or game over          │
//! │  └── events.rs    - Broadcast log of flow decisions          │
//! │                                                              │
//! │  platform.rs      - Audio + game engine collaborators        │
//! │  config.rs        - Flow configuration                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Execution Model
//!
//! Everything runs on one cooperative event loop (a tokio `current_thread`
//! runtime). Ad SDK callbacks, clock ticks and player input all arrive as
//! channel messages, and [`flow::offer::ContinueOffer::present`] returns a
//! single [`flow::offer::OfferReport`] per presentation.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod ads;
pub mod config;
pub mod core;
pub mod flow;
pub mod platform;

// Re-export commonly used types
pub use ads::{AdError, AdLoadController, AdLoadState, AdResolution, RewardedAdProvider};
pub use config::{ConfigError, FlowConfig};
pub use crate::core::countdown::{CountdownSample, CountdownState, CountdownTimer};
pub use crate::core::modal::{ModalHooks, ModalLifecycle, ModalPhase};
pub use flow::events::{FlowEvent, FlowEventKind};
pub use flow::game_over::GameOverScreen;
pub use flow::offer::{ContinueOffer, ExitPath, OfferReport, Outcome, PlayerAction};
pub use flow::router::{route, Route, RunFailure, RunOutcomeRouter, RunState};
pub use platform::{AudioService, GameEngine};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Score carried from the game engine to game over. Never mutated here.
pub type Score = u64;

/// Consecutive failures in the current run. Owned by the game engine.
pub type FailCount = u32;

/// Fail count at which the continue offer is skipped.
pub const DEFAULT_FAIL_LIMIT: FailCount = 2;

/// Continue offer countdown (seconds).
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 5.0;

/// High-frequency clock rate (Hz).
pub const DEFAULT_FRAME_RATE_HZ: u32 = 60;
