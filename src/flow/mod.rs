//! Orchestration
//!
//! Ties the leaf state machines and the ad controller into the
//! continue-or-end flow.

pub mod events;
pub mod game_over;
pub mod offer;
pub mod router;

pub use events::{FlowEvent, FlowEventKind, FlowEvents};
pub use game_over::GameOverScreen;
pub use offer::{ContinueOffer, ExitPath, OfferReport, Outcome, PlayerAction};
pub use router::{route, Route, RunFailure, RunOutcomeRouter, RunState};
