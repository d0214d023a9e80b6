//! Leaf state machines.
//!
//! None of these types know about ads, scores or each other. The flow
//! layer composes them.

pub mod clock;
pub mod countdown;
pub mod modal;

// Re-export core types
pub use clock::{ClockSource, DualClock, FALLBACK_INTERVAL};
pub use countdown::{CountdownSample, CountdownState, CountdownTick, CountdownTimer, Urgency};
pub use modal::{ModalControl, ModalHooks, ModalLifecycle, ModalPhase};
