//! Rewarded Ad Lifecycle
//!
//! The platform SDK is reduced to a provider capability with a fixed event
//! vocabulary. Events arrive as messages, so the controller's transitions
//! never depend on SDK callback shapes.

pub mod controller;
pub mod provider;
pub mod scripted;

pub use controller::{AdError, AdLoadController, AdLoadState, AdResolution};
pub use provider::{AdEnvelope, AdEvent, AdEventSink, RequestId, RewardedAdProvider};
pub use scripted::{LoadScript, ScriptedAdProvider, ShowScript};
