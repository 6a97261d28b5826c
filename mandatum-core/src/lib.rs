//! # mandatum-core
//!
//! Reusable speech-to-intent session shell.
//!
//! ## Architecture
//!
//! ```text
//! Microphone ──▶ opaque native engine (capture, VAD, grammar decoding)
//!                        │ IntentRecognizer::poll()
//!                 cycle worker (spawn_blocking)
//!                        │
//!          broadcast::Sender<InferenceEvent>
//! ```
//!
//! The engine does the acoustic work internally and is never reimplemented
//! here. This crate owns everything around it: model provisioning, microphone
//! permission resolution, session lifecycle, and typed event plumbing.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod intent;
pub mod ipc;
pub mod permission;
pub mod provision;
pub mod recognizer;

// Convenience re-exports for downstream crates
pub use engine::{IntentEngine, SessionConfig};
pub use error::MandatumError;
pub use intent::Inference;
pub use ipc::events::{EngineStatus, EngineStatusEvent, InferenceEvent};
pub use permission::{MicrophoneGate, PermissionDecision};
pub use provision::ModelProvisioner;
pub use recognizer::{CyclePoll, IntentRecognizer, RecognizerHandle, StubRecognizer};
