//! Event types emitted over the Tauri IPC channel.
//!
//! ## Channel names
//!
//! | Event | Channel |
//! |-------|---------|
//! | `InferenceEvent` | `"mandatum://inference"` |
//! | `EngineStatusEvent` | `"mandatum://status"` |
//!
//! The app additionally emits its UI snapshot on `"mandatum://ui"`; that type
//! lives with the UI state machine in mandatum-app.

use serde::{Deserialize, Serialize};

use crate::intent::Inference;

// ---------------------------------------------------------------------------
// Inference events
// ---------------------------------------------------------------------------

/// Emitted on channel `"mandatum://inference"` when a listening cycle
/// completes with a result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// The intent/slot structure decoded from the spoken phrase.
    pub inference: Inference,
}

// ---------------------------------------------------------------------------
// Engine status events
// ---------------------------------------------------------------------------

/// Emitted on channel `"mandatum://status"` when the engine state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatusEvent {
    pub status: EngineStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Current state of the Mandatum engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// Engine constructed; access key validation pending or in progress.
    Activating,
    /// Activated; no listening cycle in flight.
    Ready,
    /// Actively capturing audio, waiting for the engine to finalize.
    Listening,
    /// Unrecoverable error — restart required.
    Failed,
}
