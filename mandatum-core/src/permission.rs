//! Microphone permission gate.
//!
//! Desktop Linux and Windows have no runtime microphone prompt, so the stock
//! gate resolves immediately. The trait seam exists so hosts with a real
//! permission dialog — and tests — can supply their own resolution.

use serde::{Deserialize, Serialize};

/// Outcome of a RECORD_AUDIO permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Granted,
    Denied,
    /// Denied with "don't ask again" — later requests resolve without a dialog.
    NeverAskAgain,
}

impl PermissionDecision {
    pub fn is_granted(self) -> bool {
        self == PermissionDecision::Granted
    }
}

/// Resolves microphone access, blocking until the OS answers.
pub trait MicrophoneGate: Send + Sync + 'static {
    fn request(&self) -> PermissionDecision;
}

/// Gate for platforms without a runtime permission dialog.
#[derive(Debug, Default)]
pub struct AutoGrantGate;

impl MicrophoneGate for AutoGrantGate {
    fn request(&self) -> PermissionDecision {
        PermissionDecision::Granted
    }
}

/// Gate with a fixed resolution, for tests and for forcing the denied path
/// from settings.
#[derive(Debug)]
pub struct StaticGate(pub PermissionDecision);

impl MicrophoneGate for StaticGate {
    fn request(&self) -> PermissionDecision {
        self.0
    }
}
