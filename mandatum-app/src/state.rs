//! Tauri application state and the view-layer state machine.
//!
//! `AppState` is managed via `app.manage(...)` and injected into command
//! handlers by Tauri's `State<'_, AppState>` extractor. `UiModel` is the
//! single source of truth for what the main screen shows; the webview only
//! renders snapshots.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use mandatum_core::{Inference, IntentEngine, MicrophoneGate};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Shared application state — available in every `#[tauri::command]`.
pub struct AppState {
    /// The engine handle. Wrapped in `Arc` so it can be cloned into
    /// event-forwarding tasks started after setup.
    pub engine: Arc<IntentEngine>,
    /// Microphone permission resolution strategy.
    pub gate: Arc<dyn MicrophoneGate>,
    /// The view-layer state machine.
    pub ui: Arc<Mutex<UiModel>>,
    /// Immutable session facts for the about panel.
    pub session_info: SessionInfo,
    /// Persisted app settings cache.
    pub settings: Arc<Mutex<crate::settings::AppSettings>>,
    /// Absolute path to `settings.json`.
    pub settings_path: std::path::PathBuf,
    /// Guard to prevent overlapping start commands.
    pub start_inflight: Arc<AtomicBool>,
    /// Count of start taps accepted for processing.
    pub starts_requested: Arc<AtomicUsize>,
    /// Count of start attempts aborted by permission denial.
    pub starts_denied: Arc<AtomicUsize>,
    /// Count of inference results rendered to the panel.
    pub results_rendered: Arc<AtomicUsize>,
}

impl AppState {
    pub fn diagnostics_snapshot(&self) -> AppDiagnostics {
        let cycles = self.engine.diagnostics_snapshot();
        AppDiagnostics {
            starts_requested: self.starts_requested.load(Ordering::Relaxed),
            starts_denied: self.starts_denied.load(Ordering::Relaxed),
            results_rendered: self.results_rendered.load(Ordering::Relaxed),
            cycles_started: cycles.cycles_started,
            cycles_completed: cycles.cycles_completed,
            cycles_cancelled: cycles.cycles_cancelled,
            capture_refused: cycles.capture_refused,
            recognizer_errors: cycles.recognizer_errors,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDiagnostics {
    pub starts_requested: usize,
    pub starts_denied: usize,
    pub results_rendered: usize,
    pub cycles_started: usize,
    pub cycles_completed: usize,
    pub cycles_cancelled: usize,
    pub capture_refused: usize,
    pub recognizer_errors: usize,
}

/// Immutable session facts exposed to the webview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub display_name: String,
    pub bundle_identifier: String,
    pub variant: String,
    pub masked_access_key: String,
    pub model_path: String,
}

// ---------------------------------------------------------------------------
// UI state machine
// ---------------------------------------------------------------------------

/// Observable phase of the main screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiPhase {
    Idle,
    Starting,
    Listening,
}

/// The view-layer state machine.
///
/// ```text
/// Idle ──tap──▶ Starting ──capture open──▶ Listening ──inference──▶ Idle (result shown)
///                  │ permission denied / capture refused
///                  ▼
///                Idle (indicators reverted, no banner)
/// ```
///
/// The error overlay is orthogonal to the phase: any failure engages it, it
/// disables the button regardless of phase, and nothing clears it for the
/// rest of the session.
#[derive(Debug, Clone)]
pub struct UiModel {
    phase: UiPhase,
    display_text: String,
    error_message: Option<String>,
}

impl UiModel {
    pub fn new() -> Self {
        Self {
            phase: UiPhase::Idle,
            display_text: String::new(),
            error_message: None,
        }
    }

    /// Button tap: Idle → Starting. Returns `false` (state unchanged) while
    /// a start is pending, a cycle is in flight, or the error overlay is
    /// engaged.
    pub fn begin_start(&mut self) -> bool {
        if self.is_error() || self.phase != UiPhase::Idle {
            return false;
        }
        self.phase = UiPhase::Starting;
        true
    }

    /// Capture confirmed: Starting → Listening, result panel cleared.
    pub fn capture_started(&mut self) {
        self.phase = UiPhase::Listening;
        self.display_text.clear();
    }

    /// Permission denied or capture refused: revert the Starting indicators.
    /// Deliberately shows no banner; the button is immediately tappable again.
    pub fn revert_start(&mut self) {
        if self.phase == UiPhase::Starting {
            self.phase = UiPhase::Idle;
        }
    }

    /// Inference received: Listening → Idle with the result panel populated.
    pub fn inference_received(&mut self, inference: &Inference) {
        self.phase = UiPhase::Idle;
        self.display_text = inference.render();
    }

    /// Cycle aborted without a result: Listening → Idle, panel untouched.
    pub fn cycle_cancelled(&mut self) {
        if self.phase == UiPhase::Listening {
            self.phase = UiPhase::Idle;
        }
    }

    /// Engage the error overlay. Terminal for the session.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn is_error(&self) -> bool {
        self.error_message.is_some()
    }

    pub fn phase(&self) -> UiPhase {
        self.phase
    }

    /// Serializable view of the current state for the webview.
    pub fn snapshot(&self) -> UiSnapshot {
        UiSnapshot {
            phase: self.phase,
            button_label: match self.phase {
                UiPhase::Idle => "Start",
                UiPhase::Starting | UiPhase::Listening => "…",
            }
            .to_string(),
            button_enabled: self.phase == UiPhase::Idle && !self.is_error(),
            display_text: self.display_text.clone(),
            is_error: self.is_error(),
            error_message: self.error_message.clone(),
        }
    }
}

impl Default for UiModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Emitted on channel `"mandatum://ui"` after every state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSnapshot {
    pub phase: UiPhase,
    pub button_label: String,
    pub button_enabled: bool,
    pub display_text: String,
    pub is_error: bool,
    pub error_message: Option<String>,
}
