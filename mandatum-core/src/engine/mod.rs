//! `IntentEngine` — per-session lifecycle controller for the native engine.
//!
//! ## Lifecycle
//!
//! ```text
//! IntentEngine::new()
//!     └─► activate()         → access key validated, status = Activating → Ready
//!         └─► start()        → capture open, cycle worker spawned, status = Listening
//!             └─► inference  → event broadcast, status = Ready (cycle repeats)
//!                 cancel()   → capture aborted, no event, status = Ready
//!                 failure    → status = Failed (terminal)
//! shutdown()                 → recognizer disposed
//! ```
//!
//! `Failed` is terminal for the session: `start()` refuses with `NotReady`
//! and no recovery path exists short of an app restart.
//!
//! ## Threading
//!
//! The native engine owns its capture stream, so each listening cycle runs on
//! a `spawn_blocking` worker that polls the recognizer. A sync mpsc channel
//! propagates the capture-open confirmation back to the `start()` caller.

pub mod cycle;

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    error::{MandatumError, Result},
    ipc::events::{EngineStatus, EngineStatusEvent, InferenceEvent},
    recognizer::RecognizerHandle,
};

/// Broadcast channel capacity: events buffered for slow consumers.
const BROADCAST_CAP: usize = 64;

/// Immutable per-process session credentials.
///
/// Built once at startup from settings/environment and never mutated.
#[derive(Clone)]
pub struct SessionConfig {
    /// Opaque credential presented to the engine's activation service.
    pub access_key: String,
    /// Absolute path of the provisioned model artifact.
    pub model_path: std::path::PathBuf,
}

impl SessionConfig {
    pub fn new(access_key: impl Into<String>, model_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            access_key: access_key.into(),
            model_path: model_path.into(),
        }
    }

    /// Access key with everything past the first four characters elided, for
    /// logs and the about panel.
    pub fn masked_access_key(&self) -> String {
        let key = self.access_key.trim();
        if key.len() <= 4 {
            "••••".to_string()
        } else {
            let head: String = key.chars().take(4).collect();
            format!("{head}…")
        }
    }
}

// The access key is a credential — keep it out of Debug output.
impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("access_key", &self.masked_access_key())
            .field("model_path", &self.model_path)
            .finish()
    }
}

/// The per-session engine handle.
///
/// `IntentEngine` is `Send + Sync` — all fields use interior mutability.
/// Wrap in `Arc<IntentEngine>` to share between the Tauri app state and
/// event-forwarding async tasks.
pub struct IntentEngine {
    config: SessionConfig,
    recognizer: RecognizerHandle,
    /// `true` while a listening cycle is in flight.
    listening: Arc<AtomicBool>,
    /// Canonical status (written under Mutex, read from commands).
    status: Arc<Mutex<EngineStatus>>,
    /// Broadcast sender for inference events.
    inference_tx: broadcast::Sender<InferenceEvent>,
    /// Broadcast sender for status events.
    status_tx: broadcast::Sender<EngineStatusEvent>,
    /// Monotonically increasing inference sequence counter.
    seq: Arc<AtomicU64>,
    /// Shared cycle counters.
    diagnostics: Arc<cycle::CycleDiagnostics>,
}

impl IntentEngine {
    /// Create a new engine handle. Cheap; call `activate()` before `start()`.
    pub fn new(config: SessionConfig, recognizer: RecognizerHandle) -> Self {
        let (inference_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);

        Self {
            config,
            recognizer,
            listening: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(EngineStatus::Activating)),
            inference_tx,
            status_tx,
            seq: Arc::new(AtomicU64::new(0)),
            diagnostics: Arc::new(cycle::CycleDiagnostics::default()),
        }
    }

    /// Validate the session credentials and the model artifact.
    ///
    /// Call once at application startup, before `start()`.
    ///
    /// # Errors
    /// One of the classified activation errors, or `ModelNotFound` when the
    /// provisioned artifact vanished. The engine is `Failed` afterwards.
    pub fn activate(&self) -> Result<()> {
        self.set_status(EngineStatus::Activating, None);
        info!(session = ?self.config, "activating engine");

        if !self.config.model_path.is_file() {
            let err = MandatumError::ModelNotFound {
                path: self.config.model_path.clone(),
            };
            self.set_status(EngineStatus::Failed, Some(err.to_string()));
            return Err(err);
        }

        match self.recognizer.0.lock().activate(&self.config.access_key) {
            Ok(()) => {
                self.set_status(EngineStatus::Ready, None);
                info!("engine activated — ready");
                Ok(())
            }
            Err(e) => {
                self.set_status(EngineStatus::Failed, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Open a listening cycle.
    ///
    /// Blocks until the recognizer confirms capture open (or refuses), then
    /// returns whether capture actually started. The cycle itself continues
    /// on a background blocking worker until it finalizes, is cancelled, or
    /// fails.
    ///
    /// # Errors
    /// - `MandatumError::AlreadyListening` while a cycle is in flight.
    /// - `MandatumError::NotReady` before activation or after a failure.
    pub fn start(&self) -> Result<bool> {
        match self.status() {
            EngineStatus::Ready => {}
            EngineStatus::Listening => return Err(MandatumError::AlreadyListening),
            EngineStatus::Activating | EngineStatus::Failed => {
                return Err(MandatumError::NotReady)
            }
        }
        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(MandatumError::AlreadyListening);
        }

        self.diagnostics
            .cycles_started
            .fetch_add(1, Ordering::Relaxed);
        self.set_status(EngineStatus::Listening, None);

        // Clone all Arc-wrapped state before moving into the closure.
        let recognizer = self.recognizer.clone();
        let listening = Arc::clone(&self.listening);
        let inference_tx = self.inference_tx.clone();
        let status_tx = self.status_tx.clone();
        let status = Arc::clone(&self.status);
        let seq = Arc::clone(&self.seq);
        let diagnostics = Arc::clone(&self.diagnostics);

        // Sync handshake: the worker confirms capture open success/refusal.
        let (open_tx, open_rx) = std::sync::mpsc::channel::<Result<bool>>();

        tokio::task::spawn_blocking(move || {
            match recognizer.0.lock().start_capture() {
                Ok(true) => {
                    let _ = open_tx.send(Ok(true));
                }
                Ok(false) => {
                    listening.store(false, Ordering::SeqCst);
                    let _ = open_tx.send(Ok(false));
                    return;
                }
                Err(e) => {
                    listening.store(false, Ordering::SeqCst);
                    let _ = open_tx.send(Err(e));
                    return;
                }
            }

            cycle::run(cycle::CycleContext {
                recognizer,
                listening,
                inference_tx,
                status_tx,
                status,
                seq,
                diagnostics,
            });
        });

        // Block start() until capture open is confirmed.
        match open_rx.recv() {
            Ok(Ok(true)) => {
                info!("listening cycle started");
                Ok(true)
            }
            Ok(Ok(false)) => {
                self.diagnostics
                    .capture_refused
                    .fetch_add(1, Ordering::Relaxed);
                self.set_status(EngineStatus::Ready, None);
                warn!("recognizer refused to open capture");
                Ok(false)
            }
            Ok(Err(e)) => {
                self.set_status(EngineStatus::Failed, Some(e.to_string()));
                Err(e)
            }
            Err(_) => {
                // Channel closed before a message was sent — worker panicked?
                self.listening.store(false, Ordering::SeqCst);
                self.set_status(EngineStatus::Failed, Some("capture worker died".into()));
                Err(MandatumError::Other(anyhow::anyhow!(
                    "capture worker died unexpectedly"
                )))
            }
        }
    }

    /// Abort the in-flight listening cycle without producing an inference.
    ///
    /// # Errors
    /// - `MandatumError::NotListening` when no cycle is in flight.
    pub fn cancel(&self) -> Result<()> {
        if !self.listening.load(Ordering::SeqCst) {
            return Err(MandatumError::NotListening);
        }

        self.listening.store(false, Ordering::SeqCst);
        info!("listening cycle cancel requested");
        Ok(())
    }

    /// Dispose the recognizer, releasing native resources.
    ///
    /// Call exactly once on app teardown; any in-flight cycle is abandoned.
    pub fn shutdown(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            info!("shutdown requested with a cycle in flight");
        }
        self.recognizer.0.lock().dispose();
        info!("engine shut down — recognizer disposed");
    }

    /// Current engine status (snapshot).
    pub fn status(&self) -> EngineStatus {
        *self.status.lock()
    }

    /// The immutable session credentials this engine was built with.
    pub fn session(&self) -> &SessionConfig {
        &self.config
    }

    /// Subscribe to inference events.
    pub fn subscribe_inferences(&self) -> broadcast::Receiver<InferenceEvent> {
        self.inference_tx.subscribe()
    }

    /// Subscribe to status change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<EngineStatusEvent> {
        self.status_tx.subscribe()
    }

    /// Snapshot of cycle counters for observability.
    pub fn diagnostics_snapshot(&self) -> cycle::DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn set_status(&self, new_status: EngineStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(EngineStatusEvent {
            status: new_status,
            detail,
        });
    }
}
