//! Blocking listening-cycle worker.
//!
//! ## Cycle (per iteration)
//!
//! ```text
//! 1. Cancelled? → stop capture, status = Ready, exit (no event)
//! 2. Poll the recognizer
//!    Pending          → sleep briefly, loop
//!    Finalized(inf)   → status = Ready, broadcast InferenceEvent, exit
//!    Err(e)           → status = Failed (terminal), exit
//! ```
//!
//! Exactly one of {inference event, failure status} ends a cycle. The whole
//! loop runs in `spawn_blocking`, keeping the Tokio async executor free for
//! Tauri IPC.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use std::sync::OnceLock;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::{
    ipc::events::{EngineStatus, EngineStatusEvent, InferenceEvent},
    recognizer::{CyclePoll, RecognizerHandle},
};

/// Sleep between recognizer polls while the cycle is pending.
const DEFAULT_POLL_SLEEP_MS: u64 = 5;

pub struct CycleDiagnostics {
    pub cycles_started: AtomicUsize,
    pub cycles_completed: AtomicUsize,
    pub cycles_cancelled: AtomicUsize,
    pub capture_refused: AtomicUsize,
    pub recognizer_errors: AtomicUsize,
}

impl Default for CycleDiagnostics {
    fn default() -> Self {
        Self {
            cycles_started: AtomicUsize::new(0),
            cycles_completed: AtomicUsize::new(0),
            cycles_cancelled: AtomicUsize::new(0),
            capture_refused: AtomicUsize::new(0),
            recognizer_errors: AtomicUsize::new(0),
        }
    }
}

impl CycleDiagnostics {
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_cancelled: self.cycles_cancelled.load(Ordering::Relaxed),
            capture_refused: self.capture_refused.load(Ordering::Relaxed),
            recognizer_errors: self.recognizer_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsSnapshot {
    pub cycles_started: usize,
    pub cycles_completed: usize,
    pub cycles_cancelled: usize,
    pub capture_refused: usize,
    pub recognizer_errors: usize,
}

/// All context the cycle worker needs, passed as one struct so the closure
/// stays tidy.
pub struct CycleContext {
    pub recognizer: RecognizerHandle,
    pub listening: Arc<AtomicBool>,
    pub inference_tx: broadcast::Sender<InferenceEvent>,
    pub status_tx: broadcast::Sender<EngineStatusEvent>,
    pub status: Arc<Mutex<EngineStatus>>,
    pub seq: Arc<AtomicU64>,
    pub diagnostics: Arc<CycleDiagnostics>,
}

/// Run one listening cycle until it finalizes, is cancelled, or fails.
///
/// Capture must already be open on the recognizer.
pub fn run(ctx: CycleContext) {
    info!("listening cycle worker started");

    loop {
        // ── 1. Cancellation ───────────────────────────────────────────────
        if !ctx.listening.load(Ordering::Relaxed) {
            ctx.recognizer.0.lock().stop_capture();
            ctx.diagnostics
                .cycles_cancelled
                .fetch_add(1, Ordering::Relaxed);
            set_status(&ctx, EngineStatus::Ready, None);
            info!("listening cycle cancelled — no inference emitted");
            return;
        }

        // ── 2. Poll the recognizer ────────────────────────────────────────
        let polled = ctx.recognizer.0.lock().poll();
        match polled {
            Ok(CyclePoll::Pending) => {
                std::thread::sleep(std::time::Duration::from_millis(poll_sleep_ms()));
            }
            Ok(CyclePoll::Finalized(inference)) => {
                ctx.listening.store(false, Ordering::SeqCst);
                ctx.diagnostics
                    .cycles_completed
                    .fetch_add(1, Ordering::Relaxed);
                set_status(&ctx, EngineStatus::Ready, None);

                let seq = ctx.seq.fetch_add(1, Ordering::Relaxed);
                let understood = inference.is_understood;
                let emitted = ctx
                    .inference_tx
                    .send(InferenceEvent { seq, inference })
                    .is_ok();
                info!(seq, understood, emitted, "inference emitted — cycle complete");
                return;
            }
            Err(e) => {
                ctx.listening.store(false, Ordering::SeqCst);
                ctx.diagnostics
                    .recognizer_errors
                    .fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "recognizer error — engine failed");
                set_status(&ctx, EngineStatus::Failed, Some(e.to_string()));
                return;
            }
        }
    }
}

fn poll_sleep_ms() -> u64 {
    static POLL_SLEEP_MS: OnceLock<u64> = OnceLock::new();
    *POLL_SLEEP_MS.get_or_init(|| {
        std::env::var("MANDATUM_CYCLE_POLL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(|v| v.clamp(1, 50))
            .unwrap_or(DEFAULT_POLL_SLEEP_MS)
    })
}

fn set_status(ctx: &CycleContext, new_status: EngineStatus, detail: Option<String>) {
    *ctx.status.lock() = new_status;
    let _ = ctx.status_tx.send(EngineStatusEvent {
        status: new_status,
        detail,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;
    use std::time::{Duration, Instant};

    use tokio::sync::broadcast::error::TryRecvError;

    use crate::intent::Inference;
    use crate::recognizer::StubRecognizer;

    fn context(
        recognizer: RecognizerHandle,
        listening: bool,
    ) -> (
        CycleContext,
        broadcast::Receiver<InferenceEvent>,
        broadcast::Receiver<EngineStatusEvent>,
    ) {
        let (inference_tx, inference_rx) = broadcast::channel(8);
        let (status_tx, status_rx) = broadcast::channel(8);
        let ctx = CycleContext {
            recognizer,
            listening: Arc::new(AtomicBool::new(listening)),
            inference_tx,
            status_tx,
            status: Arc::new(Mutex::new(EngineStatus::Listening)),
            seq: Arc::new(AtomicU64::new(0)),
            diagnostics: Arc::new(CycleDiagnostics::default()),
        };
        (ctx, inference_rx, status_rx)
    }

    fn capturing_stub(polls: u32) -> RecognizerHandle {
        let mut stub = StubRecognizer::new().with_polls_per_cycle(polls);
        stub.activate("TEST-KEY==").expect("activation accepted");
        assert!(stub.start_capture().expect("capture opens"));
        RecognizerHandle::new(stub)
    }

    fn recv_event_with_timeout(
        rx: &mut broadcast::Receiver<InferenceEvent>,
        timeout: Duration,
    ) -> InferenceEvent {
        let start = Instant::now();
        loop {
            match rx.try_recv() {
                Ok(ev) => return ev,
                Err(TryRecvError::Empty) => {
                    if start.elapsed() >= timeout {
                        panic!("timed out waiting for inference event");
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Closed) => panic!("inference channel closed unexpectedly"),
            }
        }
    }

    #[test]
    fn run_finalizes_and_returns_to_ready() {
        let (ctx, mut inference_rx, _status_rx) = context(capturing_stub(2), true);
        let status = Arc::clone(&ctx.status);
        let diagnostics = Arc::clone(&ctx.diagnostics);

        let handle = thread::spawn(move || run(ctx));
        let event = recv_event_with_timeout(&mut inference_rx, Duration::from_secs(1));
        handle.join().expect("cycle worker panicked");

        assert_eq!(event.seq, 0);
        assert_eq!(event.inference.intent.as_deref(), Some("turnLightOn"));
        assert_eq!(*status.lock(), EngineStatus::Ready);
        assert_eq!(diagnostics.snapshot().cycles_completed, 1);
    }

    #[test]
    fn run_exits_without_event_when_cancelled_up_front() {
        let (ctx, mut inference_rx, mut status_rx) = context(capturing_stub(100), false);
        let diagnostics = Arc::clone(&ctx.diagnostics);

        run(ctx);

        assert!(matches!(inference_rx.try_recv(), Err(TryRecvError::Empty)));
        let status = status_rx.try_recv().expect("ready status broadcast");
        assert_eq!(status.status, EngineStatus::Ready);
        assert_eq!(diagnostics.snapshot().cycles_cancelled, 1);
    }

    #[test]
    fn run_marks_engine_failed_on_recognizer_error() {
        let mut stub = StubRecognizer::new().with_poll_failure();
        stub.activate("TEST-KEY==").expect("activation accepted");
        assert!(stub.start_capture().expect("capture opens"));

        let (ctx, mut inference_rx, mut status_rx) =
            context(RecognizerHandle::new(stub), true);
        let status = Arc::clone(&ctx.status);
        let diagnostics = Arc::clone(&ctx.diagnostics);

        run(ctx);

        assert!(matches!(inference_rx.try_recv(), Err(TryRecvError::Empty)));
        let event = status_rx.try_recv().expect("failed status broadcast");
        assert_eq!(event.status, EngineStatus::Failed);
        assert!(event
            .detail
            .expect("failure carries detail")
            .contains("scripted mid-cycle failure"));
        assert_eq!(*status.lock(), EngineStatus::Failed);
        assert_eq!(diagnostics.snapshot().recognizer_errors, 1);
    }

    #[test]
    fn run_emits_a_not_understood_result_as_is() {
        let mut stub = StubRecognizer::new()
            .with_polls_per_cycle(0)
            .with_script(vec![Inference::not_understood()]);
        stub.activate("TEST-KEY==").expect("activation accepted");
        assert!(stub.start_capture().expect("capture opens"));

        let (ctx, mut inference_rx, _status_rx) = context(RecognizerHandle::new(stub), true);
        run(ctx);

        let event = recv_event_with_timeout(&mut inference_rx, Duration::from_secs(1));
        assert!(!event.inference.is_understood);
        assert!(event.inference.intent.is_none());
    }
}
