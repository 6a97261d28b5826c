//! Native engine abstraction.
//!
//! The `IntentRecognizer` trait decouples the session shell from the opaque
//! speech-to-intent engine (vendor native library, scripted stub, test
//! double). Capture, voice-activity detection, and grammar decoding all
//! happen behind this seam.
//!
//! `&mut self` intentionally expresses that engines are stateful — capture
//! streams, decoder state, licensing handles. All mutation is therefore
//! serialised through `RecognizerHandle`'s `parking_lot::Mutex`.

pub mod stub;

pub use stub::StubRecognizer;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::intent::Inference;

/// One step of an in-flight listening cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CyclePoll {
    /// The engine is still capturing/decoding; poll again.
    Pending,
    /// End of utterance — the cycle's single inference result.
    Finalized(Inference),
}

/// Contract for speech-to-intent engine backends.
pub trait IntentRecognizer: Send + 'static {
    /// One-time licensing/credential validation against the engine's
    /// activation service. Called once per session, before any capture.
    ///
    /// # Errors
    /// One of the classified activation errors, or `Recognizer` for anything
    /// the engine does not classify.
    fn activate(&mut self, access_key: &str) -> Result<()>;

    /// Begin streaming microphone audio into the engine.
    ///
    /// Returns `Ok(false)` when the engine refuses to open capture; the cycle
    /// is then abandoned without an error.
    fn start_capture(&mut self) -> Result<bool>;

    /// Advance the in-flight cycle. Returns `Finalized` exactly once per
    /// cycle, after which the engine is idle again.
    fn poll(&mut self) -> Result<CyclePoll>;

    /// Abort capture without producing an inference.
    fn stop_capture(&mut self);

    /// Release native resources. The recognizer must not be used afterwards.
    fn dispose(&mut self);
}

/// Thread-safe reference-counted handle to any `IntentRecognizer` implementor.
///
/// Uses `parking_lot::Mutex` for non-poisoning on panic (unlike
/// `std::sync::Mutex`).
#[derive(Clone)]
pub struct RecognizerHandle(pub Arc<Mutex<dyn IntentRecognizer>>);

impl RecognizerHandle {
    /// Wrap any `IntentRecognizer` in a `RecognizerHandle`.
    pub fn new<R: IntentRecognizer>(recognizer: R) -> Self {
        Self(Arc::new(Mutex::new(recognizer)))
    }
}

impl std::fmt::Debug for RecognizerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizerHandle").finish_non_exhaustive()
    }
}
