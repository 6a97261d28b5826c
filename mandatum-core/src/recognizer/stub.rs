//! `StubRecognizer` — scripted backend used while no native engine is linked.
//!
//! Produces deterministic inferences from a built-in smart-lighting script so
//! the full session/UI/IPC surface can be exercised end-to-end, and exposes
//! scripted activation/capture faults so every classified error path is
//! reachable from tests.

use tracing::debug;

use crate::error::{MandatumError, Result};
use crate::intent::Inference;
use crate::recognizer::{CyclePoll, IntentRecognizer};

/// Classified activation failure a `StubRecognizer` can be scripted to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationFault {
    InvalidKey,
    Failed,
    LimitReached,
    Refused,
    Throttled,
}

impl ActivationFault {
    fn into_error(self, access_key: &str) -> MandatumError {
        match self {
            Self::InvalidKey => MandatumError::InvalidAccessKey {
                access_key: access_key.to_string(),
                detail: "activation returned INVALID_ARGUMENT".into(),
            },
            Self::Failed => MandatumError::ActivationFailed,
            Self::LimitReached => MandatumError::ActivationLimitReached,
            Self::Refused => MandatumError::ActivationRefused,
            Self::Throttled => MandatumError::ActivationThrottled,
        }
    }
}

/// Scripted stand-in for the native speech-to-intent engine.
///
/// Each capture cycle reports `Pending` for a fixed number of polls, then
/// finalizes with the next entry of the script (wrapping around).
pub struct StubRecognizer {
    script: Vec<Inference>,
    polls_per_cycle: u32,
    activation_fault: Option<ActivationFault>,
    refuse_capture: bool,
    fail_poll: bool,
    polls_remaining: u32,
    capturing: bool,
    activated: bool,
    disposed: bool,
    cycles_finalized: usize,
}

impl StubRecognizer {
    pub fn new() -> Self {
        Self {
            script: default_script(),
            polls_per_cycle: 3,
            activation_fault: None,
            refuse_capture: false,
            fail_poll: false,
            polls_remaining: 0,
            capturing: false,
            activated: false,
            disposed: false,
            cycles_finalized: 0,
        }
    }

    /// Replace the built-in script. An empty script is rejected.
    pub fn with_script(mut self, script: Vec<Inference>) -> Self {
        assert!(!script.is_empty(), "stub script must not be empty");
        self.script = script;
        self
    }

    /// Number of `Pending` polls before each cycle finalizes.
    pub fn with_polls_per_cycle(mut self, polls: u32) -> Self {
        self.polls_per_cycle = polls;
        self
    }

    /// Script `activate()` to fail with the given classified error.
    pub fn with_activation_fault(mut self, fault: ActivationFault) -> Self {
        self.activation_fault = Some(fault);
        self
    }

    /// Script `start_capture()` to refuse (return `false`).
    pub fn with_capture_refusal(mut self) -> Self {
        self.refuse_capture = true;
        self
    }

    /// Script `poll()` to fail mid-cycle.
    pub fn with_poll_failure(mut self) -> Self {
        self.fail_poll = true;
        self
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.disposed {
            return Err(MandatumError::Recognizer(
                "recognizer has been disposed".into(),
            ));
        }
        Ok(())
    }
}

impl Default for StubRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentRecognizer for StubRecognizer {
    fn activate(&mut self, access_key: &str) -> Result<()> {
        self.ensure_usable()?;
        if let Some(fault) = self.activation_fault {
            return Err(fault.into_error(access_key));
        }
        if access_key.trim().is_empty() {
            return Err(MandatumError::InvalidAccessKey {
                access_key: access_key.to_string(),
                detail: "accessKey must not be blank".into(),
            });
        }
        self.activated = true;
        debug!("StubRecognizer activated");
        Ok(())
    }

    fn start_capture(&mut self) -> Result<bool> {
        self.ensure_usable()?;
        if !self.activated {
            return Err(MandatumError::Recognizer(
                "start_capture called before activation".into(),
            ));
        }
        if self.refuse_capture {
            debug!("StubRecognizer refusing capture as scripted");
            return Ok(false);
        }
        self.capturing = true;
        self.polls_remaining = self.polls_per_cycle;
        Ok(true)
    }

    fn poll(&mut self) -> Result<CyclePoll> {
        self.ensure_usable()?;
        if !self.capturing {
            return Err(MandatumError::Recognizer(
                "poll called with no capture in flight".into(),
            ));
        }
        if self.fail_poll {
            self.capturing = false;
            return Err(MandatumError::Recognizer(
                "scripted mid-cycle failure".into(),
            ));
        }
        if self.polls_remaining > 0 {
            self.polls_remaining -= 1;
            return Ok(CyclePoll::Pending);
        }

        self.capturing = false;
        let inference = self.script[self.cycles_finalized % self.script.len()].clone();
        self.cycles_finalized += 1;
        Ok(CyclePoll::Finalized(inference))
    }

    fn stop_capture(&mut self) {
        self.capturing = false;
        self.polls_remaining = 0;
        debug!("StubRecognizer capture stopped");
    }

    fn dispose(&mut self) {
        self.capturing = false;
        self.disposed = true;
        debug!("StubRecognizer disposed");
    }
}

/// The demo grammar: a tiny smart-lighting command set.
fn default_script() -> Vec<Inference> {
    vec![
        Inference::understood("turnLightOn", [("location", "bedroom")]),
        Inference::understood(
            "changeColor",
            [("location", "living room"), ("color", "blue")],
        ),
        Inference::not_understood(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activated() -> StubRecognizer {
        let mut stub = StubRecognizer::new().with_polls_per_cycle(1);
        stub.activate("TEST-KEY==").expect("activation accepted");
        stub
    }

    #[test]
    fn blank_access_key_is_rejected_as_invalid() {
        let mut stub = StubRecognizer::new();
        let err = stub.activate("   ").expect_err("blank key must fail");
        assert!(matches!(err, MandatumError::InvalidAccessKey { .. }));
    }

    #[test]
    fn scripted_activation_fault_maps_to_classified_error() {
        let mut stub = StubRecognizer::new().with_activation_fault(ActivationFault::LimitReached);
        let err = stub.activate("TEST-KEY==").expect_err("fault scripted");
        assert!(matches!(err, MandatumError::ActivationLimitReached));
    }

    #[test]
    fn cycle_reports_pending_then_finalizes_once() {
        let mut stub = activated();
        assert!(stub.start_capture().expect("capture opens"));

        assert_eq!(stub.poll().expect("pending poll"), CyclePoll::Pending);
        let finalized = stub.poll().expect("final poll");
        match finalized {
            CyclePoll::Finalized(inference) => {
                assert!(inference.is_understood);
                assert_eq!(inference.intent.as_deref(), Some("turnLightOn"));
            }
            CyclePoll::Pending => panic!("expected finalized cycle"),
        }

        // The cycle is over — polling again without a new capture is an error.
        assert!(stub.poll().is_err());
    }

    #[test]
    fn script_wraps_around_across_cycles() {
        let mut stub = StubRecognizer::new()
            .with_polls_per_cycle(0)
            .with_script(vec![
                Inference::understood("turnLightOff", [("location", "kitchen")]),
                Inference::not_understood(),
            ]);
        stub.activate("TEST-KEY==").expect("activation accepted");

        let mut intents = Vec::new();
        for _ in 0..3 {
            assert!(stub.start_capture().expect("capture opens"));
            match stub.poll().expect("finalizes immediately") {
                CyclePoll::Finalized(inference) => intents.push(inference.intent),
                CyclePoll::Pending => panic!("expected finalized cycle"),
            }
        }
        assert_eq!(
            intents,
            vec![Some("turnLightOff".to_string()), None, Some("turnLightOff".to_string())]
        );
    }

    #[test]
    fn capture_refusal_leaves_the_stub_idle() {
        let mut stub = StubRecognizer::new().with_capture_refusal();
        stub.activate("TEST-KEY==").expect("activation accepted");
        assert!(!stub.start_capture().expect("refusal is not an error"));
        assert!(stub.poll().is_err(), "no cycle should be in flight");
    }

    #[test]
    fn disposed_stub_rejects_every_operation() {
        let mut stub = activated();
        stub.dispose();
        assert!(stub.activate("TEST-KEY==").is_err());
        assert!(stub.start_capture().is_err());
        assert!(stub.poll().is_err());
    }
}
