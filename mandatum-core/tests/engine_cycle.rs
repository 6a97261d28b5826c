use std::time::{Duration, Instant};

use mandatum_core::engine::SessionConfig;
use mandatum_core::ipc::events::EngineStatus;
use mandatum_core::{
    Inference, InferenceEvent, IntentEngine, RecognizerHandle, StubRecognizer,
};
use tokio::sync::broadcast;

fn session_config(label: &str) -> SessionConfig {
    let model = std::env::temp_dir().join(format!(
        "mandatum-itest-{}-{label}.ctx",
        std::process::id()
    ));
    std::fs::write(&model, b"grammar").expect("write model file");
    SessionConfig::new("ITEST-KEY==", model)
}

async fn recv_inference(rx: &mut broadcast::Receiver<InferenceEvent>) -> InferenceEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for inference event")
        .expect("inference channel closed")
}

async fn wait_until_ready(engine: &IntentEngine) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while engine.status() != EngineStatus::Ready {
        assert!(Instant::now() < deadline, "engine never returned to Ready");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn first_inference_lands_under_500ms() {
    let recognizer = RecognizerHandle::new(StubRecognizer::new().with_polls_per_cycle(3));
    let engine = IntentEngine::new(session_config("latency"), recognizer);
    engine.activate().expect("activation accepted");
    let mut inference_rx = engine.subscribe_inferences();

    let start = Instant::now();
    assert!(engine.start().expect("capture opens"));
    let event = recv_inference(&mut inference_rx).await;
    let elapsed = start.elapsed();

    assert!(event.inference.is_understood);
    assert!(
        elapsed < Duration::from_millis(500),
        "time to first inference too high: {:?} (target < 500ms)",
        elapsed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn engine_cycles_ready_listening_ready_across_sessions() {
    let script = vec![
        Inference::understood("turnLightOn", [("location", "bedroom")]),
        Inference::not_understood(),
    ];
    let recognizer = RecognizerHandle::new(
        StubRecognizer::new()
            .with_polls_per_cycle(1)
            .with_script(script),
    );
    let engine = IntentEngine::new(session_config("cycles"), recognizer);
    engine.activate().expect("activation accepted");
    assert_eq!(engine.status(), EngineStatus::Ready);

    let mut inference_rx = engine.subscribe_inferences();

    // First cycle: understood phrase.
    assert!(engine.start().expect("capture opens"));
    let first = recv_inference(&mut inference_rx).await;
    assert_eq!(first.seq, 0);
    assert_eq!(first.inference.intent.as_deref(), Some("turnLightOn"));
    assert_eq!(
        first.inference.slots.get("location").map(String::as_str),
        Some("bedroom")
    );
    wait_until_ready(&engine).await;

    // Second cycle: grammar rejection still ends the cycle normally.
    assert!(engine.start().expect("capture reopens"));
    let second = recv_inference(&mut inference_rx).await;
    assert_eq!(second.seq, 1);
    assert!(!second.inference.is_understood);
    wait_until_ready(&engine).await;

    let diag = engine.diagnostics_snapshot();
    assert_eq!(diag.cycles_started, 2);
    assert_eq!(diag.cycles_completed, 2);
    assert_eq!(diag.recognizer_errors, 0);

    engine.shutdown();
}
