//! Mandatum desktop application entry point.
//!
//! ## Runtime note
//!
//! Tauri v2 manages its own Tokio runtime internally.
//! We use `tauri::async_runtime::spawn` (not `tokio::spawn`) so our tasks
//! share Tauri's runtime and can safely call Tauri APIs.

#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

mod commands;
mod settings;
mod state;
mod variant;

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use mandatum_core::{
    engine::SessionConfig,
    ipc::events::EngineStatus,
    provision::{default_cache_dir, ModelProvisioner},
    recognizer::{RecognizerHandle, StubRecognizer},
    IntentEngine,
};
use parking_lot::Mutex;
use settings::{default_settings_path, load_settings};
use state::{AppState, SessionInfo, UiModel};
use tauri::{Emitter, Manager};
use tracing::{info, warn};
use variant::BuildVariant;

const APP_BASE_NAME: &str = "Mandatum";
const BUNDLE_BASE_IDENTIFIER: &str = "dev.latticelabs.mandatum";

fn main() {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mandatum=info".parse().unwrap()),
        )
        .init();

    let build_variant = BuildVariant::from_env();
    let display_name = build_variant.display_name(APP_BASE_NAME);
    let bundle_identifier = build_variant.bundle_identifier(BUNDLE_BASE_IDENTIFIER);
    info!(
        variant = build_variant.as_str(),
        %display_name,
        %bundle_identifier,
        "Mandatum starting"
    );

    let settings_path = default_settings_path();
    let app_settings = load_settings(&settings_path);
    info!(
        settings_path = ?settings_path,
        permission_mode = %app_settings.permission_mode,
        "runtime settings loaded"
    );

    // ── Model provisioning ────────────────────────────────────────────────
    // An unsupported platform or a missing bundled artifact is unrecoverable
    // this early; crash rather than run without a grammar.
    let provisioner = match app_settings.bundle_dir.clone() {
        Some(bundle_dir) => ModelProvisioner::new(bundle_dir, default_cache_dir()),
        None => ModelProvisioner::with_default_paths(),
    };
    let model_path = provisioner
        .provision()
        .expect("failed to provision the model artifact");

    // ── Engine setup ──────────────────────────────────────────────────────
    // The vendor engine is linked out of tree; the scripted recognizer stands
    // in so the whole session/UI/IPC surface runs end-to-end.
    let recognizer = RecognizerHandle::new(StubRecognizer::new());
    let session = SessionConfig::new(app_settings.resolve_access_key(), model_path);
    let session_info = SessionInfo {
        display_name: display_name.clone(),
        bundle_identifier,
        variant: build_variant.as_str().to_string(),
        masked_access_key: session.masked_access_key(),
        model_path: session.model_path.display().to_string(),
    };
    let engine = Arc::new(IntentEngine::new(session, recognizer));
    let ui = Arc::new(Mutex::new(UiModel::new()));

    // Activation failures are not fatal: the window still opens, showing the
    // classified message in the error overlay, and the session stays stuck
    // there until restart.
    if let Err(e) = engine.activate() {
        tracing::error!("engine activation failed: {e}");
        ui.lock().fail(e.to_string());
    }

    // ── Tauri app ─────────────────────────────────────────────────────────
    let engine_for_setup = Arc::clone(&engine);
    let ui_for_setup = Arc::clone(&ui);
    let results_rendered = Arc::new(AtomicUsize::new(0));
    let results_rendered_for_setup = Arc::clone(&results_rendered);
    let window_title = display_name.clone();

    tauri::Builder::default()
        .setup(move |app| {
            let app_handle = app.handle().clone();

            if let Some(window) = app_handle.get_webview_window("main") {
                let _ = window.set_title(&window_title);
            }

            // ── Forward engine events → Tauri event bus ───────────────────
            // Use tauri::async_runtime::spawn to share Tauri's Tokio runtime.

            let mut inference_rx = engine_for_setup.subscribe_inferences();
            let handle1 = app_handle.clone();
            let ui_clone = Arc::clone(&ui_for_setup);
            let results_rendered_clone = Arc::clone(&results_rendered_for_setup);
            tauri::async_runtime::spawn(async move {
                loop {
                    match inference_rx.recv().await {
                        Ok(event) => {
                            {
                                let mut ui = ui_clone.lock();
                                ui.inference_received(&event.inference);
                            }
                            results_rendered_clone.fetch_add(1, Ordering::Relaxed);
                            if let Err(e) = handle1.emit("mandatum://inference", &event) {
                                warn!("emit inference: {e}");
                            }
                            let snapshot = ui_clone.lock().snapshot();
                            if let Err(e) = handle1.emit("mandatum://ui", &snapshot) {
                                warn!("emit ui snapshot: {e}");
                            }
                            info!(
                                seq = event.seq,
                                understood = event.inference.is_understood,
                                "inference rendered"
                            );
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("inference receiver lagged by {n} events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            });

            let mut status_rx = engine_for_setup.subscribe_status();
            let handle2 = app_handle.clone();
            let ui_clone = Arc::clone(&ui_for_setup);
            tauri::async_runtime::spawn(async move {
                loop {
                    match status_rx.recv().await {
                        Ok(event) => {
                            if event.status == EngineStatus::Failed {
                                let message = event
                                    .detail
                                    .clone()
                                    .unwrap_or_else(|| "engine failure".into());
                                ui_clone.lock().fail(message);
                                let snapshot = ui_clone.lock().snapshot();
                                if let Err(e) = handle2.emit("mandatum://ui", &snapshot) {
                                    warn!("emit ui snapshot: {e}");
                                }
                            }
                            if let Err(e) = handle2.emit("mandatum://status", &event) {
                                warn!("emit status: {e}");
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("status receiver lagged by {n} events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            });

            Ok(())
        })
        .manage(AppState {
            engine: Arc::clone(&engine),
            gate: app_settings.microphone_gate(),
            ui,
            session_info,
            settings: Arc::new(Mutex::new(app_settings)),
            settings_path,
            start_inflight: Arc::new(AtomicBool::new(false)),
            starts_requested: Arc::new(AtomicUsize::new(0)),
            starts_denied: Arc::new(AtomicUsize::new(0)),
            results_rendered,
        })
        .invoke_handler(tauri::generate_handler![
            commands::start_listening,
            commands::cancel_listening,
            commands::get_ui_state,
            commands::get_engine_status,
            commands::get_session_info,
            commands::get_runtime_settings,
            commands::set_runtime_settings,
            commands::get_diagnostics,
        ])
        .build(tauri::generate_context!())
        .expect("error while building Tauri application")
        .run(move |_app, event| {
            // Scoped teardown: the recognizer is released exactly once, when
            // the event loop exits.
            if let tauri::RunEvent::Exit = event {
                info!("app exit — disposing engine");
                engine.shutdown();
            }
        });
}
