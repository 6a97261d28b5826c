//! Tauri command handlers.
//!
//! Each function is registered with `tauri::Builder::invoke_handler` and
//! callable from the frontend via `invoke(...)`.

use std::sync::{atomic::Ordering, Arc};

use mandatum_core::{EngineStatus, MandatumError};
use tauri::{Emitter, State};
use tracing::{debug, info, warn};

use crate::settings::{normalize_permission_mode, save_settings, RuntimeSettings};
use crate::state::{AppDiagnostics, AppState, SessionInfo, UiSnapshot};

/// Broadcast the current UI snapshot to the webview.
pub(crate) fn emit_ui(app: &tauri::AppHandle, state: &AppState) {
    let snapshot = state.ui.lock().snapshot();
    if let Err(e) = app.emit("mandatum://ui", &snapshot) {
        warn!("emit ui snapshot: {e}");
    }
}

/// The Start button tap: guard re-entrancy, resolve microphone permission,
/// and open a listening cycle.
#[tauri::command]
pub async fn start_listening(
    app: tauri::AppHandle,
    state: State<'_, AppState>,
) -> Result<(), String> {
    // One command at a time; concurrent taps are dropped, not queued.
    if state
        .start_inflight
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        debug!("start command dropped — another start is in flight");
        return Ok(());
    }
    let result = start_listening_inner(&app, &state).await;
    state.start_inflight.store(false, Ordering::SeqCst);
    result
}

async fn start_listening_inner(
    app: &tauri::AppHandle,
    state: &State<'_, AppState>,
) -> Result<(), String> {
    state.starts_requested.fetch_add(1, Ordering::Relaxed);

    let accepted = state.ui.lock().begin_start();
    if !accepted {
        debug!(
            phase = ?state.ui.lock().phase(),
            "start ignored — cycle pending, listening, or error overlay engaged"
        );
        return Ok(());
    }
    emit_ui(app, state);

    // Permission resolution blocks until the OS answers, where a dialog
    // exists at all.
    let gate = Arc::clone(&state.gate);
    let decision = tauri::async_runtime::spawn_blocking(move || gate.request())
        .await
        .map_err(|e| e.to_string())?;

    if !decision.is_granted() {
        // Denial aborts the attempt silently: indicators revert, no banner.
        tracing::error!(?decision, "required microphone permission was not granted");
        state.starts_denied.fetch_add(1, Ordering::Relaxed);
        state.ui.lock().revert_start();
        emit_ui(app, state);
        return Ok(());
    }

    let engine = Arc::clone(&state.engine);
    let started = tauri::async_runtime::spawn_blocking(move || engine.start())
        .await
        .map_err(|e| e.to_string())?;

    match started {
        Ok(true) => {
            state.ui.lock().capture_started();
        }
        Ok(false) => {
            warn!("recognizer refused to open capture — reverting indicators");
            state.ui.lock().revert_start();
        }
        Err(MandatumError::AlreadyListening) => {
            // Lost a race against another entry point; treat like a no-op tap.
            state.ui.lock().revert_start();
        }
        Err(e) => {
            state.ui.lock().fail(e.to_string());
        }
    }
    emit_ui(app, state);
    Ok(())
}

/// Abort the in-flight listening cycle without waiting for an inference.
#[tauri::command]
pub async fn cancel_listening(
    app: tauri::AppHandle,
    state: State<'_, AppState>,
) -> Result<(), String> {
    match state.engine.cancel() {
        Ok(()) => {
            state.ui.lock().cycle_cancelled();
            emit_ui(&app, &state);
            Ok(())
        }
        Err(MandatumError::NotListening) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Return the current UI snapshot (used by the webview on load).
#[tauri::command]
pub async fn get_ui_state(state: State<'_, AppState>) -> Result<UiSnapshot, String> {
    Ok(state.ui.lock().snapshot())
}

/// Return the current engine status.
#[tauri::command]
pub async fn get_engine_status(state: State<'_, AppState>) -> Result<EngineStatus, String> {
    Ok(state.engine.status())
}

/// Immutable session facts for the about panel.
#[tauri::command]
pub async fn get_session_info(state: State<'_, AppState>) -> Result<SessionInfo, String> {
    Ok(state.session_info.clone())
}

/// Return persisted runtime settings.
#[tauri::command]
pub async fn get_runtime_settings(state: State<'_, AppState>) -> Result<RuntimeSettings, String> {
    Ok(state.settings.lock().runtime_settings())
}

/// Persist runtime settings.
///
/// The session config and permission gate are frozen at startup, so changes
/// here take effect on the next app start.
#[tauri::command]
pub async fn set_runtime_settings(
    state: State<'_, AppState>,
    access_key: Option<String>,
    permission_mode: Option<String>,
) -> Result<RuntimeSettings, String> {
    let mut settings = state.settings.lock();
    if let Some(key) = access_key {
        settings.access_key = key;
    }
    if let Some(mode) = permission_mode {
        settings.permission_mode = normalize_permission_mode(&mode);
    }
    settings.normalize();
    save_settings(&state.settings_path, &settings).map_err(|e| e.to_string())?;
    Ok(settings.runtime_settings())
}

/// App + engine counters for observability.
#[tauri::command]
pub async fn get_diagnostics(state: State<'_, AppState>) -> Result<AppDiagnostics, String> {
    let diag = state.diagnostics_snapshot();
    info!(
        starts_requested = diag.starts_requested,
        starts_denied = diag.starts_denied,
        results_rendered = diag.results_rendered,
        cycles_completed = diag.cycles_completed,
        "app diagnostics snapshot requested"
    );
    Ok(diag)
}
