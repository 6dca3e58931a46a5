// =============================================================================
// store.rs - État de l'application et commandes Tauri
// store.rs - Application state and Tauri commands
// =============================================================================

use std::sync::Arc;

use cca_sampler::{ColorInfo, ColorSampler, FileBackend, OverlayEvent, PickOutcome};
use tauri::{AppHandle, Emitter, Manager};
use tracing::warn;

use crate::overlay::TauriOverlay;

/// Émis après chaque changement de l'historique
/// Emitted after every history change
pub const HISTORY_UPDATED: &str = "history-updated";

// =============================================================================
// STORE - État global partagé
// STORE - Shared global state
// =============================================================================

/// État de l'application : le sampler et l'overlay qu'il dessine
/// Application state: the sampler and the overlay it draws into
pub struct AppState {
    pub sampler: ColorSampler<FileBackend>,
    pub overlay: Arc<TauriOverlay>,
}

fn emit_history(app: &AppHandle, history: Vec<String>) {
    if let Err(e) = app.emit(HISTORY_UPDATED, history) {
        warn!(error = %e, "Failed to emit history update");
    }
}

// =============================================================================
// COMMANDES TAURI
// TAURI COMMANDS
// =============================================================================

/// Lance un pick ; bloque un thread dédié jusqu'au choix ou à l'annulation
/// Starts a pick; blocks a dedicated thread until a pick or a cancellation
#[tauri::command]
pub async fn pick_color(app: AppHandle) -> Result<PickOutcome, String> {
    let handle = app.clone();
    let outcome = tauri::async_runtime::spawn_blocking(move || handle.state::<AppState>().sampler.pick_color())
        .await
        .map_err(|e| e.to_string())?;

    if outcome.is_picked() {
        emit_history(&app, app.state::<AppState>().sampler.get_history());
    }
    Ok(outcome)
}

/// Annule le pick en cours
/// Cancels the pick in flight
#[tauri::command]
pub fn cancel_pick(state: tauri::State<AppState>) -> bool {
    state.sampler.cancel_pick()
}

/// Historique, le plus récent en premier
/// History, most recent first
#[tauri::command]
pub fn get_history(state: tauri::State<AppState>) -> Vec<String> {
    state.sampler.get_history()
}

/// Efface l'historique
/// Clears the history
#[tauri::command]
pub fn clear_history(app: AppHandle, state: tauri::State<AppState>) {
    state.sampler.clear_history();
    emit_history(&app, state.sampler.get_history());
}

/// Valeurs d'affichage d'une couleur, ratios arrondis à 3 décimales
/// Display values of a color, ratios rounded to 3 decimals
#[tauri::command]
pub fn derive_color_info(state: tauri::State<AppState>, hex: String) -> Result<ColorInfo, String> {
    let mut info = state.sampler.derive_color_info(&hex).map_err(|e| e.to_string())?;
    info.contrast = info.contrast.rounded();
    Ok(info)
}

/// Événement pointeur / clavier / redimensionnement venant de l'overlay
/// Pointer / keyboard / resize event coming from the overlay
#[tauri::command]
pub fn overlay_event(state: tauri::State<AppState>, event: OverlayEvent) {
    state.overlay.forward(event);
}
