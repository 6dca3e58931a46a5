// =============================================================================
// lib.rs - Backend Tauri du color sampler
// lib.rs - Color sampler Tauri backend
// =============================================================================

use std::sync::Arc;

use cca_sampler::{ColorSampler, SamplerConfig};
use tauri::Manager;

// =============================================================================
// MODULES
// =============================================================================

/// Journalisation console
/// Console logging
mod logging;

/// Overlay de capture rendu dans la webview
/// Capture overlay rendered in the webview
mod overlay;

/// État de l'application et commandes
/// Application state and commands
mod store;

// =============================================================================
// INITIALISATION
// INITIALIZATION
// =============================================================================
// Learn more about Tauri commands at https://tauri.app/develop/calling-rust/

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    logging::setup(!cfg!(debug_assertions));

    let result = tauri::Builder::default()
        .setup(|app| {
            // Initialise l'état global
            // Initialize global state
            let overlay = Arc::new(overlay::TauriOverlay::new(app.handle().clone()));
            let sampler = ColorSampler::for_platform(overlay.clone(), SamplerConfig::default());
            app.manage(store::AppState { sampler, overlay });
            Ok(())
        })
        // Enregistre les commandes
        // Register commands
        .invoke_handler(tauri::generate_handler![
            store::pick_color,
            store::cancel_pick,
            store::get_history,
            store::clear_history,
            store::derive_color_info,
            store::overlay_event,
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        tracing::error!(error = %e, "Error while running the tauri application");
    }
}
