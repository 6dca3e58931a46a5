// =============================================================================
// picker/mod.rs - Color picker module
// picker/mod.rs - Module color picker
// =============================================================================

/// Code commun entre stratégies (résultat, annulation)
/// Common code between strategies (outcome, cancellation)
pub mod common;

/// Stratégie picker natif
/// Native picker strategy
pub mod native;

/// Picker natif via un programme externe (hyprpicker, xcolor)
/// Native picker through a helper program (hyprpicker, xcolor)
pub mod command;

/// Stratégie capture d'écran + loupe
/// Display capture + magnifier strategy
pub mod capture;

/// Rendu et placement de la loupe
/// Magnifier rendering and placement
pub mod magnifier;

/// Capture d'écran macOS
/// macOS display capture
#[cfg(target_os = "macos")]
pub mod macos;

/// Capture d'écran Windows
/// Windows display capture
#[cfg(target_os = "windows")]
pub mod windows;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{bounded, Receiver};
use tracing::{debug, info};

use crate::config::SamplerConfig;
use crate::error::CaptureError;
use capture::{CaptureStrategy, CaptureStream, DisplayCapture, Overlay};
use common::{cancellation, CancelHandle, PickOutcome, PickStrategy};
use native::{NativePicker, NativeStrategy};

// =============================================================================
// COORDINATEUR
// COORDINATOR
// =============================================================================

/// Tentative en cours
/// Attempt in flight
struct ActivePick {
    id: u64,
    handle: CancelHandle,
    /// Déconnecté quand la tentative a fini son démontage
    /// Disconnected once the attempt has finished tearing down
    finished: Receiver<()>,
}

/// Point d'entrée unique : choisit la stratégie et garantit une seule tentative à la fois
/// Single entry point: picks the strategy and keeps one attempt at a time
pub struct ColorPicker {
    native: Option<Arc<dyn NativePicker>>,
    capture: Arc<dyn DisplayCapture>,
    overlay: Arc<dyn Overlay>,
    config: SamplerConfig,
    active: Mutex<Option<ActivePick>>,
    next_id: AtomicU64,
}

impl ColorPicker {
    pub fn new(
        native: Option<Arc<dyn NativePicker>>,
        capture: Arc<dyn DisplayCapture>,
        overlay: Arc<dyn Overlay>,
        config: SamplerConfig,
    ) -> Self {
        Self { native, capture, overlay, config, active: Mutex::new(None), next_id: AtomicU64::new(1) }
    }

    /// Sonde la capacité native au moment de l'appel
    /// Probes the native capability at call time
    pub fn select_strategy(&self) -> Box<dyn PickStrategy> {
        if let Some(native) = self.native.as_ref().filter(|n| n.is_available()) {
            return Box::new(NativeStrategy::new(Arc::clone(native)));
        }
        Box::new(CaptureStrategy::new(Arc::clone(&self.capture), Arc::clone(&self.overlay), self.config.clone()))
    }

    /// Lance un pick ; annule et attend la tentative précédente s'il y en a une
    /// Starts a pick; cancels and waits for the previous attempt if any
    pub fn pick_color(&self) -> PickOutcome {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (handle, token) = cancellation();
        let (done_tx, finished) = bounded::<()>(0);

        let previous = self.lock_active().replace(ActivePick { id, handle, finished });
        if let Some(previous) = previous {
            info!(previous = previous.id, next = id, "Superseding active pick");
            previous.handle.cancel();
            // Err(Disconnected) quand la tentative précédente a terminé
            // Err(Disconnected) once the previous attempt is done
            let _ = previous.finished.recv();
        }

        let strategy = self.select_strategy();
        info!(attempt = id, strategy = strategy.name(), "Starting color pick");
        let mut outcome = strategy.pick(&token);
        if token.is_cancelled() && outcome.is_picked() {
            debug!(attempt = id, "Dropping result of a cancelled attempt");
            outcome = PickOutcome::Cancelled;
        }

        {
            let mut active = self.lock_active();
            if active.as_ref().is_some_and(|a| a.id == id) {
                active.take();
            }
        }
        drop(done_tx);

        info!(attempt = id, ?outcome, "Color pick finished");
        outcome
    }

    /// Annule la tentative en cours ; `false` s'il n'y en a pas
    /// Cancels the attempt in flight; `false` when there is none
    pub fn cancel(&self) -> bool {
        match self.lock_active().as_ref() {
            Some(active) => active.handle.cancel(),
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActivePick>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// =============================================================================
// FONCTIONS PLATEFORME
// PLATFORM FUNCTIONS
// =============================================================================

/// Capture d'écran de la plateforme courante
/// Display capture for the current platform
pub fn platform_display_capture() -> Arc<dyn DisplayCapture> {
    #[cfg(target_os = "macos")]
    {
        Arc::new(macos::CoreGraphicsCapture)
    }

    #[cfg(target_os = "windows")]
    {
        Arc::new(windows::GdiCapture)
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Arc::new(NoDisplayCapture)
    }
}

/// Picker natif de la plateforme courante, s'il y en a un
/// Native picker for the current platform, if any
pub fn platform_native_picker() -> Option<Arc<dyn NativePicker>> {
    command::CommandPicker::detect().map(|picker| Arc::new(picker) as Arc<dyn NativePicker>)
}

/// Plateformes sans capture d'écran
/// Platforms without display capture
pub struct NoDisplayCapture;

impl DisplayCapture for NoDisplayCapture {
    fn start(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        Err(CaptureError::NoDisplay)
    }
}

// =============================================================================
// TESTS
// =============================================================================
