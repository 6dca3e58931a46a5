// =============================================================================
// picker/native.rs - Stratégie "picker natif" (un pixel n'importe où à l'écran)
// picker/native.rs - Native picker strategy (one pixel anywhere on screen)
// =============================================================================

use std::sync::Arc;

use tracing::{debug, info};

use super::common::{CancelToken, PickOutcome, PickStrategy};
use crate::color::Rgb;
use crate::error::NativePickError;

/// Capacité plateforme "choisir un pixel à l'écran"
/// Platform "pick one pixel on screen" capability
pub trait NativePicker: Send + Sync {
    /// Sonde la capacité au moment de l'appel
    /// Probes the capability at call time
    fn is_available(&self) -> bool;

    /// Requête bloquante ; doit surveiller `cancel` et retourner `Aborted`
    /// Blocking request; must watch `cancel` and return `Aborted`
    fn pick_pixel(&self, cancel: &CancelToken) -> Result<Rgb, NativePickError>;
}

// =============================================================================
// MACHINE À ÉTATS
// STATE MACHINE
// =============================================================================

/// Idle -> Requesting -> { Resolved, Cancelled, Denied }
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeState {
    Idle,
    Requesting,
    Resolved(Rgb),
    Cancelled,
    Denied(String),
}

impl NativeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NativeState::Resolved(_) | NativeState::Cancelled | NativeState::Denied(_))
    }
}

/// Une requête au picker natif
/// One request to the native picker
#[derive(Debug)]
pub struct NativeRequest {
    state: NativeState,
}

impl Default for NativeRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeRequest {
    pub fn new() -> Self {
        Self { state: NativeState::Idle }
    }

    pub fn state(&self) -> &NativeState {
        &self.state
    }

    /// Idle -> Requesting
    pub fn begin(&mut self) -> bool {
        if self.state == NativeState::Idle {
            self.state = NativeState::Requesting;
            true
        } else {
            false
        }
    }

    /// Requesting -> Resolved / Denied / Cancelled; ignored in any other state
    pub fn resolve(&mut self, result: Result<Rgb, NativePickError>) {
        if self.state != NativeState::Requesting {
            debug!(state = ?self.state, "Ignoring late native picker result");
            return;
        }
        self.state = match result {
            Ok(rgb) => NativeState::Resolved(rgb),
            Err(NativePickError::Aborted) => NativeState::Cancelled,
            Err(e @ (NativePickError::Denied(_) | NativePickError::Unavailable(_))) => {
                NativeState::Denied(e.to_string())
            }
        };
    }

    /// Annulation idempotente : sans effet une fois l'état terminal atteint
    /// Idempotent cancellation: no effect once a terminal state is reached
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = NativeState::Cancelled;
        true
    }

    /// Issue de la requête, `None` tant qu'elle n'est pas terminée
    /// Request outcome, `None` while still pending
    pub fn outcome(&self) -> Option<PickOutcome> {
        match &self.state {
            NativeState::Resolved(rgb) => Some(PickOutcome::Picked { hex: rgb.to_hex() }),
            NativeState::Cancelled => Some(PickOutcome::Cancelled),
            NativeState::Denied(reason) => Some(PickOutcome::CaptureDenied { reason: reason.clone() }),
            NativeState::Idle | NativeState::Requesting => None,
        }
    }
}

// =============================================================================
// STRATÉGIE
// STRATEGY
// =============================================================================

/// Délègue le pick à la capacité native
/// Delegates the pick to the native capability
pub struct NativeStrategy {
    picker: Arc<dyn NativePicker>,
}

impl NativeStrategy {
    pub fn new(picker: Arc<dyn NativePicker>) -> Self {
        Self { picker }
    }
}

impl PickStrategy for NativeStrategy {
    fn name(&self) -> &'static str {
        "native"
    }

    fn pick(&self, cancel: &CancelToken) -> PickOutcome {
        let mut request = NativeRequest::new();

        if cancel.is_cancelled() {
            request.cancel();
        } else {
            request.begin();
            info!("Requesting native pixel pick");
            let result = self.picker.pick_pixel(cancel);
            request.resolve(result);
            if cancel.is_cancelled() {
                request.cancel();
            }
        }

        request.outcome().unwrap_or(PickOutcome::Cancelled)
    }
}

// =============================================================================
// TESTS
// =============================================================================
