//! =============================================================================
//! COMMON.RS - Code partagé entre les stratégies
//! COMMON.RS - Shared code between strategies
//! =============================================================================
//!
//! Ce module contient le résultat d'un pick et le mécanisme d'annulation.
//! This module contains the pick result and the cancellation mechanism.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

// =============================================================================
// STRUCTURES DE RÉSULTAT
// RESULT STRUCTURES
// =============================================================================

/// Résultat retourné par le color picker
/// Result returned by the color picker
///
/// Seul `Picked` porte une couleur ; les deux autres cas sont des issues
/// normales "aucune couleur" que l'interface affiche différemment.
/// Only `Picked` carries a color; the two others are normal "no color"
/// outcomes the UI reports with different messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PickOutcome {
    /// Couleur choisie au format "#RRGGBB"
    /// Picked color in "#RRGGBB" format
    Picked { hex: String },

    /// Annulation explicite (Échap, bouton, clic droit, nouveau pick)
    /// Explicit abort (Escape, button, right click, superseding pick)
    Cancelled,

    /// Capture ou picker natif refusé par l'utilisateur ou la plateforme
    /// Capture or native picker refused by the user or the platform
    CaptureDenied { reason: String },
}

impl PickOutcome {
    pub fn hex(&self) -> Option<&str> {
        match self {
            PickOutcome::Picked { hex } => Some(hex),
            _ => None,
        }
    }

    pub fn is_picked(&self) -> bool {
        matches!(self, PickOutcome::Picked { .. })
    }
}

/// Stratégie d'acquisition d'une couleur
/// Color acquisition strategy
pub trait PickStrategy: Send + Sync {
    /// Nom court, pour les logs
    /// Short name, for logs
    fn name(&self) -> &'static str;

    /// Bloque jusqu'au choix, au refus ou à l'annulation
    /// Blocks until a pick, a refusal or a cancellation
    fn pick(&self, cancel: &CancelToken) -> PickOutcome;
}

// =============================================================================
// ANNULATION
// CANCELLATION
// =============================================================================

struct CancelState {
    cancelled: AtomicBool,
    /// Jamais utilisé pour envoyer : le lâcher déconnecte les récepteurs
    /// Never used to send: dropping it disconnects the receivers
    signal: Mutex<Option<Sender<()>>>,
}

/// Côté déclencheur de l'annulation (idempotent)
/// Triggering side of the cancellation (idempotent)
#[derive(Clone)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

/// Côté observateur : drapeau + récepteur utilisable dans `select!`
/// Observing side: flag + receiver usable in `select!`
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<CancelState>,
    signal: Receiver<()>,
}

/// Crée une paire handle/token liée
/// Creates a linked handle/token pair
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = bounded(0);
    let state = Arc::new(CancelState { cancelled: AtomicBool::new(false), signal: Mutex::new(Some(tx)) });
    (CancelHandle { state: Arc::clone(&state) }, CancelToken { state, signal: rx })
}

impl CancelHandle {
    /// Annule ; retourne `false` si c'était déjà fait
    /// Cancels; returns `false` when already cancelled
    pub fn cancel(&self) -> bool {
        if self.state.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        let mut signal = self.state.signal.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        signal.take();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Devient prêt (déconnecté) dès l'annulation, et le reste
    /// Becomes ready (disconnected) once cancelled, and stays ready
    pub fn signal(&self) -> &Receiver<()> {
        &self.signal
    }
}

// =============================================================================
// TESTS
// =============================================================================
