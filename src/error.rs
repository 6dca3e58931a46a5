// =============================================================================
// error.rs - Error taxonomy of the sampler
// error.rs - Taxonomie des erreurs du sampler
// =============================================================================

use thiserror::Error;

/// Erreur de conversion de couleur, toujours remontée à l'appelant
/// Color conversion error, always surfaced to the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("invalid color format: {0:?}")]
    InvalidColorFormat(String),
}

/// Erreur du stockage durable (jamais remontée par l'historique)
/// Durable storage error (never surfaced by the history store)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Échec d'acquisition du flux de capture d'écran
/// Failure to acquire the display capture stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// L'utilisateur ou la plateforme a refusé la capture
    /// The user or the platform refused the capture
    #[error("display capture denied: {0}")]
    Denied(String),
    /// Aucun écran disponible
    /// No display available
    #[error("no display available for capture")]
    NoDisplay,
    #[error("platform capture error: {0}")]
    Platform(String),
}

/// Résultat non nominal du picker natif
/// Non-success result of the native picker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativePickError {
    /// Refus de l'utilisateur ou de la plateforme
    /// Refused by the user or the platform
    #[error("native pick denied: {0}")]
    Denied(String),
    /// Requête annulée explicitement
    /// Request explicitly aborted
    #[error("native pick aborted")]
    Aborted,
    #[error("native picker unavailable: {0}")]
    Unavailable(String),
}
