// =============================================================================
// lib.rs - Moteur du color sampler CCA
// lib.rs - CCA color sampler engine
// =============================================================================
//
// Choix d'une couleur à l'écran (picker natif ou capture + loupe),
// historique des couleurs récentes et valeurs d'accessibilité (contraste).
// Picking a color on screen (native picker or capture + magnifier),
// recent colors history and accessibility values (contrast).

// =============================================================================
// MODULES
// =============================================================================

/// Configuration partagée (constantes)
/// Shared configuration (constants)
pub mod config;

/// Erreurs typées
/// Typed errors
pub mod error;

/// Conversions et calculs de couleur (hex, RGB, HSL, luminance, contraste)
/// Color conversions and math (hex, RGB, HSL, luminance, contrast)
pub mod color;

/// Historique des couleurs récentes
/// Recent colors history
pub mod history;

/// Placement "contain" et conversions de coordonnées
/// "Contain" fit and coordinate conversions
pub mod projection;

/// Image RGB en mémoire
/// In-memory RGB image
pub mod raster;

/// Stratégies de pick et coordinateur
/// Pick strategies and coordinator
pub mod picker;

/// Façade exposée à l'application
/// Facade exposed to the application
pub mod engine;

pub use color::{derive_color_info, ColorInfo, Hsl, Rgb};
pub use config::SamplerConfig;
pub use engine::ColorSampler;
pub use error::{CaptureError, ColorError, NativePickError, StorageError};
pub use history::{FileBackend, HistoryStore, MemoryBackend, StorageBackend};
pub use picker::capture::{Key, Overlay, OverlayEvent, Viewport};
pub use picker::common::PickOutcome;
pub use picker::magnifier::MagnifierView;
pub use picker::ColorPicker;
pub use projection::{Point, ProjectionMapping, Size};
pub use raster::Raster;
