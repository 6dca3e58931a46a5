// =============================================================================
// engine.rs - Façade du sampler : pick, historique, infos couleur
// engine.rs - Sampler facade: pick, history, color info
// =============================================================================

use std::sync::Arc;

use tracing::{info, warn};

use crate::color::{derive_color_info, ColorInfo};
use crate::config::SamplerConfig;
use crate::error::ColorError;
use crate::history::{FileBackend, HistoryStore, StorageBackend};
use crate::picker::capture::{DisplayCapture, Overlay};
use crate::picker::common::PickOutcome;
use crate::picker::native::NativePicker;
use crate::picker::{platform_display_capture, platform_native_picker, ColorPicker};

/// Les quatre opérations exposées à l'application
/// The four operations exposed to the application
pub struct ColorSampler<B: StorageBackend> {
    picker: ColorPicker,
    history: HistoryStore<B>,
}

impl<B: StorageBackend> ColorSampler<B> {
    pub fn new(picker: ColorPicker, history: HistoryStore<B>) -> Self {
        Self { picker, history }
    }

    /// Assemble un sampler à partir de ses dépendances injectées
    /// Builds a sampler from its injected dependencies
    pub fn with_parts(
        backend: B,
        native: Option<Arc<dyn NativePicker>>,
        capture: Arc<dyn DisplayCapture>,
        overlay: Arc<dyn Overlay>,
        config: SamplerConfig,
    ) -> Self {
        let history = HistoryStore::with_settings(backend, config.history_key.clone(), config.history_capacity);
        Self::new(ColorPicker::new(native, capture, overlay, config), history)
    }

    /// Choisit une couleur ; un choix réussi est ajouté en tête de l'historique
    /// Picks a color; a successful pick goes to the front of the history
    pub fn pick_color(&self) -> PickOutcome {
        let outcome = self.picker.pick_color();
        if let Some(hex) = outcome.hex() {
            if let Err(e) = self.history.add(hex) {
                warn!(error = %e, "Picked value is not a color, history unchanged");
            }
        }
        outcome
    }

    /// Annule le pick en cours, s'il y en a un
    /// Cancels the pick in flight, if any
    pub fn cancel_pick(&self) -> bool {
        self.picker.cancel()
    }

    pub fn get_history(&self) -> Vec<String> {
        self.history.list()
    }

    pub fn clear_history(&self) {
        self.history.clear();
    }

    pub fn derive_color_info(&self, hex: &str) -> Result<ColorInfo, ColorError> {
        derive_color_info(hex)
    }

    pub fn history(&self) -> &HistoryStore<B> {
        &self.history
    }

    pub fn picker(&self) -> &ColorPicker {
        &self.picker
    }
}

impl ColorSampler<FileBackend> {
    /// Sampler de production : historique sur disque, capture de la plateforme
    /// Production sampler: on-disk history, platform display capture
    pub fn for_platform(overlay: Arc<dyn Overlay>, config: SamplerConfig) -> Self {
        let backend = FileBackend::in_app_data_dir();
        let native = platform_native_picker();
        info!(
            history_dir = %backend.dir().display(),
            native = native.is_some(),
            "Color sampler ready"
        );
        Self::with_parts(backend, native, platform_display_capture(), overlay, config)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::error::NativePickError;
    use crate::history::MemoryBackend;
    use crate::picker::capture::{OverlayEvent, Viewport};
    use crate::picker::common::CancelToken;
    use crate::picker::magnifier::MagnifierView;
    use crate::picker::NoDisplayCapture;
    use crate::projection::ProjectionMapping;
    use crate::raster::Raster;
    use crossbeam_channel::Sender;
    use std::sync::Mutex;

    struct Queue(Mutex<Vec<Result<Rgb, NativePickError>>>);

    impl NativePicker for Queue {
        fn is_available(&self) -> bool {
            true
        }
        fn pick_pixel(&self, _cancel: &CancelToken) -> Result<Rgb, NativePickError> {
            self.0.lock().unwrap().remove(0)
        }
    }

    struct NoOverlay;

    impl Overlay for NoOverlay {
        fn show(&self) -> Viewport {
            Viewport { width: 1.0, height: 1.0, device_pixel_ratio: 1.0 }
        }
        fn attach(&self, _events: Sender<OverlayEvent>) {}
        fn detach(&self) {}
        fn draw_frame(&self, _frame: &Raster, _mapping: &ProjectionMapping) {}
        fn draw_magnifier(&self, _view: &MagnifierView) {}
        fn hide_magnifier(&self) {}
        fn hide(&self) {}
    }

    fn sampler(results: Vec<Result<Rgb, NativePickError>>) -> ColorSampler<MemoryBackend> {
        ColorSampler::with_parts(
            MemoryBackend::new(),
            Some(Arc::new(Queue(Mutex::new(results)))),
            Arc::new(NoDisplayCapture),
            Arc::new(NoOverlay),
            SamplerConfig::default(),
        )
    }

    #[test]
    fn test_successful_picks_feed_history() {
        let sampler = sampler(vec![
            Ok(Rgb::new(0xAA, 0xAA, 0xAA)),
            Ok(Rgb::new(0xBB, 0xBB, 0xBB)),
            Ok(Rgb::new(0xAA, 0xAA, 0xAA)),
        ]);
        for _ in 0..3 {
            assert!(sampler.pick_color().is_picked());
        }
        assert_eq!(sampler.get_history(), vec!["#AAAAAA", "#BBBBBB"]);
    }

    #[test]
    fn test_non_success_leaves_history_alone() {
        let sampler = sampler(vec![
            Err(NativePickError::Aborted),
            Err(NativePickError::Denied("no".into())),
        ]);
        assert_eq!(sampler.pick_color(), PickOutcome::Cancelled);
        assert!(matches!(sampler.pick_color(), PickOutcome::CaptureDenied { .. }));
        assert!(sampler.get_history().is_empty());
    }

    #[test]
    fn test_clear_history() {
        let sampler = sampler(vec![Ok(Rgb::WHITE)]);
        sampler.pick_color();
        assert_eq!(sampler.get_history(), vec!["#FFFFFF"]);
        sampler.clear_history();
        assert!(sampler.get_history().is_empty());
    }

    #[test]
    fn test_derive_color_info_surfaces_format_errors() {
        let sampler = sampler(vec![]);
        assert_eq!(sampler.derive_color_info("#00ff00").unwrap().hex, "#00FF00");
        assert!(matches!(sampler.derive_color_info("#nope"), Err(ColorError::InvalidColorFormat(_))));
    }

    #[test]
    fn test_history_settings_follow_config() {
        let config = SamplerConfig { history_capacity: 2, ..SamplerConfig::default() };
        let sampler = ColorSampler::with_parts(
            MemoryBackend::new(),
            None,
            Arc::new(NoDisplayCapture),
            Arc::new(NoOverlay),
            config,
        );
        for hex in ["#010101", "#020202", "#030303"] {
            sampler.history().add(hex).unwrap();
        }
        assert_eq!(sampler.get_history(), vec!["#030303", "#020202"]);
    }
}
