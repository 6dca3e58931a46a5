// =============================================================================
// DISPLAY CAPTURE - VERSION MACOS
// =============================================================================
// Image de l'écran principal via Core Graphics
// Main display image through Core Graphics
//
// Sans l'autorisation "Enregistrement de l'écran", CGDisplay::image()
// retourne None : la capture est alors refusée.
// Without the "Screen Recording" permission, CGDisplay::image() returns
// None: the capture is then denied.
// =============================================================================

use core_graphics::display::CGDisplay;
use tracing::{debug, warn};

use super::capture::{CaptureStream, DisplayCapture};
use crate::error::CaptureError;
use crate::raster::Raster;

/// Capture Core Graphics de l'écran principal
/// Core Graphics capture of the main display
pub struct CoreGraphicsCapture;

impl DisplayCapture for CoreGraphicsCapture {
    fn start(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let first = capture_main_display()?;
        debug!(width = first.width(), height = first.height(), "Core Graphics capture ready");
        Ok(Box::new(CoreGraphicsStream { pending: Some(first), stopped: false }))
    }
}

struct CoreGraphicsStream {
    pending: Option<Raster>,
    stopped: bool,
}

impl CaptureStream for CoreGraphicsStream {
    fn frame(&mut self) -> Option<Raster> {
        if self.stopped {
            return None;
        }
        if let Some(first) = self.pending.take() {
            return Some(first);
        }
        match capture_main_display() {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, "Display capture failed, keeping previous frame");
                None
            }
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.pending = None;
    }
}

/// Les données CGImage sont en BGRA, lignes éventuellement alignées
/// CGImage data is BGRA, rows possibly padded
fn capture_main_display() -> Result<Raster, CaptureError> {
    let display = CGDisplay::main();
    let image = display
        .image()
        .ok_or_else(|| CaptureError::Denied("screen recording permission not granted".into()))?;

    let bits_per_pixel = image.bits_per_pixel();
    if bits_per_pixel != 32 {
        return Err(CaptureError::Platform(format!("unsupported pixel size: {bits_per_pixel} bits")));
    }

    let data = image.data();
    Raster::from_bgra(
        image.width() as u32,
        image.height() as u32,
        image.bytes_per_row(),
        data.bytes(),
    )
    .ok_or_else(|| CaptureError::Platform("short display image buffer".into()))
}
