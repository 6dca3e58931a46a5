// =============================================================================
// DISPLAY CAPTURE - VERSION WINDOWS
// =============================================================================
// Copie de l'écran principal via GDI, une trame par rafraîchissement
// Main screen copy through GDI, one frame per redraw
// =============================================================================

use tracing::{debug, warn};
use windows::Win32::{
    Foundation::HWND,
    Graphics::Gdi::*,                   // GDI : DC, bitmaps, BitBlt, GetDIBits
    UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN},
};

use super::capture::{CaptureStream, DisplayCapture};
use crate::error::CaptureError;
use crate::raster::Raster;

/// Capture GDI de l'écran principal
/// GDI capture of the main screen
pub struct GdiCapture;

impl DisplayCapture for GdiCapture {
    fn start(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        // Une première copie valide l'accès à l'écran avant d'ouvrir l'overlay
        // A first copy validates screen access before the overlay opens
        let first = capture_screen()?;
        debug!(width = first.width(), height = first.height(), "GDI capture ready");
        Ok(Box::new(GdiStream { pending: Some(first), stopped: false }))
    }
}

struct GdiStream {
    pending: Option<Raster>,
    stopped: bool,
}

impl CaptureStream for GdiStream {
    fn frame(&mut self) -> Option<Raster> {
        if self.stopped {
            return None;
        }
        if let Some(first) = self.pending.take() {
            return Some(first);
        }
        match capture_screen() {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, "GDI capture failed, keeping previous frame");
                None
            }
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.pending = None;
    }
}

// =============================================================================
// CAPTURE D'ÉCRAN
// SCREEN CAPTURE
// =============================================================================

/// Capture l'écran entier dans un bitmap et extrait les pixels (BGRA)
/// Captures the entire screen into a bitmap and extracts the pixels (BGRA)
fn capture_screen() -> Result<Raster, CaptureError> {
    unsafe {
        let width = GetSystemMetrics(SM_CXSCREEN);
        let height = GetSystemMetrics(SM_CYSCREEN);
        if width <= 0 || height <= 0 {
            return Err(CaptureError::NoDisplay);
        }

        let hdc_screen = GetDC(HWND::default());
        if hdc_screen.is_invalid() {
            return Err(CaptureError::Denied("screen device context unavailable".into()));
        }
        let hdc_mem = CreateCompatibleDC(hdc_screen);
        let hbitmap = CreateCompatibleBitmap(hdc_screen, width, height);

        let result = if hbitmap.is_invalid() {
            Err(CaptureError::Platform("CreateCompatibleBitmap failed".into()))
        } else {
            let previous = SelectObject(hdc_mem, hbitmap);
            let copied = BitBlt(hdc_mem, 0, 0, width, height, hdc_screen, 0, 0, SRCCOPY);

            // Négatif = top-down (origine en haut à gauche)
            // Negative = top-down (origin at the top left)
            let mut bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };

            let mut data: Vec<u8> = vec![0; width as usize * height as usize * 4];
            let lines = GetDIBits(
                hdc_mem,
                hbitmap,
                0,
                height as u32,
                Some(data.as_mut_ptr() as *mut _),
                &mut bmi,
                DIB_RGB_COLORS,
            );

            SelectObject(hdc_mem, previous);
            let _ = DeleteObject(hbitmap);

            match copied {
                Err(e) => Err(CaptureError::Denied(e.to_string())),
                Ok(()) if lines != height => Err(CaptureError::Platform(format!("GetDIBits copied {lines} of {height} lines"))),
                Ok(()) => Raster::from_bgra(width as u32, height as u32, width as usize * 4, &data)
                    .ok_or_else(|| CaptureError::Platform("short GDI pixel buffer".into())),
            }
        };

        // Libère les ressources GDI
        // Release GDI resources
        let _ = DeleteDC(hdc_mem);
        let _ = ReleaseDC(HWND::default(), hdc_screen);
        result
    }
}
