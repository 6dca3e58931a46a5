//! Configuration constants shared across the sampler
//!
//! These values control the history, the capture overlay and the magnifier.

use serde::{Deserialize, Serialize};

/// Maximum number of colors kept in the recent-color history
pub const HISTORY_CAPACITY: usize = 24;

/// Fixed key of the durable history record
/// The value stored under it is a JSON array of "#RRGGBB" strings
pub const HISTORY_STORAGE_KEY: &str = "cca.color-history";

/// Directory name used under the platform data directory
pub const APP_DATA_DIR_NAME: &str = "cca";

/// Number of source pixels copied into the magnifier (per side)
/// The pointer pixel sits at index CAPTURED_PIXELS / 2 of the window
pub const CAPTURED_PIXELS: u32 = 16;

/// Default integer replication factor for the magnifier
/// magnifier_size = CAPTURED_PIXELS * ZOOM_FACTOR (device pixels)
/// Example: 16 pixels * 10 = 160px magnifier
pub const INITIAL_ZOOM_FACTOR: u32 = 10;

/// Minimum zoom factor (can't zoom out beyond this)
pub const ZOOM_MIN: u32 = 4;

/// Maximum zoom factor (can't zoom in beyond this)
pub const ZOOM_MAX: u32 = 20;

/// Zoom increment per scroll wheel step
pub const ZOOM_STEP: u32 = 2;

/// Distance between the pointer and the magnifier (logical pixels)
pub const MAGNIFIER_OFFSET: f64 = 24.0;

/// Number of device pixels to move when pressing an arrow key
pub const MOVE_PIXELS: f64 = 1.0;

/// Number of device pixels to move when pressing Shift + Arrow key
pub const SHIFT_MOVE_PIXELS: f64 = 50.0;

/// Interval between two redraws of the capture overlay (milliseconds)
/// A fixed interval bounds the CPU cost while the overlay is open
pub const REDRAW_INTERVAL_MS: u64 = 100;

/// Rounding factor applied to the displayed contrast ratios (3 decimals)
pub const ROUNDING_FACTOR: f64 = 1000.0;

/// Color used for magnifier cells falling outside the source raster
pub const OUT_OF_BOUNDS_RGB: (u8, u8, u8) = (128, 128, 128);

/// Luma threshold above which dark text reads better (BT.601, 0-255)
pub const DARK_TEXT_LUMA_THRESHOLD: f64 = 128.0;

// =============================================================================
// CONFIGURATION STRUCTURE
// STRUCTURE DE CONFIGURATION
// =============================================================================

/// Réglages modifiables du sampler, construits à partir des constantes
/// Tunable sampler settings, built from the constants above
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub history_capacity: usize,
    pub history_key: String,
    pub captured_pixels: u32,
    pub zoom: u32,
    pub magnifier_offset: f64,
    pub redraw_interval_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            history_capacity: HISTORY_CAPACITY,
            history_key: HISTORY_STORAGE_KEY.to_string(),
            captured_pixels: CAPTURED_PIXELS,
            zoom: INITIAL_ZOOM_FACTOR,
            magnifier_offset: MAGNIFIER_OFFSET,
            redraw_interval_ms: REDRAW_INTERVAL_MS,
        }
    }
}
