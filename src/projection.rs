// =============================================================================
// projection.rs - "Contain" fit of a source raster into a destination box
// projection.rs - Ajustement "contain" d'une image source dans une boîte
// =============================================================================
//
// Trois espaces de coordonnées / Three coordinate spaces:
// - logique / logical : coordonnées du pointeur reçues de l'overlay
// - appareil / device : logique × device pixel ratio (grille physique)
// - source            : pixels de l'image capturée
//
// device = offset + source × scale   <=>   source = (device - offset) / scale

use serde::{Deserialize, Serialize};

/// Point 2D
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convertit un point logique en pixels physiques
    /// Converts a logical point into device pixels
    pub fn to_device(self, device_pixel_ratio: f64) -> Self {
        Self::new(self.x * device_pixel_ratio, self.y * device_pixel_ratio)
    }

    /// Convertit un point en pixels physiques en coordonnées logiques
    /// Converts a device-pixel point back into logical coordinates
    pub fn to_logical(self, device_pixel_ratio: f64) -> Self {
        Self::new(self.x / device_pixel_ratio, self.y / device_pixel_ratio)
    }
}

/// Taille 2D
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Placement d'une image source centrée et mise à l'échelle dans une boîte
/// Placement of a source raster, centered and scaled inside a box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionMapping {
    pub offset_x: f64,
    pub offset_y: f64,
    pub draw_width: f64,
    pub draw_height: f64,
    pub scale: f64,
}

impl ProjectionMapping {
    /// Calcule l'ajustement "contain" de `source` dans `dest`
    /// Computes the "contain" fit of `source` inside `dest`
    ///
    /// Retourne `None` si l'une des tailles est vide.
    /// Returns `None` when either size is empty.
    pub fn contain(source: Size, dest: Size) -> Option<Self> {
        if source.is_empty() || dest.is_empty() {
            return None;
        }

        let scale = (dest.width / source.width).min(dest.height / source.height);
        let draw_width = source.width * scale;
        let draw_height = source.height * scale;

        Some(Self {
            offset_x: (dest.width - draw_width) / 2.0,
            offset_y: (dest.height - draw_height) / 2.0,
            draw_width,
            draw_height,
            scale,
        })
    }

    /// Taille de l'image source décrite par ce placement
    /// Size of the source raster this mapping was built for
    pub fn source_size(&self) -> Size {
        Size::new(self.draw_width / self.scale, self.draw_height / self.scale)
    }

    /// Source -> destination (pixels physiques)
    /// Source -> destination (device pixels)
    pub fn to_dest(&self, source: Point) -> Point {
        Point::new(
            self.offset_x + source.x * self.scale,
            self.offset_y + source.y * self.scale,
        )
    }

    /// Destination (pixels physiques) -> source
    /// Destination (device pixels) -> source
    pub fn to_source(&self, dest: Point) -> Point {
        Point::new(
            (dest.x - self.offset_x) / self.scale,
            (dest.y - self.offset_y) / self.scale,
        )
    }

    /// Vrai si le point est dans le rectangle dessiné (hors bandes noires)
    /// True when the point lies inside the drawn rectangle (not the letterbox)
    pub fn contains(&self, dest: Point) -> bool {
        dest.x >= self.offset_x
            && dest.y >= self.offset_y
            && dest.x < self.offset_x + self.draw_width
            && dest.y < self.offset_y + self.draw_height
    }

    /// Pixel source entier sous un point destination, `None` hors du rectangle dessiné
    /// Integer source pixel under a destination point, `None` outside the drawn rectangle
    pub fn source_pixel(&self, dest: Point) -> Option<(u32, u32)> {
        if !self.contains(dest) {
            return None;
        }
        let source = self.to_source(dest);
        let size = self.source_size();
        // Borne pour absorber les erreurs d'arrondi sur le bord droit/bas
        // Clamp to absorb rounding error on the right/bottom edge
        let max_x = (size.width.round() - 1.0).max(0.0);
        let max_y = (size.height.round() - 1.0).max(0.0);
        Some((
            source.x.floor().clamp(0.0, max_x) as u32,
            source.y.floor().clamp(0.0, max_y) as u32,
        ))
    }
}

// =============================================================================
// TESTS
// =============================================================================
