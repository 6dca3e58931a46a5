// =============================================================================
// picker/magnifier.rs - Loupe : fenêtre de pixels agrandie + réticule
// picker/magnifier.rs - Magnifier: zoomed pixel window + reticle
// =============================================================================

use serde::Serialize;

use crate::color::{should_use_dark_text, Rgb};
use crate::projection::{Point, Size};
use crate::raster::Raster;

/// Ce que l'overlay doit afficher pour la loupe
/// What the overlay must display for the magnifier
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MagnifierView {
    /// Image agrandie (pixels physiques), réticule déjà dessiné
    /// Zoomed image (device pixels), reticle already drawn
    #[serde(skip)]
    pub image: Raster,
    /// Coin haut-gauche, coordonnées logiques de l'overlay
    /// Top-left corner, overlay logical coordinates
    pub position: Point,
    /// Taille affichée, coordonnées logiques
    /// Displayed size, logical coordinates
    pub size: Size,
    /// Pixel source sous le pointeur
    /// Source pixel under the pointer
    pub source_pixel: (u32, u32),
    /// Couleur sous le pointeur (celle qu'un clic retournerait)
    /// Color under the pointer (the one a click would return)
    pub color: Rgb,
    pub hex: String,
}

/// Copie la fenêtre `captured`×`captured` autour du pixel source et l'agrandit
/// Copies the `captured`×`captured` window around the source pixel and zooms it
pub fn render_magnifier(backing: &Raster, source: (u32, u32), captured: u32, zoom: u32, fill: Rgb) -> Raster {
    let zoom = zoom.max(1);
    let window = backing.window(source.0, source.1, captured, fill);
    let mut image = window.scale_nearest(zoom);

    let center = backing.pixel(source.0, source.1).unwrap_or(fill);
    draw_reticle(&mut image, captured / 2, zoom, reticle_color(center));
    image
}

/// Couleur du réticule contrastant avec le pixel central
/// Reticle color contrasting with the center pixel
pub fn reticle_color(center: Rgb) -> Rgb {
    if should_use_dark_text(center) {
        Rgb::BLACK
    } else {
        Rgb::WHITE
    }
}

/// Contour de la cellule centrale + bras du réticule
/// Center cell outline + reticle arms
fn draw_reticle(image: &mut Raster, center_cell: u32, zoom: u32, color: Rgb) {
    let left = center_cell * zoom;
    let right = left + zoom - 1;
    let mid = left + zoom / 2;

    for i in left..=right {
        image.set_pixel(i, left, color);
        image.set_pixel(i, right, color);
        image.set_pixel(left, i, color);
        image.set_pixel(right, i, color);
    }

    // Bras : une cellule de long de chaque côté
    // Arms: one cell long on each side
    for i in left.saturating_sub(zoom)..left {
        image.set_pixel(i, mid, color);
        image.set_pixel(mid, i, color);
    }
    for i in right + 1..=right + zoom {
        image.set_pixel(i, mid, color);
        image.set_pixel(mid, i, color);
    }
}

/// Place la loupe près du pointeur, basculée du côté opposé si elle déborde
/// Places the magnifier near the pointer, flipped to the opposite side on overflow
pub fn place_magnifier(pointer: Point, magnifier: Size, viewport: Size, offset: f64) -> Point {
    let axis = |p: f64, len: f64, limit: f64| {
        let after = p + offset;
        if after + len <= limit {
            after
        } else {
            (p - offset - len).max(0.0)
        }
    };
    Point::new(
        axis(pointer.x, magnifier.width, viewport.width),
        axis(pointer.y, magnifier.height, viewport.height),
    )
}
