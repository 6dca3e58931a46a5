// =============================================================================
// raster.rs - Image RGB en mémoire (trame capturée, loupe)
// raster.rs - In-memory RGB image (captured frame, magnifier)
// =============================================================================

use crate::color::Rgb;
use crate::projection::Size;

/// Image RGB, lignes de haut en bas
/// RGB image, rows top to bottom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl Raster {
    /// Image unie
    /// Solid image
    pub fn new(width: u32, height: u32, fill: Rgb) -> Self {
        Self { width, height, pixels: vec![fill; width as usize * height as usize] }
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> Rgb) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self { width, height, pixels }
    }

    /// Construit une image depuis des données BGRA (format GDI / Core Graphics)
    /// Builds an image from BGRA data (GDI / Core Graphics layout)
    ///
    /// `bytes_per_row` peut dépasser `width * 4` (alignement des lignes).
    /// `bytes_per_row` may exceed `width * 4` (row padding).
    pub fn from_bgra(width: u32, height: u32, bytes_per_row: usize, data: &[u8]) -> Option<Self> {
        let row_len = width as usize * 4;
        if bytes_per_row < row_len || data.len() < bytes_per_row * height.saturating_sub(1) as usize + row_len {
            return None;
        }

        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for row in data.chunks(bytes_per_row).take(height as usize) {
            for px in row[..row_len].chunks_exact(4) {
                // Bleu en premier (format BGRA) / Blue first (BGRA format)
                pixels.push(Rgb::new(px[2], px[1], px[0]));
            }
        }
        Some(Self { width, height, pixels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// Lecture d'un pixel, `None` hors limites
    /// Single pixel read, `None` out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x < self.width && y < self.height {
            self.pixels.get(y as usize * self.width as usize + x as usize).copied()
        } else {
            None
        }
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        if x < self.width && y < self.height {
            let idx = y as usize * self.width as usize + x as usize;
            self.pixels[idx] = color;
        }
    }

    /// Copie une fenêtre `size`×`size` dont le pixel central est (`cx`, `cy`)
    /// Copies a `size`×`size` window whose center pixel is (`cx`, `cy`)
    ///
    /// Le centre est à l'indice `size / 2`; les cellules hors image valent `fill`.
    /// The center sits at index `size / 2`; cells outside the image get `fill`.
    pub fn window(&self, cx: u32, cy: u32, size: u32, fill: Rgb) -> Raster {
        let half = i64::from(size / 2);
        let left = i64::from(cx) - half;
        let top = i64::from(cy) - half;
        Raster::from_fn(size, size, |x, y| {
            let sx = left + i64::from(x);
            let sy = top + i64::from(y);
            if sx < 0 || sy < 0 {
                return fill;
            }
            self.pixel(sx as u32, sy as u32).unwrap_or(fill)
        })
    }

    /// Agrandissement par réplication entière (plus proche voisin, sans lissage)
    /// Integer pixel-replication upscale (nearest neighbor, no smoothing)
    pub fn scale_nearest(&self, factor: u32) -> Raster {
        let factor = factor.max(1);
        Raster::from_fn(self.width * factor, self.height * factor, |x, y| {
            self.pixels[(y / factor) as usize * self.width as usize + (x / factor) as usize]
        })
    }

    /// Données RGBA opaques, pour l'affichage côté interface
    /// Opaque RGBA bytes, for display on the UI side
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| [p.r, p.g, p.b, 255]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> Raster {
        Raster::from_fn(w, h, |x, y| Rgb::new(x as u8, y as u8, 7))
    }

    #[test]
    fn test_pixel_bounds() {
        let r = gradient(4, 3);
        assert_eq!(r.pixel(3, 2), Some(Rgb::new(3, 2, 7)));
        assert_eq!(r.pixel(4, 0), None);
        assert_eq!(r.pixel(0, 3), None);
    }

    #[test]
    fn test_from_bgra_with_padding() {
        // 2×2, 12 octets par ligne (4 de bourrage)
        // 2×2, 12 bytes per row (4 bytes padding)
        let data = [
            1, 2, 3, 255, 4, 5, 6, 255, 0, 0, 0, 0, //
            7, 8, 9, 255, 10, 11, 12, 255, 0, 0, 0, 0,
        ];
        let r = Raster::from_bgra(2, 2, 12, &data).unwrap();
        assert_eq!(r.pixel(0, 0), Some(Rgb::new(3, 2, 1)));
        assert_eq!(r.pixel(1, 1), Some(Rgb::new(12, 11, 10)));
        assert!(Raster::from_bgra(2, 2, 12, &data[..16]).is_none());
        assert!(Raster::from_bgra(4, 1, 8, &data).is_none());
    }

    #[test]
    fn test_window_centered_with_fill() {
        let r = gradient(10, 10);
        let fill = Rgb::new(128, 128, 128);
        let w = r.window(5, 5, 4, fill);
        assert_eq!(w.width(), 4);
        // Pixel central à l'indice 2 / Center pixel at index 2
        assert_eq!(w.pixel(2, 2), Some(Rgb::new(5, 5, 7)));
        assert_eq!(w.pixel(0, 0), Some(Rgb::new(3, 3, 7)));

        let corner = r.window(0, 0, 4, fill);
        assert_eq!(corner.pixel(0, 0), Some(fill));
        assert_eq!(corner.pixel(2, 2), Some(Rgb::new(0, 0, 7)));

        let edge = r.window(9, 9, 4, fill);
        assert_eq!(edge.pixel(3, 3), Some(fill));
    }

    #[test]
    fn test_scale_nearest_replicates() {
        let r = gradient(2, 2);
        let big = r.scale_nearest(3);
        assert_eq!((big.width(), big.height()), (6, 6));
        for y in 0..6 {
            for x in 0..6 {
                assert_eq!(big.pixel(x, y), r.pixel(x / 3, y / 3));
            }
        }
    }

    #[test]
    fn test_to_rgba() {
        let r = Raster::new(1, 2, Rgb::new(9, 8, 7));
        assert_eq!(r.to_rgba(), vec![9, 8, 7, 255, 9, 8, 7, 255]);
    }
}
