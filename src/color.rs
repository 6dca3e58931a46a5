// =============================================================================
// color.rs - Color model: hex / RGB / HSL conversions and WCAG contrast
// color.rs - Modèle de couleur : conversions hex / RGB / HSL et contraste WCAG
// =============================================================================

use std::fmt;
use std::str::FromStr;

use bigcolor::BigColor;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::ColorError;

// =============================================================================
// TYPES
// =============================================================================

/// Couleur sRGB sur 8 bits par canal
/// sRGB color, 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Format canonique "#RRGGBB" en majuscules
    /// Canonical uppercase "#RRGGBB" form
    pub fn to_hex(&self) -> String {
        rgb_to_hex(i32::from(self.r), i32::from(self.g), i32::from(self.b))
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex_to_rgb(s)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Teinte en degrés [0, 360), saturation et luminosité en pourcents [0, 100]
/// Hue in degrees [0, 360), saturation and lightness in percent [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hsl {
    pub h: u16,
    pub s: u8,
    pub l: u8,
}

impl Hsl {
    pub const fn new(h: u16, s: u8, l: u8) -> Self {
        Self { h, s, l }
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

/// Parse une couleur hexadécimale à 3 ou 6 chiffres (préfixe `#` optionnel)
/// Parses a 3- or 6-digit hex color (optional leading `#`)
///
/// Les chiffres d'une forme courte sont doublés : "#0F8" devient "#00FF88".
/// Short form digits are doubled: "#0F8" becomes "#00FF88".
pub fn hex_to_rgb(hex: &str) -> Result<Rgb, ColorError> {
    let invalid = || ColorError::InvalidColorFormat(hex.to_string());
    let digits = hex.strip_prefix('#').unwrap_or(hex);

    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

    match digits.len() {
        3 => {
            let mut out = [0u8; 3];
            for (slot, c) in out.iter_mut().zip(digits.chars()) {
                let nibble = c.to_digit(16).ok_or_else(invalid)? as u8;
                *slot = nibble * 16 + nibble;
            }
            Ok(Rgb::new(out[0], out[1], out[2]))
        }
        6 => Ok(Rgb::new(
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        )),
        _ => Err(invalid()),
    }
}

/// Formate une couleur RGB en "#RRGGBB", chaque canal ramené dans [0, 255]
/// Formats an RGB color as "#RRGGBB", each channel clamped to [0, 255]
pub fn rgb_to_hex(r: i32, g: i32, b: i32) -> String {
    let clamp = |c: i32| c.clamp(0, 255);
    format!("#{:02X}{:02X}{:02X}", clamp(r), clamp(g), clamp(b))
}

/// Normalise une couleur hexadécimale en "#RRGGBB" majuscule
/// Normalizes a hex color to uppercase "#RRGGBB"
pub fn normalize_hex(hex: &str) -> Result<String, ColorError> {
    hex_to_rgb(hex).map(|rgb| rgb.to_hex())
}

/// Conversion RGB -> HSL (algorithme min/max des canaux)
/// RGB -> HSL conversion (min/max channel algorithm)
pub fn rgb_to_hsl(rgb: Rgb) -> Hsl {
    let r = f64::from(rgb.r) / 255.0;
    let g = f64::from(rgb.g) / 255.0;
    let b = f64::from(rgb.b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        // Gris : pas de teinte ni de saturation
        // Gray: no hue, no saturation
        return Hsl::new(0, 0, (l * 100.0).round() as u8);
    }

    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };

    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    Hsl::new(
        ((h * 60.0).round() as u16) % 360,
        (s * 100.0).round() as u8,
        (l * 100.0).round() as u8,
    )
}

/// Conversion HSL -> RGB, inverse de `rgb_to_hsl` aux arrondis près
/// HSL -> RGB conversion, inverse of `rgb_to_hsl` up to rounding
pub fn hsl_to_rgb(hsl: Hsl) -> Rgb {
    let h = f64::from(hsl.h % 360) / 360.0;
    let s = f64::from(hsl.s.min(100)) / 100.0;
    let l = f64::from(hsl.l.min(100)) / 100.0;

    let to_u8 = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;

    if s == 0.0 {
        let v = to_u8(l);
        return Rgb::new(v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    Rgb::new(
        to_u8(hue_to_channel(p, q, h + 1.0 / 3.0)),
        to_u8(hue_to_channel(p, q, h)),
        to_u8(hue_to_channel(p, q, h - 1.0 / 3.0)),
    )
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

// =============================================================================
// LUMINANCE ET CONTRASTE
// LUMINANCE AND CONTRAST
// =============================================================================

/// Linéarise un canal sRGB normalisé dans [0, 1]
/// Linearizes a normalized sRGB channel in [0, 1]
fn linearize(channel: u8) -> f64 {
    let c = f64::from(channel) / 255.0;
    if c <= 0.03928 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Luminance relative WCAG, dans [0, 1]
/// WCAG relative luminance, in [0, 1]
pub fn relative_luminance(rgb: Rgb) -> f64 {
    0.2126 * linearize(rgb.r) + 0.7152 * linearize(rgb.g) + 0.0722 * linearize(rgb.b)
}

/// Ratio de contraste WCAG entre deux couleurs, symétrique, dans [1, 21]
/// WCAG contrast ratio between two colors, symmetric, in [1, 21]
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let la = relative_luminance(a);
    let lb = relative_luminance(b);
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Arrondit un ratio à 3 décimales pour l'affichage
/// Rounds a ratio to 3 decimals for display
pub fn round_ratio(ratio: f64) -> f64 {
    (ratio * config::ROUNDING_FACTOR).round() / config::ROUNDING_FACTOR
}

/// Détermine si le texte doit être noir ou blanc selon la couleur de fond
/// Determines if text should be black or white based on background color
///
/// Utilise la luma ITU-R BT.601 : Y = 0.299 R + 0.587 G + 0.114 B
/// Uses the ITU-R BT.601 luma: Y = 0.299 R + 0.587 G + 0.114 B
#[inline]
pub fn should_use_dark_text(rgb: Rgb) -> bool {
    let luma = 0.299 * f64::from(rgb.r) + 0.587 * f64::from(rgb.g) + 0.114 * f64::from(rgb.b);
    luma > config::DARK_TEXT_LUMA_THRESHOLD
}

/// Métriques d'accessibilité d'une couleur, calculées à la demande
/// Accessibility metrics of a color, computed on demand
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContrastReport {
    pub luminance: f64,
    pub contrast_on_white: f64,
    pub contrast_on_black: f64,
}

impl ContrastReport {
    pub fn for_color(rgb: Rgb) -> Self {
        Self {
            luminance: relative_luminance(rgb),
            contrast_on_white: contrast_ratio(rgb, Rgb::WHITE),
            contrast_on_black: contrast_ratio(rgb, Rgb::BLACK),
        }
    }

    /// Copie avec les ratios arrondis à 3 décimales
    /// Copy with the ratios rounded to 3 decimals
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            luminance: self.luminance,
            contrast_on_white: round_ratio(self.contrast_on_white),
            contrast_on_black: round_ratio(self.contrast_on_black),
        }
    }
}

/// Toutes les valeurs dérivées affichées pour une couleur
/// All derived values displayed for a color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorInfo {
    pub hex: String,
    pub rgb: Rgb,
    pub hsl: Hsl,
    #[serde(flatten)]
    pub contrast: ContrastReport,
    /// Si la couleur est sombre
    /// If the colour is dark
    pub is_dark: bool,
    pub prefers_dark_text: bool,
}

/// Dérive les valeurs d'affichage d'une couleur hexadécimale
/// Derives the display values of a hex color
pub fn derive_color_info(hex: &str) -> Result<ColorInfo, ColorError> {
    let rgb = hex_to_rgb(hex)?;
    Ok(ColorInfo {
        hex: rgb.to_hex(),
        rgb,
        hsl: rgb_to_hsl(rgb),
        contrast: ContrastReport::for_color(rgb),
        is_dark: BigColor::from_rgb(rgb.r, rgb.g, rgb.b, 1.0).is_dark(),
        prefers_dark_text: should_use_dark_text(rgb),
    })
}

// =============================================================================
// TESTS
// =============================================================================
