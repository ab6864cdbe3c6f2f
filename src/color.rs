/// Color utilities and brightness-adaptive overlay colors
///
/// This module handles:
/// - `#rrggbb` text colors chosen by the user
/// - Mean luminance sampling of the raster under an overlay element
/// - Picking black or white overlay text from that luminance
///
/// Sampling is a fallback only: an explicit user color always wins, and
/// any sampling failure resolves to white.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::viewport::Rect;

/// Threshold for small UI glyphs (close/lock/delete icons)
pub const GLYPH_THRESHOLD: f64 = 128.0;

/// Threshold for body-sized dedication text.
/// Anti-aliased text needs a stronger contrast margin than glyphs.
pub const TEXT_THRESHOLD: f64 = 150.0;

/// Size of the offscreen buffer a sample window is rasterized into
const SAMPLE_BUFFER: (u32, u32) = (90, 70);

/// Size of the buffer used for whole-image luminance
const WHOLE_IMAGE_BUFFER: u32 = 100;

/// An opaque RGB color, written as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const WHITE: HexColor = HexColor { r: 0xff, g: 0xff, b: 0xff };
    pub const BLACK: HexColor = HexColor { r: 0x00, g: 0x00, b: 0x00 };

    /// Parse `#rrggbb` (any case, surrounding whitespace ignored).
    ///
    /// Anything else, including the empty string, is "no color".
    pub fn parse(value: &str) -> Option<HexColor> {
        let value = value.trim();
        let hex = value.strip_prefix('#')?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(HexColor {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// Channels as floats in [0, 1] (for renderers)
    pub fn to_rgb_f32(self) -> [f32; 3] {
        [self.r as f32 / 255.0, self.g as f32 / 255.0, self.b as f32 / 255.0]
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        HexColor::parse(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color `{}`", value)))
    }
}

/// Perceived brightness of one pixel (ITU-R BT.601 weights)
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// Sample window geometry, relative to the natural image size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleProfile {
    /// Window width as a fraction of the natural width
    pub width_fraction: f64,
    pub min_width: f64,
    pub max_width: f64,
    /// Window height as a fraction of the natural height
    pub height_fraction: f64,
    pub min_height: f64,
    pub max_height: f64,
}

impl SampleProfile {
    /// Window used under icons and short labels
    pub const GLYPH: SampleProfile = SampleProfile {
        width_fraction: 0.2,
        min_width: 40.0,
        max_width: 220.0,
        height_fraction: 0.16,
        min_height: 30.0,
        max_height: 160.0,
    };

    /// Window used under the dedication text block
    pub const TEXT: SampleProfile = SampleProfile {
        width_fraction: 0.22,
        min_width: 40.0,
        max_width: 240.0,
        height_fraction: 0.16,
        min_height: 26.0,
        max_height: 180.0,
    };
}

/// Mean luminance of the image region underneath an overlay element
///
/// # Arguments
/// * `image` - The decoded raster, in natural pixels
/// * `anchor` - Bounds of the overlay element
/// * `image_rect` - Rendered bounds of the image, same coordinate space as `anchor`
/// * `profile` - Sample window geometry
///
/// # Returns
/// * Mean of `0.299R + 0.587G + 0.114B` over opaque pixels, or `None` if the
///   image is empty, not laid out, or the window holds no opaque pixel
///
/// # Algorithm
/// 1. Map the anchor's centre through `image_rect` into natural pixels
/// 2. Size a window from the profile and centre it on that point
/// 3. Shift it inside the image, then clip it to the image bounds
/// 4. Rasterize the window into a 90x70 buffer and average it
pub fn sample_region(
    image: &RgbaImage,
    anchor: Rect,
    image_rect: Rect,
    profile: SampleProfile,
) -> Option<f64> {
    let (natural_w, natural_h) = image.dimensions();
    if natural_w == 0 || natural_h == 0 {
        return None;
    }
    if !(image_rect.width > 0.0 && image_rect.height > 0.0) {
        return None;
    }

    let (cx, cy) = anchor.center();
    let rx = ((cx - image_rect.left) / image_rect.width).clamp(0.0, 1.0);
    let ry = ((cy - image_rect.top) / image_rect.height).clamp(0.0, 1.0);
    if !rx.is_finite() || !ry.is_finite() {
        return None;
    }

    let nw = natural_w as f64;
    let nh = natural_h as f64;
    let sx = rx * nw;
    let sy = ry * nh;

    let sample_w = (nw * profile.width_fraction).clamp(profile.min_width, profile.max_width);
    let sample_h = (nh * profile.height_fraction).clamp(profile.min_height, profile.max_height);
    let source_x = (sx - sample_w / 2.0).min(nw - sample_w).max(0.0);
    let source_y = (sy - sample_h / 2.0).min(nh - sample_h).max(0.0);

    // Clip to the image; small images get a window narrower than the profile
    let x0 = (source_x.floor() as u32).min(natural_w - 1);
    let y0 = (source_y.floor() as u32).min(natural_h - 1);
    let w = (sample_w.round() as u32).clamp(1, natural_w - x0);
    let h = (sample_h.round() as u32).clamp(1, natural_h - y0);

    let window = imageops::crop_imm(image, x0, y0, w, h).to_image();
    let buffer = imageops::resize(&window, SAMPLE_BUFFER.0, SAMPLE_BUFFER.1, FilterType::Triangle);
    mean_opaque_luma(&buffer)
}

/// Mean luminance of the whole image (glyph fallback when no anchor works)
pub fn mean_luminance(image: &RgbaImage) -> Option<f64> {
    if image.width() == 0 || image.height() == 0 {
        return None;
    }
    let buffer = imageops::resize(image, WHOLE_IMAGE_BUFFER, WHOLE_IMAGE_BUFFER, FilterType::Triangle);
    mean_opaque_luma(&buffer)
}

/// Average luma over pixels with non-zero alpha
fn mean_opaque_luma(buffer: &RgbaImage) -> Option<f64> {
    let (total, count) = buffer
        .pixels()
        .filter(|p| p[3] > 0)
        .fold((0.0, 0u64), |(total, count), p| (total + luma(p[0], p[1], p[2]), count + 1));

    if count == 0 {
        return None;
    }
    Some(total / count as f64)
}

/// Black over bright backgrounds, white over dark ones
pub fn contrast_color(luminance: f64, threshold: f64) -> HexColor {
    if luminance > threshold {
        HexColor::BLACK
    } else {
        HexColor::WHITE
    }
}

/// Final text color: explicit choice, else sampled contrast, else white
pub fn resolve_text_color(custom: Option<HexColor>, sampled: Option<f64>, threshold: f64) -> HexColor {
    custom
        .or_else(|| sampled.map(|luminance| contrast_color(luminance, threshold)))
        .unwrap_or(HexColor::WHITE)
}

/// Color for a small icon drawn over the image.
///
/// Samples under the icon first, then falls back to the whole-image average.
pub fn glyph_color(image: &RgbaImage, anchor: Rect, image_rect: Rect) -> HexColor {
    let sampled = sample_region(image, anchor, image_rect, SampleProfile::GLYPH)
        .or_else(|| mean_luminance(image));
    resolve_text_color(None, sampled, GLYPH_THRESHOLD)
}

/// Color for dedication / life-span text drawn over the image
pub fn dedication_color(
    custom: Option<HexColor>,
    image: Option<&RgbaImage>,
    anchor: Rect,
    image_rect: Rect,
) -> HexColor {
    if custom.is_some() {
        return resolve_text_color(custom, None, TEXT_THRESHOLD);
    }
    let sampled = image.and_then(|image| sample_region(image, anchor, image_rect, SampleProfile::TEXT));
    resolve_text_color(None, sampled, TEXT_THRESHOLD)
}
