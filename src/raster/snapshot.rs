/// JPEG snapshots of the fullscreen view for shot links
///
/// The snapshot is what the user sees: the visible part of the image at
/// its current pan/zoom, scaled down so the link stays short.
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::error::{Result, ViewerError};
use crate::viewport::ViewportTransform;

/// Widest snapshot we render, in pixels
pub const SNAPSHOT_MAX_WIDTH: u32 = 320;

/// JPEG quality of snapshots
pub const SNAPSHOT_QUALITY: u8 = 75;

/// Links longer than this may not survive chat apps
pub const LONG_LINK_WARNING: usize = 12_000;

/// Render the visible part of `pixels` as a JPEG.
///
/// # Arguments
/// * `pixels` - Decoded image
/// * `view` - Live transform of the surface the image is shown on
///
/// # Returns
/// Encoded JPEG bytes, at most `SNAPSHOT_MAX_WIDTH` wide with the
/// container's aspect ratio.
pub fn render_snapshot_jpeg(pixels: &RgbaImage, view: &ViewportTransform) -> Result<Vec<u8>> {
    let source = view.visible_source_rect();
    let (width, height) = (pixels.width() as f64, pixels.height() as f64);

    // Clip to the image; rounding can leave the rect a pixel outside
    let left = source.left.clamp(0.0, width - 1.0);
    let top = source.top.clamp(0.0, height - 1.0);
    let crop_w = source.width.min(width - left).max(1.0);
    let crop_h = source.height.min(height - top).max(1.0);

    let window = imageops::crop_imm(
        pixels,
        left.floor() as u32,
        top.floor() as u32,
        crop_w.round().max(1.0) as u32,
        crop_h.round().max(1.0) as u32,
    )
    .to_image();

    let target_w = (view.container.width.round() as u32).clamp(1, SNAPSHOT_MAX_WIDTH);
    let target_h = ((target_w as f64) * view.container.height / view.container.width)
        .round()
        .max(1.0) as u32;
    let scaled = imageops::resize(&window, target_w, target_h, FilterType::Triangle);

    let rgb = DynamicImage::ImageRgba8(scaled).to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, SNAPSHOT_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| ViewerError::DecodeFailure(format!("snapshot encode failed: {}", e)))?;

    log::info!("📸 Rendered {}x{} snapshot ({} KB)", target_w, target_h, jpeg.len() / 1024);
    Ok(jpeg)
}
