use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

use crate::color::luma;
use crate::error::{Result, ViewerError};
use crate::state::data::ImageRef;

/// Convert an image to black and white.
///
/// Each pixel becomes `Y = 0.299 R + 0.587 G + 0.114 B` on all three
/// channels; alpha is kept. The result is re-encoded as PNG.
/// If anything fails the original image is returned unchanged.
pub fn to_grayscale(image: &ImageRef) -> ImageRef {
    match try_grayscale(image) {
        Ok(converted) => converted,
        Err(e) => {
            log::warn!("⚠️  Keeping original colors: {}", e);
            image.clone()
        }
    }
}

fn try_grayscale(image: &ImageRef) -> Result<ImageRef> {
    let bytes = image.to_bytes()?;
    let source = image::load_from_memory(&bytes)
        .map_err(|e| ViewerError::DecodeFailure(e.to_string()))?
        .to_rgba8();

    let gray = RgbaImage::from_fn(source.width(), source.height(), |x, y| {
        let p = source.get_pixel(x, y);
        let level = luma(p[0], p[1], p[2]).round().clamp(0.0, 255.0) as u8;
        Rgba([level, level, level, p[3]])
    });

    let mut png = Cursor::new(Vec::new());
    gray.write_to(&mut png, ImageFormat::Png)
        .map_err(|e| ViewerError::DecodeFailure(e.to_string()))?;
    Ok(ImageRef::from_bytes_with_mime(png.get_ref(), "image/png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::decode::decode_blocking;
    use crate::raster::decode::tests::png_ref;

    #[test]
    fn test_pixels_become_luma() {
        let red = png_ref(3, 2, [255, 0, 0, 128]);
        let gray = to_grayscale(&red);
        assert!(gray.as_str().starts_with("data:image/png;base64,"));

        let decoded = decode_blocking(&gray).unwrap();
        // 0.299 * 255 = 76.2
        assert_eq!(decoded.pixels.get_pixel(1, 1), &Rgba([76, 76, 76, 128]));
        assert_eq!(decoded.natural_size(), decode_blocking(&red).unwrap().natural_size());
    }

    #[test]
    fn test_failure_returns_original() {
        let broken = ImageRef::from_bytes_with_mime(b"nope", "image/jpeg");
        assert_eq!(to_grayscale(&broken), broken);
    }
}
