/// Decoding of stored images into pixels
/// Decoding is CPU-bound, so the async entry point runs it on the blocking pool
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Result, ViewerError};
use crate::state::data::ImageRef;
use crate::viewport::Size;

/// Pixels of a decoded image plus the reference they came from
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub source: ImageRef,
    pub pixels: Arc<RgbaImage>,
}

impl DecodedImage {
    /// Natural size in pixels
    pub fn natural_size(&self) -> Size {
        Size::new(self.pixels.width() as f64, self.pixels.height() as f64)
    }
}

/// Decode an image on the blocking pool
pub async fn decode_image(image: ImageRef) -> Result<DecodedImage> {
    tokio::task::spawn_blocking(move || decode_blocking(&image))
        .await
        .map_err(|e| ViewerError::DecodeFailure(format!("task join error: {}", e)))?
}

/// Blocking version of `decode_image`
pub fn decode_blocking(image: &ImageRef) -> Result<DecodedImage> {
    let bytes = image.to_bytes()?;
    let pixels = image::load_from_memory(&bytes)
        .map_err(|e| ViewerError::DecodeFailure(e.to_string()))?
        .to_rgba8();

    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(ViewerError::DecodeFailure("image has no pixels".to_string()));
    }

    Ok(DecodedImage {
        source: image.clone(),
        pixels: Arc::new(pixels),
    })
}

/// Read a photo from disk and check that it decodes
pub async fn load_file(path: PathBuf) -> Result<ImageRef> {
    let bytes = tokio::fs::read(&path).await?;
    let image = ImageRef::from_bytes(&bytes);
    decode_image(image.clone()).await?;
    log::debug!("📸 Loaded {}", path.display());
    Ok(image)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    /// PNG data URL of a solid image
    pub(crate) fn png_ref(width: u32, height: u32, pixel: [u8; 4]) -> ImageRef {
        let image = RgbaImage::from_pixel(width, height, Rgba(pixel));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        ImageRef::from_bytes(bytes.get_ref())
    }

    #[test]
    fn test_decode_reports_natural_size() {
        let decoded = decode_blocking(&png_ref(12, 7, [10, 20, 30, 255])).unwrap();
        assert_eq!(decoded.natural_size(), Size::new(12.0, 7.0));
        assert_eq!(decoded.pixels.get_pixel(3, 3), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_garbage_is_a_decode_failure() {
        let garbage = ImageRef::from_bytes_with_mime(b"definitely not a png", "image/png");
        assert!(matches!(decode_blocking(&garbage), Err(ViewerError::DecodeFailure(_))));
        assert!(matches!(
            decode_blocking(&ImageRef::new("")),
            Err(ViewerError::DecodeFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_async_decode() {
        let decoded = decode_image(png_ref(4, 4, [0, 0, 0, 255])).await.unwrap();
        assert_eq!(decoded.pixels.width(), 4);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let result = load_file(PathBuf::from("/definitely/not/here.png")).await;
        assert!(matches!(result, Err(ViewerError::Io(_))));
    }
}
