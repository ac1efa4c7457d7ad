//! Image validation and encoding for the vision model

use crate::providers::ImageData;
use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

/// Instruction sent with every image
pub const IMAGE_PROMPT: &str = "Describe this image.";

/// Longest side accepted, in pixels
const MAX_DIMENSION: u32 = 16_384;

/// Validate `bytes` as an image and encode it for a data URL
///
/// PNG, JPEG, GIF and WebP are passed through unchanged; any other format
/// the decoder understands is re-encoded as PNG.
pub fn prepare_image(bytes: &[u8]) -> Result<ImageData> {
    let format = image::guess_format(bytes).context("unrecognised image format")?;

    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .context("unreadable image header")?;
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(anyhow!("unsupported image size {}x{}", width, height));
    }

    tracing::debug!("Image {:?} {}x{}", format, width, height);

    match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP => Ok(ImageData {
            mime_type: format.to_mime_type().to_string(),
            base64: STANDARD.encode(bytes),
        }),
        _ => {
            let decoded = image::load_from_memory_with_format(bytes, format)
                .context("failed to decode image")?;
            let mut png = Vec::new();
            decoded
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .context("failed to re-encode image")?;
            Ok(ImageData {
                mime_type: ImageFormat::Png.to_mime_type().to_string(),
                base64: STANDARD.encode(&png),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    pub fn encoded(format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_pixel(3, 2, Rgb([200, 30, 30]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), format).unwrap();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_passthrough() {
        let bytes = fixtures::encoded(ImageFormat::Png);
        let data = prepare_image(&bytes).unwrap();
        assert_eq!(data.mime_type, "image/png");
        assert_eq!(STANDARD.decode(&data.base64).unwrap(), bytes);
    }

    #[test]
    fn test_jpeg_mime_type() {
        let data = prepare_image(&fixtures::encoded(ImageFormat::Jpeg)).unwrap();
        assert_eq!(data.mime_type, "image/jpeg");
        assert!(data.data_url().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_bmp_is_reencoded_as_png() {
        let data = prepare_image(&fixtures::encoded(ImageFormat::Bmp)).unwrap();
        assert_eq!(data.mime_type, "image/png");
        let png = STANDARD.decode(&data.base64).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(prepare_image(b"hello world").is_err());
    }

    #[test]
    fn test_truncated_png_is_rejected() {
        let bytes = fixtures::encoded(ImageFormat::Png);
        assert!(prepare_image(&bytes[..12]).is_err());
    }
}
