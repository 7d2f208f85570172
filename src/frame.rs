//! Decoding of browser-captured frames into bounded RGB images.

use base64::{Engine as _, engine::general_purpose};
use image::{RgbImage, imageops::FilterType};

use crate::error::DecodeError;

/// Native patch size of the vision encoder.
pub const NATIVE_PATCH_SIZE: u32 = 384;

/// Longest edge a decoded frame may have, two encoder patches wide.
pub const MAX_IMAGE_EDGE: u32 = 2 * NATIVE_PATCH_SIZE;

/// A decoded RGB8 frame whose longest edge never exceeds [`MAX_IMAGE_EDGE`].
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
    original_size: (u32, u32),
}

impl DecodedImage {
    /// Wraps an RGB image, downscaling it when it exceeds [`MAX_IMAGE_EDGE`].
    pub fn new(pixels: RgbImage) -> Self {
        let original_size = pixels.dimensions();
        let pixels = match bounded_size(original_size, MAX_IMAGE_EDGE) {
            Some((width, height)) => {
                image::imageops::resize(&pixels, width, height, FilterType::Lanczos3)
            }
            None => pixels,
        };

        Self {
            pixels,
            original_size,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Size of the frame as received, before any downscaling.
    pub fn original_size(&self) -> (u32, u32) {
        self.original_size
    }

    /// Whether the frame was downscaled during decoding.
    pub fn was_resized(&self) -> bool {
        self.original_size != self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Interleaved RGB bytes in row-major order.
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels.into_raw()
    }
}

/// Decodes a data-URI style frame (`data:image/jpeg;base64,...`) into an image.
///
/// Anything up to and including the first comma is treated as the header and
/// dropped; a bare base64 payload is accepted as well.
pub fn decode_frame(raw: &str) -> Result<DecodedImage, DecodeError> {
    let payload = match raw.split_once(',') {
        Some((_header, payload)) => payload,
        None => raw,
    }
    .trim();

    if payload.is_empty() {
        return Err(DecodeError::MissingPayload);
    }

    let bytes = general_purpose::STANDARD.decode(payload)?;
    let image = image::load_from_memory(&bytes)?.to_rgb8();

    let decoded = DecodedImage::new(image);
    log::debug!(
        "Decoded frame: {:?} -> {:?}",
        decoded.original_size(),
        (decoded.width(), decoded.height())
    );

    Ok(decoded)
}

/// Target size that fits `(width, height)` within `max_edge` while keeping the
/// aspect ratio, or `None` when the image is already within bound.
fn bounded_size((width, height): (u32, u32), max_edge: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if longest <= max_edge {
        return None;
    }

    let scale = |edge: u32| {
        let scaled = (edge as f64 * max_edge as f64 / longest as f64).round() as u32;
        scaled.max(1)
    };

    if width >= height {
        Some((max_edge, scale(height)))
    } else {
        Some((scale(width), max_edge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb};
    use std::io::Cursor;

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([120, 60, 200]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, format)
            .unwrap();
        bytes.into_inner()
    }

    fn data_uri(bytes: &[u8], mime: &str) -> String {
        format!(
            "data:{mime};base64,{}",
            general_purpose::STANDARD.encode(bytes)
        )
    }

    #[test]
    fn rejects_empty_payloads() {
        assert!(matches!(decode_frame(""), Err(DecodeError::MissingPayload)));
        assert!(matches!(
            decode_frame("data:image/jpeg;base64,"),
            Err(DecodeError::MissingPayload)
        ));
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = decode_frame("data:image/png;base64,@@not base64@@").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn rejects_non_image_payload() {
        let uri = data_uri(b"definitely not an image", "image/png");
        let err = decode_frame(&uri).unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
    }

    #[test]
    fn keeps_small_images_untouched() {
        let uri = data_uri(&encode(500, 500, ImageFormat::Png), "image/png");
        let img = decode_frame(&uri).unwrap();
        assert_eq!((img.width(), img.height()), (500, 500));
        assert!(!img.was_resized());
        assert_eq!(img.as_raw().len(), 500 * 500 * 3);
    }

    #[test]
    fn downscales_wide_images() {
        let uri = data_uri(&encode(2000, 1000, ImageFormat::Png), "image/png");
        let img = decode_frame(&uri).unwrap();
        assert_eq!((img.width(), img.height()), (768, 384));
        assert_eq!(img.original_size(), (2000, 1000));
        assert!(img.was_resized());
    }

    #[test]
    fn downscales_tall_jpeg_images() {
        let uri = data_uri(&encode(600, 1200, ImageFormat::Jpeg), "image/jpeg");
        let img = decode_frame(&uri).unwrap();
        assert_eq!((img.width(), img.height()), (384, 768));
    }

    #[test]
    fn accepts_bare_base64() {
        let payload = general_purpose::STANDARD.encode(encode(32, 16, ImageFormat::Png));
        let img = decode_frame(&payload).unwrap();
        assert_eq!((img.width(), img.height()), (32, 16));
    }

    #[test]
    fn bound_is_exclusive_of_max_edge() {
        assert_eq!(bounded_size((768, 768), MAX_IMAGE_EDGE), None);
        assert_eq!(bounded_size((769, 10), MAX_IMAGE_EDGE), Some((768, 10)));
        assert_eq!(bounded_size((10000, 1), MAX_IMAGE_EDGE), Some((768, 1)));
    }
}
