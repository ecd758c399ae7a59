//! Image payload preparation for vision requests
//!
//! Every attachment is downscaled and re-encoded before transmission to
//! bound payload size and latency.

use crate::error::{Result, VetDxError};
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Longest accepted edge after downscaling
pub const MAX_IMAGE_EDGE: u32 = 800;

/// JPEG re-encode quality
pub const JPEG_QUALITY: u8 = 80;

/// Image file extensions accepted by the vision pipeline
pub const SUPPORTED_IMAGE_FORMATS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// A re-encoded image ready for either wire encoding
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub base64: String,
    pub mime_type: &'static str,
}

/// Whether the path carries a supported image extension
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            SUPPORTED_IMAGE_FORMATS
                .iter()
                .any(|s| e.eq_ignore_ascii_case(s))
        })
        .unwrap_or(false)
}

impl ImageAttachment {
    /// Load, downscale and re-encode an image file
    pub fn from_path(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .map_err(|e| VetDxError::Parse(format!("Failed to load image {:?}: {}", path, e)))?;

        let rgb = flatten_to_rgb(&img);
        let resized = if rgb.width().max(rgb.height()) > MAX_IMAGE_EDGE {
            image::imageops::resize(
                &rgb,
                scaled_dim(rgb.width(), rgb.width().max(rgb.height())),
                scaled_dim(rgb.height(), rgb.width().max(rgb.height())),
                FilterType::Lanczos3,
            )
        } else {
            rgb
        };

        let mut buffer = Cursor::new(Vec::new());
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
        encoder
            .encode_image(&resized)
            .map_err(|e| VetDxError::Parse(format!("Failed to encode image {:?}: {}", path, e)))?;

        Ok(Self {
            base64: base64::engine::general_purpose::STANDARD.encode(buffer.into_inner()),
            mime_type: "image/jpeg",
        })
    }

    /// Data-URL form used by the OpenAI-compatible provider family
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

fn scaled_dim(dim: u32, longest: u32) -> u32 {
    ((dim as f64) * (MAX_IMAGE_EDGE as f64) / (longest as f64)).round().max(1.0) as u32
}

/// Flatten any alpha channel onto a white background
fn flatten_to_rgb(img: &image::DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let mut blended = [0u8; 3];
        for (i, channel) in blended.iter_mut().enumerate() {
            *channel = ((pixel[i] as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        }
        out.put_pixel(x, y, Rgb(blended));
    }
    out
}
