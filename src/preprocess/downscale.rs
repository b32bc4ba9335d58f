//! 画像縮小
//!
//! 長辺を `max_side` 以下に縮小（拡大はしない）し、JPEGで再エンコードする。

use crate::error::{InspectError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use toolkit_inspect_common::reconcile::strip_extension;

#[derive(Debug, Clone, Copy)]
pub struct DownscaleOptions {
    pub max_side: u32,
    /// JPEG品質 (1-100)
    pub quality: u8,
}

impl Default for DownscaleOptions {
    fn default() -> Self {
        Self {
            max_side: 1280,
            quality: 82,
        }
    }
}

/// 送信用に準備した画像
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// 縮小後のサイズ（縦横比維持・四捨五入）
pub fn target_size(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height).max(1);
    let scale = (f64::from(max_side) / f64::from(longest)).min(1.0);
    let w = (f64::from(width) * scale).round().max(1.0) as u32;
    let h = (f64::from(height) * scale).round().max(1.0) as u32;
    (w, h)
}

/// 画像バイト列を縮小してJPEGにする
///
/// ファイル名は拡張子を `.jpg` に置き換える。
pub fn downscale_bytes(bytes: &[u8], file_name: &str, options: DownscaleOptions) -> Result<PreparedImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| InspectError::ImageLoad(format!("{}: {}", file_name, e)))?;

    let (width, height) = target_size(img.width(), img.height(), options.max_side);
    let resized = if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Lanczos3)
    };

    // JPEGはアルファ非対応
    let rgb = resized.to_rgb8();
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, options.quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| InspectError::ImageEncode(format!("{}: {}", file_name, e)))?;

    Ok(PreparedImage {
        file_name: format!("{}.jpg", strip_extension(file_name)),
        mime_type: "image/jpeg",
        bytes: encoded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([120, 80, 40, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_target_size() {
        assert_eq!(target_size(2560, 1280, 1280), (1280, 640));
        assert_eq!(target_size(1000, 3000, 1280), (427, 1280));
        // 小さい画像は拡大しない
        assert_eq!(target_size(640, 480, 1280), (640, 480));
        assert_eq!(target_size(1280, 1280, 1280), (1280, 1280));
    }

    #[test]
    fn test_downscale_large_png() {
        let bytes = png_bytes(2000, 1000);
        let prepared = downscale_bytes(&bytes, "Kit_01.png", DownscaleOptions { max_side: 500, quality: 82 }).unwrap();

        assert_eq!(prepared.file_name, "Kit_01.jpg");
        assert_eq!(prepared.mime_type, "image/jpeg");

        let decoded = image::load_from_memory(&prepared.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (500, 250));
    }

    #[test]
    fn test_downscale_small_image_keeps_size() {
        let bytes = png_bytes(64, 32);
        let prepared = downscale_bytes(&bytes, "small", DownscaleOptions::default()).unwrap();
        assert_eq!(prepared.file_name, "small.jpg");

        let decoded = image::load_from_memory(&prepared.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 32));
    }

    #[test]
    fn test_downscale_invalid_bytes() {
        let result = downscale_bytes(b"not an image", "broken.jpg", DownscaleOptions::default());
        assert!(matches!(result, Err(InspectError::ImageLoad(_))));
    }
}
