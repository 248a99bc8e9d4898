//! 單張圖片的特徵判斷：動圖、灰階、廣告 QR Code

use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, ImageFormat, ImageReader, ImageResult};
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// 縮圖邊長，灰階判斷只看縮圖
const GRAYSCALE_SAMPLE_DIMENSION: u32 = 64;
/// 平均飽和度（0-255）低於此值視為灰階
const GRAYSCALE_SATURATION_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageInfo {
    pub is_animated: bool,
    pub is_grayscale: bool,
}

pub trait ImageAnalyzer: Send + Sync {
    /// 讀取失敗時回傳預設值（非動圖、非灰階）
    fn analyze(&self, path: &Path) -> ImageInfo;

    /// 圖片中是否有指向非白名單網域的 QR Code
    fn has_ad_qrcode(&self, path: &Path) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct DefaultImageAnalyzer {
    qr_whitelist: Vec<String>,
}

impl DefaultImageAnalyzer {
    #[must_use]
    pub fn new(qr_whitelist: &[String]) -> Self {
        Self {
            qr_whitelist: qr_whitelist.iter().map(|d| d.to_lowercase()).collect(),
        }
    }

    fn is_whitelisted(&self, payload: &str) -> bool {
        let payload = payload.to_lowercase();
        self.qr_whitelist
            .iter()
            .any(|domain| payload.contains(domain.as_str()))
    }

    fn decode_qr_payloads(path: &Path) -> ImageResult<Vec<String>> {
        let luma = image::open(path)?.to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            luma.width() as usize,
            luma.height() as usize,
            |x, y| luma.get_pixel(x as u32, y as u32).0[0],
        );

        Ok(prepared
            .detect_grids()
            .into_iter()
            .filter_map(|grid| grid.decode().ok().map(|(_, content)| content))
            .collect())
    }
}

impl ImageAnalyzer for DefaultImageAnalyzer {
    fn analyze(&self, path: &Path) -> ImageInfo {
        let is_animated = match detect_animation(path) {
            Ok(animated) => animated,
            Err(e) => {
                debug!("無法判斷是否為動圖 {}: {e}", path.display());
                return ImageInfo::default();
            }
        };

        if is_animated {
            return ImageInfo {
                is_animated: true,
                is_grayscale: false,
            };
        }

        let is_grayscale = detect_grayscale(path).unwrap_or_else(|e| {
            debug!("無法判斷是否為灰階 {}: {e}", path.display());
            false
        });

        ImageInfo {
            is_animated,
            is_grayscale,
        }
    }

    fn has_ad_qrcode(&self, path: &Path) -> bool {
        match Self::decode_qr_payloads(path) {
            Ok(payloads) => payloads.iter().any(|p| !self.is_whitelisted(p)),
            Err(e) => {
                debug!("QR Code 偵測失敗 {}: {e}", path.display());
                false
            }
        }
    }
}

fn detect_animation(path: &Path) -> ImageResult<bool> {
    let format = ImageReader::open(path)?.with_guessed_format()?.format();
    let reader = BufReader::new(File::open(path)?);

    match format {
        Some(ImageFormat::Gif) => {
            let frames = GifDecoder::new(reader)?
                .into_frames()
                .take(2)
                .filter(Result::is_ok)
                .count();
            Ok(frames > 1)
        }
        Some(ImageFormat::WebP) => Ok(WebPDecoder::new(reader)?.has_animation()),
        Some(ImageFormat::Png) => PngDecoder::new(reader)?.is_apng(),
        _ => Ok(false),
    }
}

fn detect_grayscale(path: &Path) -> ImageResult<bool> {
    let thumbnail = image::open(path)?
        .thumbnail_exact(GRAYSCALE_SAMPLE_DIMENSION, GRAYSCALE_SAMPLE_DIMENSION)
        .to_rgb8();

    let pixel_count = thumbnail.pixels().len();
    if pixel_count == 0 {
        return Ok(false);
    }

    let total: f64 = thumbnail.pixels().map(|p| saturation(p.0)).sum();
    Ok(total / (pixel_count as f64) < GRAYSCALE_SATURATION_THRESHOLD)
}

/// HSV 飽和度，0-255
fn saturation([r, g, b]: [u8; 3]) -> f64 {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == 0 {
        return 0.0;
    }
    f64::from(max - min) * 255.0 / f64::from(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn test_saturation() {
        assert_eq!(saturation([0, 0, 0]), 0.0);
        assert_eq!(saturation([128, 128, 128]), 0.0);
        assert_eq!(saturation([255, 0, 0]), 255.0);
    }

    #[test]
    fn test_gray_png_is_grayscale() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gray.png");
        RgbImage::from_fn(32, 32, |x, _| {
            let v = (x * 8) as u8;
            Rgb([v, v, v])
        })
        .save(&path)
        .unwrap();

        let info = DefaultImageAnalyzer::default().analyze(&path);
        assert!(!info.is_animated);
        assert!(info.is_grayscale);
    }

    #[test]
    fn test_color_png_is_not_grayscale() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("red.png");
        RgbImage::from_pixel(16, 16, Rgb([200, 20, 20]))
            .save(&path)
            .unwrap();

        let info = DefaultImageAnalyzer::default().analyze(&path);
        assert!(!info.is_grayscale);
    }

    #[test]
    fn test_unreadable_file_yields_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let analyzer = DefaultImageAnalyzer::default();
        assert_eq!(analyzer.analyze(&path), ImageInfo::default());
        assert!(!analyzer.has_ad_qrcode(&path));
    }

    #[test]
    fn test_whitelist_matching_is_case_insensitive() {
        let analyzer = DefaultImageAnalyzer::new(&["Pixiv.net".to_string()]);
        assert!(analyzer.is_whitelisted("HTTPS://WWW.PIXIV.NET/users/1"));
        assert!(!analyzer.is_whitelisted("https://casino.example"));
    }
}
