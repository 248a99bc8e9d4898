//! 章節尾端廣告頁偵測
//!
//! 廣告只會連續出現在章節最後，所以從最後一張往前檢查，
//! 遇到第一張「乾淨」的圖片就停止，成本只與廣告頁數有關。

use crate::tools::ImageAnalyzer;
use log::info;
use std::path::PathBuf;

/// 回傳尾端連續廣告頁的數量 k，廣告為 `images[len - k..]`
///
/// `images` 必須已依自然排序。
#[must_use]
pub fn detect_trailing_ads(analyzer: &dyn ImageAnalyzer, images: &[PathBuf]) -> usize {
    let mut count = 0;

    for image in images.iter().rev() {
        if analyzer.analyze(image).is_animated {
            break;
        }

        if !analyzer.has_ad_qrcode(image) {
            break;
        }

        info!("發現疑似廣告圖片: {}", image.display());
        count += 1;
    }

    count
}
