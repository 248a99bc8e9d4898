use std::path::PathBuf;

/// 單一資料夾的掃描結果
///
/// 同一個檔案只會出現在 `to_convert`、`to_copy`、`ads`、`junk` 其中之一。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub to_convert: Vec<PathBuf>,
    pub to_copy: Vec<PathBuf>,
    pub ads: Vec<PathBuf>,
    pub junk: Vec<PathBuf>,
    /// 已清理並寫出到輸出位置的壓縮檔數量
    pub processed_archives: usize,
    /// 清理失敗的壓縮檔與原因
    pub failed_archives: Vec<(PathBuf, String)>,
}

impl ScanResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_convert.is_empty()
            && self.to_copy.is_empty()
            && self.ads.is_empty()
            && self.junk.is_empty()
            && self.processed_archives == 0
            && self.failed_archives.is_empty()
    }

    /// 依自然排序的圖片（轉檔 + 直接複製）
    #[must_use]
    pub fn images(&self) -> Vec<PathBuf> {
        let mut images: Vec<PathBuf> = self
            .to_convert
            .iter()
            .chain(self.to_copy.iter())
            .cloned()
            .collect();
        crate::tools::sort_paths_naturally(&mut images);
        images
    }

    /// 需要刪除的檔案（垃圾 + 廣告）
    pub fn removable(&self) -> impl Iterator<Item = &PathBuf> {
        self.junk.iter().chain(self.ads.iter())
    }
}
