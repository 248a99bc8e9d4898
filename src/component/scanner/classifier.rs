use super::ad_detector::detect_trailing_ads;
use super::scan_result::ScanResult;
use crate::config::ExtensionRules;
use crate::tools::{ImageAnalyzer, is_hidden_name, natural_cmp};
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Junk,
    /// 需轉檔或直接複製的圖片，尚未經過廣告判斷
    Image,
    /// 開啟壓縮檔掃描時交給壓縮檔清理流程
    Archive,
    /// 文件、白名單檔案等：不是垃圾，也不處理
    Ignored,
}

/// 依序套用規則，第一個符合者決定分類
#[must_use]
pub fn classify_file(rules: &ExtensionRules, path: &Path, archive_scan: bool) -> FileClass {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if rules.is_misc_whitelisted(&name) {
        return FileClass::Ignored;
    }
    if is_hidden_name(&name) || rules.is_system_junk(&name) {
        return FileClass::Junk;
    }
    if archive_scan && rules.is_archive(path) {
        return FileClass::Archive;
    }
    if !rules.is_recognized(path) {
        return FileClass::Junk;
    }
    if rules.is_image(path) {
        return FileClass::Image;
    }
    FileClass::Ignored
}

/// 單一資料夾的分類結果；`archives` 只有在開啟壓縮檔掃描時才會有內容
#[derive(Debug, Default)]
pub struct DirectoryListing {
    pub result: ScanResult,
    pub archives: Vec<PathBuf>,
}

pub struct Classifier<'a> {
    pub rules: &'a ExtensionRules,
    pub analyzer: &'a dyn ImageAnalyzer,
    pub enable_ad_scan: bool,
    pub archive_scan: bool,
}

impl Classifier<'_> {
    /// 分類資料夾內的直接子檔案（不遞迴）
    pub fn classify_directory(&self, dir: &Path) -> io::Result<DirectoryListing> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| {
            natural_cmp(
                &a.file_name().unwrap_or_default().to_string_lossy(),
                &b.file_name().unwrap_or_default().to_string_lossy(),
            )
        });

        let mut listing = DirectoryListing::default();
        let mut candidates = Vec::new();

        for path in files {
            match classify_file(self.rules, &path, self.archive_scan) {
                FileClass::Junk => {
                    debug!("發現雜項檔案: {}", path.display());
                    listing.result.junk.push(path);
                }
                FileClass::Image => candidates.push(path),
                FileClass::Archive => listing.archives.push(path),
                FileClass::Ignored => {}
            }
        }

        let ad_count = if self.enable_ad_scan {
            detect_trailing_ads(self.analyzer, &candidates)
        } else {
            0
        };
        let first_ad = candidates.len() - ad_count;

        for (index, path) in candidates.into_iter().enumerate() {
            if index >= first_ad {
                listing.result.ads.push(path);
            } else if self.rules.is_convert(&path) {
                listing.result.to_convert.push(path);
            } else {
                listing.result.to_copy.push(path);
            }
        }

        Ok(listing)
    }
}
