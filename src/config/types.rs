use crate::component::archive::ArchiveFormat;
use crate::tools::ResourceLocator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

pub const MAX_RECENT_PATHS: usize = 10;

/// 轉檔可選的輸出格式，名稱本身帶有編碼器變體
pub const OUTPUT_FORMATS: [&str; 4] = ["avif (svt)", "avif (aom)", "webp", "jxl"];

pub const DEFAULT_OUTPUT_FORMAT: &str = "avif (svt)";
pub const DEFAULT_QUALITY: u8 = 75;

/// 預設的漫畫檔名解析規則
///
/// 對應 `(展會) [社團 (作者)] 標題 (系列) [語言] 其他`
pub const DEFAULT_COMIC_TITLE_PATTERN: &str = concat!(
    r"(\((?P<event>[^(\[]+)\))?",
    r"\s*",
    r"(\[(?P<artist>[^\]]+)\])?",
    r"\s*",
    r"(?P<title>[^(\[]+)",
    r"\s*",
    r"(\((?P<series>[^\[]+))?",
    r"\s*",
    r"(\[(?P<language>[^\]]+)\])?",
    r"\s*",
    r"(?P<tail>.*)?",
);

/// 副檔名與檔名規則
///
/// 副檔名一律小寫且含前導點（`.jpg`），檔名白名單與系統垃圾檔為小寫完整檔名。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRules {
    #[serde(rename = "CONVERT")]
    pub convert: BTreeSet<String>,
    #[serde(rename = "PASSTHROUGH")]
    pub passthrough: BTreeSet<String>,
    #[serde(rename = "ARCHIVE")]
    pub archive: BTreeSet<String>,
    #[serde(rename = "DOCUMENT")]
    pub document: BTreeSet<String>,
    #[serde(rename = "MISC_WHITELIST")]
    pub misc_whitelist: BTreeSet<String>,
    #[serde(rename = "SYSTEM_JUNK")]
    pub system_junk: BTreeSet<String>,
}

impl ExtensionRules {
    /// 將所有項目轉成小寫，並補上副檔名的前導點
    #[must_use]
    pub fn normalized(self) -> Self {
        let exts = |set: BTreeSet<String>| -> BTreeSet<String> {
            set.into_iter()
                .map(|ext| {
                    let ext = ext.trim().to_lowercase();
                    if ext.starts_with('.') {
                        ext
                    } else {
                        format!(".{ext}")
                    }
                })
                .collect()
        };
        let names = |set: BTreeSet<String>| -> BTreeSet<String> {
            set.into_iter().map(|n| n.trim().to_lowercase()).collect()
        };

        Self {
            convert: exts(self.convert),
            passthrough: exts(self.passthrough),
            archive: exts(self.archive),
            document: exts(self.document),
            misc_whitelist: names(self.misc_whitelist),
            system_junk: names(self.system_junk),
        }
    }

    #[must_use]
    pub fn is_convert(&self, path: &Path) -> bool {
        dotted_extension(path).is_some_and(|ext| self.convert.contains(&ext))
    }

    #[must_use]
    pub fn is_passthrough(&self, path: &Path) -> bool {
        dotted_extension(path).is_some_and(|ext| self.passthrough.contains(&ext))
    }

    /// convert ∪ passthrough
    #[must_use]
    pub fn is_image(&self, path: &Path) -> bool {
        self.is_convert(path) || self.is_passthrough(path)
    }

    #[must_use]
    pub fn is_archive(&self, path: &Path) -> bool {
        dotted_extension(path).is_some_and(|ext| self.archive.contains(&ext))
    }

    #[must_use]
    pub fn is_document(&self, path: &Path) -> bool {
        dotted_extension(path).is_some_and(|ext| self.document.contains(&ext))
    }

    /// 圖片、壓縮檔或文件
    #[must_use]
    pub fn is_recognized(&self, path: &Path) -> bool {
        self.is_image(path) || self.is_archive(path) || self.is_document(path)
    }

    #[must_use]
    pub fn is_misc_whitelisted(&self, file_name: &str) -> bool {
        self.misc_whitelist.contains(&file_name.to_lowercase())
    }

    #[must_use]
    pub fn is_system_junk(&self, file_name: &str) -> bool {
        self.system_junk.contains(&file_name.to_lowercase())
    }
}

/// 取得小寫且含前導點的副檔名
#[must_use]
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterSettings {
    /// 0 代表自動（可用核心數的 75%，至少 1）
    pub max_workers: usize,
    pub format: String,
    /// 1-100
    pub quality: u8,
    pub lossless: bool,
    /// 自訂 ffmpeg 編碼參數，需同時設定 `custom_ext` 才會生效
    pub custom_params: String,
    pub custom_ext: String,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            max_workers: 0,
            format: DEFAULT_OUTPUT_FORMAT.to_string(),
            quality: DEFAULT_QUALITY,
            lossless: false,
            custom_params: String::new(),
            custom_ext: String::new(),
        }
    }
}

impl ConverterSettings {
    #[must_use]
    pub fn actual_workers(&self) -> usize {
        if self.max_workers > 0 {
            return self.max_workers;
        }
        let count = std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get);
        ((count as f64 * 0.75) as usize).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub enable_ad_scan: bool,
    /// 含有這些網域的 QR Code 不視為廣告
    pub qr_whitelist: Vec<String>,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            enable_ad_scan: false,
            qr_whitelist: [
                "x.com",
                "twitter.com",
                "pixiv.net",
                "fanbox.cc",
                "fantia.jp",
                "dlsite.com",
                "dmm.co.jp",
                "melonbooks.co.jp",
                "booth.pm",
                "patreon.com",
                "ko-fi.com",
                "qq.com",
                "weibo.com",
                "bilibili.com",
                "youtube.com",
                "instagram.com",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeSettings {
    pub comic_title_pattern: String,
}

impl Default for DedupeSettings {
    fn default() -> Self {
        Self {
            comic_title_pattern: DEFAULT_COMIC_TITLE_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    pub pack_format: ArchiveFormat,
    /// 清理後重新壓縮；關閉時以資料夾形式輸出
    pub repack: bool,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            pack_format: ArchiveFormat::Cbz,
            repack: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub converter: ConverterSettings,
    pub scanner: ScannerSettings,
    pub dedupe: DedupeSettings,
    pub archive: ArchiveSettings,
    /// 覆寫內建的副檔名規則
    pub extensions: Option<ExtensionRules>,
    pub recent_paths: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub extension_rules: ExtensionRules,
    pub settings: UserSettings,
    pub resources: ResourceLocator,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ExtensionRules {
        ExtensionRules {
            convert: [".JPG", "png"].iter().map(ToString::to_string).collect(),
            passthrough: [".webp"].iter().map(ToString::to_string).collect(),
            archive: [".cbz"].iter().map(ToString::to_string).collect(),
            document: [".pdf"].iter().map(ToString::to_string).collect(),
            misc_whitelist: ["ComicInfo.xml"].iter().map(ToString::to_string).collect(),
            system_junk: ["Thumbs.db"].iter().map(ToString::to_string).collect(),
        }
        .normalized()
    }

    #[test]
    fn test_normalized_adds_dot_and_lowercases() {
        let rules = rules();
        assert!(rules.convert.contains(".jpg"));
        assert!(rules.convert.contains(".png"));
        assert!(rules.misc_whitelist.contains("comicinfo.xml"));
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        let rules = rules();
        assert!(rules.is_convert(Path::new("/a/01.JPG")));
        assert!(rules.is_passthrough(Path::new("/a/01.WebP")));
        assert!(rules.is_image(Path::new("02.png")));
        assert!(rules.is_archive(Path::new("book.CBZ")));
        assert!(rules.is_recognized(Path::new("book.pdf")));
        assert!(!rules.is_recognized(Path::new("notes.txt")));
    }

    #[test]
    fn test_name_lists() {
        let rules = rules();
        assert!(rules.is_misc_whitelisted("COMICINFO.XML"));
        assert!(rules.is_system_junk("thumbs.db"));
        assert!(!rules.is_system_junk("cover.jpg"));
    }

    #[test]
    fn test_actual_workers_fixed() {
        let settings = ConverterSettings {
            max_workers: 3,
            ..Default::default()
        };
        assert_eq!(settings.actual_workers(), 3);
    }

    #[test]
    fn test_actual_workers_auto_is_at_least_one() {
        let settings = ConverterSettings::default();
        assert!(settings.actual_workers() >= 1);
    }
}
