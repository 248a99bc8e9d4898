use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use zip::CompressionMethod;

/// 可輸出的壓縮格式，`cbz`/`cb7` 只是換了副檔名的 zip/7z
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArchiveFormat {
    #[serde(rename = "zip")]
    Zip,
    #[default]
    #[serde(rename = "cbz")]
    Cbz,
    #[serde(rename = "7z")]
    SevenZ,
    #[serde(rename = "cb7")]
    Cb7,
}

impl ArchiveFormat {
    pub const ALL: [Self; 4] = [Self::Cbz, Self::Zip, Self::Cb7, Self::SevenZ];

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Cbz => "cbz",
            Self::SevenZ => "7z",
            Self::Cb7 => "cb7",
        }
    }

    /// 依副檔名判斷格式，不區分大小寫
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    /// zip 容器，函式庫後備也能處理
    #[must_use]
    pub const fn is_zip_family(self) -> bool {
        matches!(self, Self::Zip | Self::Cbz)
    }

    #[must_use]
    pub const fn is_comic_container(self) -> bool {
        matches!(self, Self::Cbz | Self::Cb7)
    }

    /// 7z 的 `-t` 參數
    #[must_use]
    pub const fn container_type(self) -> &'static str {
        if self.is_zip_family() { "zip" } else { "7z" }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// 呼叫端只選擇「一般壓縮」或「不壓縮」，實際數值由各後端決定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    Normal,
    Store,
}

impl CompressionLevel {
    /// 漫畫容器內的圖片本身已壓縮過，直接儲存即可
    #[must_use]
    pub const fn for_format(format: ArchiveFormat) -> Self {
        if format.is_comic_container() {
            Self::Store
        } else {
            Self::Normal
        }
    }

    #[must_use]
    pub const fn seven_zip_level(self) -> u8 {
        match self {
            Self::Normal => 5,
            Self::Store => 0,
        }
    }

    #[must_use]
    pub const fn zip_method(self) -> CompressionMethod {
        match self {
            Self::Normal => CompressionMethod::Deflated,
            Self::Store => CompressionMethod::Stored,
        }
    }
}
