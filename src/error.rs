//! 處理元件共用的錯誤型別
//!
//! 單一檔案、單一壓縮檔、單一資料夾是錯誤隔離的最小單位，
//! 元件在該層級攔截 `KomaError` 並記錄，不讓它中斷整批作業。

use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, KomaError>;

/// ENOSPC / ERROR_DISK_FULL
#[cfg(not(windows))]
const DISK_FULL_CODE: i32 = 28;
#[cfg(windows)]
const DISK_FULL_CODE: i32 = 112;

#[derive(thiserror::Error, Debug)]
pub enum KomaError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// 掃描後、處理前來源檔案消失
    #[error("來源檔案不存在: {0}")]
    SourceMissing(PathBuf),

    /// 外部工具回傳成功但沒有產生輸出
    #[error("輸出檔案未產生: {0}")]
    OutputMissing(PathBuf),

    #[error("{tool} 執行失敗: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("找不到必要的外部工具: {0}")]
    ToolUnavailable(String),

    #[error(
        "暫存空間不足: {} 需要約 {required} bytes，可用 {available} bytes",
        path.display()
    )]
    InsufficientDiskSpace {
        path: PathBuf,
        required: u64,
        available: u64,
    },

    #[error("磁碟空間已耗盡: {0}")]
    DiskFull(PathBuf),

    #[error("路徑無效 '{0:?}': {1}")]
    InvalidPath(PathBuf, String),

    #[error("作業已中斷")]
    Interrupted,
}

impl KomaError {
    /// 是否為磁碟空間不足（預估或實際寫入失敗）
    #[must_use]
    pub fn is_disk_full(&self) -> bool {
        match self {
            Self::DiskFull(_) | Self::InsufficientDiskSpace { .. } => true,
            Self::Io(e) => is_disk_full_io(e),
            Self::Zip(zip::result::ZipError::Io(e)) => is_disk_full_io(e),
            _ => false,
        }
    }
}

#[must_use]
pub fn is_disk_full_io(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::StorageFull
        || matches!(error.raw_os_error(), Some(DISK_FULL_CODE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_full_from_raw_os_error() {
        let err = KomaError::Io(io::Error::from_raw_os_error(DISK_FULL_CODE));
        assert!(err.is_disk_full());
    }

    #[test]
    fn test_disk_full_inside_zip_error() {
        let err = KomaError::Zip(zip::result::ZipError::Io(io::Error::from_raw_os_error(
            DISK_FULL_CODE,
        )));
        assert!(err.is_disk_full());
    }

    #[test]
    fn test_not_found_is_not_disk_full() {
        let err = KomaError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(!err.is_disk_full());
    }

    #[test]
    fn test_insufficient_space_counts_as_disk_full() {
        let err = KomaError::InsufficientDiskSpace {
            path: PathBuf::from("a.cbz"),
            required: 10,
            available: 1,
        };
        assert!(err.is_disk_full());
    }
}
