//! 目錄掃描元件
//!
//! 分類圖片、垃圾檔與廣告頁，並可就地清理壓縮檔

mod ad_detector;
mod archive_cleaner;
mod classifier;
mod main;
mod scan_result;

pub use ad_detector::detect_trailing_ads;
pub use archive_cleaner::ArchiveCleanOptions;
pub use classifier::{FileClass, classify_file};
pub use main::{ScanIter, ScanOptions, Scanner};
pub use scan_result::ScanResult;
