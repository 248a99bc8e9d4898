//! 壓縮檔處理元件
//!
//! 優先使用 7-Zip，找不到時以 `zip` crate 處理 zip/cbz

mod format;
mod handler;

pub use format::{ArchiveFormat, CompressionLevel};
pub use handler::ArchiveHandler;
