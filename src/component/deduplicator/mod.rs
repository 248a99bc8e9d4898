//! 重複漫畫檢查元件
//!
//! 比對壓縮檔、文件與末端資料夾的名稱，將同一作品的不同版本分組

mod main;
mod title_key;

pub use main::{Deduplicator, DuplicateGroup, DuplicateItem};
pub use title_key::TitleKeyExtractor;
