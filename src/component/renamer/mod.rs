//! 圖片重新編號元件
//!
//! 以兩階段重新命名避免檔名衝突，並可在壓縮檔內就地處理

mod main;
mod two_phase;

pub use main::{RenameOptions, RenameSummary, Renamer};
pub use two_phase::{RenameOp, RenamedFile, execute_renames, pad_width, plan_renames, sequence_name};
