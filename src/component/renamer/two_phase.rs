//! 兩階段重新命名
//!
//! 目標名稱可能與現有檔名互相衝突（例如 001 與 002 互換），
//! 因此先全部改成唯一的暫存名稱，再改成最終名稱。

use crate::error::Result;
use crate::tools::sort_paths_naturally;
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const COVER_STEM: &str = "cover";
const MIN_DIGITS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOp {
    pub source: PathBuf,
    pub target_name: String,
}

/// 已完成的重新命名（原檔名、新檔名）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedFile {
    pub original: String,
    pub renamed: String,
}

/// 序號位數：至少 3 位，數量較多時加長
#[must_use]
pub fn pad_width(count: usize) -> usize {
    MIN_DIGITS.max(count.to_string().len())
}

/// 序號檔名，保留原副檔名（含大小寫）
#[must_use]
pub fn sequence_name(index: usize, width: usize, source: &Path) -> String {
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{index:0width$}{ext}")
}

fn is_cover(path: &Path) -> bool {
    path.file_stem()
        .is_some_and(|stem| stem.to_string_lossy().eq_ignore_ascii_case(COVER_STEM))
}

/// 產生重新命名計畫；已符合目標名稱的檔案不列入
///
/// 封面（主檔名為 cover）固定排在第一位；只有封面一張圖時不處理。
#[must_use]
pub fn plan_renames(images: &[PathBuf]) -> Vec<RenameOp> {
    let mut ordered = images.to_vec();
    sort_paths_naturally(&mut ordered);

    if let Some(index) = ordered.iter().position(|p| is_cover(p)) {
        if ordered.len() == 1 {
            return Vec::new();
        }
        let cover = ordered.remove(index);
        ordered.insert(0, cover);
    }

    let width = pad_width(ordered.len());
    ordered
        .into_iter()
        .enumerate()
        .filter_map(|(index, source)| {
            let target_name = sequence_name(index, width, &source);
            let current = source.file_name().map(|n| n.to_string_lossy().to_string());
            (current.as_deref() != Some(target_name.as_str())).then_some(RenameOp {
                source,
                target_name,
            })
        })
        .collect()
}

/// 執行計畫
///
/// 第一階段任一檔案失敗時，已改成暫存名稱的檔案會改回原名，整個資料夾放棄處理。
/// 第二階段的失敗只記錄，不影響其他檔案。
pub fn execute_renames(dir: &Path, ops: &[RenameOp]) -> Result<Vec<RenamedFile>> {
    let mut staged: Vec<(PathBuf, &RenameOp)> = Vec::with_capacity(ops.len());

    for op in ops {
        let ext = op
            .source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let temp = dir.join(format!(".tmp_{}{ext}", Uuid::new_v4()));

        if let Err(e) = fs::rename(&op.source, &temp) {
            error!("暫存重新命名失敗 {}: {e}", op.source.display());
            rollback(&staged);
            return Err(e.into());
        }
        staged.push((temp, op));
    }

    let mut renamed = Vec::with_capacity(staged.len());
    for (temp, op) in &staged {
        let original = op
            .source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match fs::rename(temp, dir.join(&op.target_name)) {
            Ok(()) => {
                info!("{original} -> {}", op.target_name);
                renamed.push(RenamedFile {
                    original,
                    renamed: op.target_name.clone(),
                });
            }
            Err(e) => error!("重新命名失敗 {original} -> {}: {e}", op.target_name),
        }
    }

    Ok(renamed)
}

fn rollback(staged: &[(PathBuf, &RenameOp)]) {
    for (temp, op) in staged.iter().rev() {
        if let Err(e) = fs::rename(temp, &op.source) {
            warn!(
                "還原失敗，檔案仍為暫存名稱 {} (原名 {}): {e}",
                temp.display(),
                op.source.display()
            );
        }
    }
}
