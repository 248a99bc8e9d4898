use crate::error::{KomaError, Result};
use std::fs;
use std::path::Path;

/// 刪除檔案或資料夾的策略
pub trait Recycler: Send + Sync {
    fn recycle(&self, path: &Path) -> Result<()>;
}

/// 移到系統資源回收筒，可復原
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTrash;

impl Recycler for SystemTrash {
    fn recycle(&self, path: &Path) -> Result<()> {
        trash::delete(path).map_err(|e| KomaError::ToolFailed {
            tool: "trash".to_string(),
            message: e.to_string(),
        })
    }
}

/// 直接刪除，無法復原
#[derive(Debug, Clone, Copy, Default)]
pub struct PermanentDelete;

impl Recycler for PermanentDelete {
    fn recycle(&self, path: &Path) -> Result<()> {
        if path.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_permanent_delete_file_and_dir() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("Thumbs.db");
        let dir = temp.path().join("__MACOSX");
        fs::write(&file, b"x").unwrap();
        fs::create_dir_all(dir.join("inner")).unwrap();

        PermanentDelete.recycle(&file).unwrap();
        PermanentDelete.recycle(&dir).unwrap();

        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn test_permanent_delete_missing_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(PermanentDelete.recycle(&temp.path().join("nope")).is_err());
    }
}
