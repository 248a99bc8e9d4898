use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

pub fn validate_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("路徑不存在: {}", path.display());
    }
    if !path.is_dir() {
        bail!("路徑不是資料夾: {}", path.display());
    }
    Ok(())
}

/// 盡可能取得絕對路徑；路徑尚未存在時退回與目前目錄相接
#[must_use]
pub fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
}

/// `path` 是否等於 `root` 或位於其下
#[must_use]
pub fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

/// 以點開頭的檔名或資料夾名稱
#[must_use]
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_directory_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(validate_directory_exists(&file).is_err());
        assert!(validate_directory_exists(temp.path()).is_ok());
        assert!(validate_directory_exists(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_is_within() {
        assert!(is_within(Path::new("/in/out"), Path::new("/in/out")));
        assert!(is_within(Path::new("/in/out/sub"), Path::new("/in/out")));
        assert!(!is_within(Path::new("/in/output"), Path::new("/in/out")));
    }

    #[test]
    fn test_resolve_path_keeps_missing_paths_absolute() {
        let resolved = resolve_path(Path::new("does/not/exist"));
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("does/not/exist"));
    }
}
