use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// 複製檔案並保留存取與修改時間
pub fn copy_preserving_times(src: &Path, dst: &Path) -> io::Result<u64> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = fs::copy(src, dst)?;

    let metadata = fs::metadata(src)?;
    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);
    // 部分檔案系統不支援設定時間，不影響複製結果
    let _ = filetime::set_file_times(dst, atime, mtime);

    Ok(bytes)
}

/// 將 `src` 資料夾的內容合併進 `dst`，同名檔案會被覆蓋
///
/// 先嘗試 rename，跨磁碟時退回複製後刪除。
pub fn move_merge_dir(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in WalkDir::new(src).min_depth(1).contents_first(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if target.exists() {
                fs::remove_file(&target)?;
            }
            if fs::rename(entry.path(), &target).is_err() {
                copy_preserving_times(entry.path(), &target)?;
                fs::remove_file(entry.path())?;
            }
        }
    }

    fs::remove_dir_all(src)
}

/// 移動單一檔案，跨磁碟時退回複製後刪除
pub fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(src, dst).is_err() {
        copy_preserving_times(src, dst)?;
        fs::remove_file(src)?;
    }
    Ok(())
}

/// 檔案大小，無法讀取時為 0
#[must_use]
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_preserves_mtime() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.jpg");
        let dst = temp.path().join("out/nested/a.jpg");
        fs::write(&src, b"data").unwrap();
        let past = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&src, past).unwrap();

        let bytes = copy_preserving_times(&src, &dst).unwrap();

        assert_eq!(bytes, 4);
        let meta = fs::metadata(&dst).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), past);
    }

    #[test]
    fn test_move_file_creates_parent() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.cbz");
        let dst = temp.path().join("x/y/a.cbz");
        fs::write(&src, b"zip").unwrap();

        move_file(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"zip");
    }

    #[test]
    fn test_move_merge_into_existing_tree() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("sub/1.jpg"), b"new").unwrap();
        fs::write(src.join("2.jpg"), b"two").unwrap();
        fs::write(dst.join("keep.txt"), b"keep").unwrap();

        move_merge_dir(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("sub/1.jpg")).unwrap(), b"new");
        assert_eq!(fs::read(dst.join("2.jpg")).unwrap(), b"two");
        assert!(dst.join("keep.txt").exists());
    }
}
