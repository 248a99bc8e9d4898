use crate::config::load::SETTINGS_FILE;
use crate::config::types::{MAX_RECENT_PATHS, UserSettings};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// 寫入目前工作目錄下的 settings.json
pub fn save_settings(settings: &UserSettings) -> Result<()> {
    save_settings_to(Path::new(SETTINGS_FILE), settings)
}

/// 先寫入同目錄的暫存檔再取代，寫到一半中斷不會留下損毀的設定檔
pub fn save_settings_to(path: &Path, settings: &UserSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings).context("無法序列化設定")?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("無法建立暫存設定檔於 {}", dir.display()))?;
    temp.write_all(content.as_bytes())
        .context("無法寫入暫存設定檔")?;
    temp.persist(path)
        .with_context(|| format!("無法儲存設定到 {}", path.display()))?;

    Ok(())
}

/// 最近使用的路徑移到最前面，去重並限制數量
pub fn add_recent_path(settings: &mut UserSettings, path: &str) {
    settings.recent_paths.retain(|p| p != path);
    settings.recent_paths.insert(0, path.to_string());
    settings.recent_paths.truncate(MAX_RECENT_PATHS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_add_recent_path_moves_to_front() {
        let mut settings = UserSettings::default();
        add_recent_path(&mut settings, "/a");
        add_recent_path(&mut settings, "/b");
        add_recent_path(&mut settings, "/a");
        assert_eq!(settings.recent_paths, vec!["/a", "/b"]);
    }

    #[test]
    fn test_add_recent_path_is_capped() {
        let mut settings = UserSettings::default();
        for i in 0..(MAX_RECENT_PATHS + 5) {
            add_recent_path(&mut settings, &format!("/p{i}"));
        }
        assert_eq!(settings.recent_paths.len(), MAX_RECENT_PATHS);
        assert_eq!(settings.recent_paths[0], format!("/p{}", MAX_RECENT_PATHS + 4));
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, "old").unwrap();

        let mut settings = UserSettings::default();
        add_recent_path(&mut settings, "/comics");
        save_settings_to(&path, &settings).unwrap();

        let saved: UserSettings = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.recent_paths, vec!["/comics"]);
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }
}
