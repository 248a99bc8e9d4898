use std::env;
use std::path::{Path, PathBuf};

/// 外部工具（ffmpeg、7z）的搜尋位置
///
/// 先找 `PATH`，再找 `<base>/resources/<tool>/<tool>[.exe]`。
/// `base` 在啟動時決定一次後注入各元件。
#[derive(Debug, Clone)]
pub struct ResourceLocator {
    base_dir: PathBuf,
}

impl ResourceLocator {
    #[must_use]
    pub const fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// 以執行檔所在資料夾為基準，取不到時使用目前目錄
    #[must_use]
    pub fn from_current_exe() -> Self {
        let base_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base_dir)
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[must_use]
    pub fn find_tool(&self, name: &str) -> Option<PathBuf> {
        find_in_path(name).or_else(|| {
            let bundled = self
                .base_dir
                .join("resources")
                .join(name)
                .join(executable_name(name));
            bundled.is_file().then_some(bundled)
        })
    }
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    let file_name = executable_name(name);
    env::split_paths(&paths)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}
