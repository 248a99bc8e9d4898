use crate::component::archive::ArchiveHandler;
use crate::component::renamer::{pad_width, sequence_name};
use crate::config::ExtensionRules;
use crate::error::Result;
use crate::tools::{
    ProgressSender, copy_preserving_times, is_hidden_name, sort_paths_naturally,
};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindSummary {
    /// 收集到的圖片總數
    pub collected: usize,
    pub copied: usize,
    pub failed: usize,
}

/// 將多個來源依序合併成單一資料夾並重新編號
///
/// 來源可以是單張圖片、壓縮檔或資料夾（只取第一層圖片）。
pub struct Binder {
    rules: ExtensionRules,
    handler: ArchiveHandler,
    temp_root: PathBuf,
    progress: ProgressSender,
}

impl Binder {
    #[must_use]
    pub fn new(rules: ExtensionRules, handler: ArchiveHandler) -> Self {
        Self {
            rules,
            handler,
            temp_root: std::env::temp_dir(),
            progress: ProgressSender::disabled(),
        }
    }

    #[must_use]
    pub fn with_temp_root(mut self, temp_root: PathBuf) -> Self {
        self.temp_root = temp_root;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    pub fn bind(&self, entries: &[PathBuf], output_dir: &Path) -> Result<BindSummary> {
        let mut summary = BindSummary::default();
        if entries.is_empty() {
            warn!("合集清單為空");
            return Ok(summary);
        }

        // 解壓內容必須在複製完成前保留
        let temp = tempfile::Builder::new()
            .prefix("koma_binder_")
            .tempdir_in(&self.temp_root)?;

        info!("開始收集檔案序列...");
        let mut sequence = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            if !entry.exists() {
                warn!("略過不存在的路徑: {}", entry.display());
                continue;
            }
            let images = self.expand(entry, &temp.path().join(index.to_string()));
            info!("從 {} 加入 {} 張圖片", entry.display(), images.len());
            sequence.extend(images);
        }

        summary.collected = sequence.len();
        if sequence.is_empty() {
            warn!("找不到任何圖片，已停止");
            return Ok(summary);
        }
        info!("收集完成，共 {} 張圖片", sequence.len());

        fs::create_dir_all(output_dir)?;
        let width = pad_width(sequence.len());
        let total = sequence.len();

        for (index, source) in sequence.iter().enumerate() {
            let name = sequence_name(index, width, source);
            self.progress
                .send(index + 1, total, format!("輸出: {name}"));
            match copy_preserving_times(source, &output_dir.join(&name)) {
                Ok(_) => summary.copied += 1,
                Err(e) => {
                    error!("複製失敗 {}: {e}", source.display());
                    summary.failed += 1;
                }
            }
        }

        info!("合集整理完成，輸出資料夾: {}", output_dir.display());
        Ok(summary)
    }

    fn expand(&self, entry: &Path, scratch: &Path) -> Vec<PathBuf> {
        if entry.is_dir() {
            return self.folder_images(entry);
        }
        if self.rules.is_image(entry) {
            return vec![entry.to_path_buf()];
        }
        if self.rules.is_archive(entry) {
            self.progress
                .send(0, 0, format!("解壓中: {}", entry.display()));
            return match self.handler.extract(entry, scratch) {
                Ok(root) => self.archive_images(&root),
                Err(e) => {
                    error!("解壓失敗 {}: {e}", entry.display());
                    Vec::new()
                }
            };
        }
        warn!("不支援的檔案類型，略過: {}", entry.display());
        Vec::new()
    }

    /// 資料夾只取第一層的圖片
    fn folder_images(&self, dir: &Path) -> Vec<PathBuf> {
        let mut images: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_file() && self.is_visible_image(p))
                .collect(),
            Err(e) => {
                error!("無法讀取資料夾 {}: {e}", dir.display());
                return Vec::new();
            }
        };
        sort_paths_naturally(&mut images);
        images
    }

    /// 壓縮檔內遞迴收集所有圖片
    fn archive_images(&self, root: &Path) -> Vec<PathBuf> {
        let mut images: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_visible_image(e.path()))
            .map(walkdir::DirEntry::into_path)
            .collect();
        sort_paths_naturally(&mut images);
        images
    }

    fn is_visible_image(&self, path: &Path) -> bool {
        let hidden = path
            .file_name()
            .is_some_and(|n| is_hidden_name(&n.to_string_lossy()));
        !hidden && self.rules.is_image(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_embedded_extension_rules;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn binder() -> Binder {
        let rules = load_embedded_extension_rules().unwrap();
        let handler = ArchiveHandler::library_only(&rules);
        Binder::new(rules, handler)
    }

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
        for (name, data) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_binds_mixed_entries_in_input_order() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let folder = src.join("chapter");
        fs::create_dir_all(folder.join("nested")).unwrap();
        fs::write(folder.join("10.jpg"), b"f10").unwrap();
        fs::write(folder.join("2.png"), b"f2").unwrap();
        fs::write(folder.join("nested/skip.jpg"), b"no").unwrap();
        fs::write(src.join("single.webp"), b"one").unwrap();
        let archive = src.join("book.zip");
        write_zip(&archive, &[("p/2.jpg", b"a2"), ("p/1.jpg", b"a1")]);

        let output = temp.path().join("out");
        let summary = binder()
            .bind(&[src.join("single.webp"), archive, folder], &output)
            .unwrap();

        assert_eq!(summary.collected, 5);
        assert_eq!(summary.copied, 5);
        assert_eq!(
            listing(&output),
            vec!["000.webp", "001.jpg", "002.jpg", "003.png", "004.jpg"]
        );
        assert_eq!(fs::read(output.join("001.jpg")).unwrap(), b"a1");
        assert_eq!(fs::read(output.join("003.png")).unwrap(), b"f2");
        assert_eq!(fs::read(output.join("004.jpg")).unwrap(), b"f10");
    }

    #[test]
    fn test_same_stem_archives_do_not_collide() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a")).unwrap();
        fs::create_dir_all(temp.path().join("b")).unwrap();
        let first = temp.path().join("a/vol.cbz");
        let second = temp.path().join("b/vol.cbz");
        write_zip(&first, &[("1.jpg", b"first")]);
        write_zip(&second, &[("1.jpg", b"second")]);

        let output = temp.path().join("out");
        binder().bind(&[first, second], &output).unwrap();

        assert_eq!(fs::read(output.join("000.jpg")).unwrap(), b"first");
        assert_eq!(fs::read(output.join("001.jpg")).unwrap(), b"second");
    }

    #[test]
    fn test_empty_sequence_creates_no_output() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("empty");
        fs::create_dir_all(&empty).unwrap();
        let output = temp.path().join("out");

        let summary = binder()
            .bind(&[empty, temp.path().join("missing")], &output)
            .unwrap();

        assert_eq!(summary, BindSummary::default());
        assert!(!output.exists());
    }
}
