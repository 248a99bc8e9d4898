//! 壓縮檔就地清理：解壓到暫存區、刪除垃圾與廣告、重新輸出

use super::classifier::Classifier;
use crate::component::archive::{ArchiveFormat, ArchiveHandler, CompressionLevel};
use crate::config::ExtensionRules;
use crate::error::{KomaError, Result};
use crate::tools::{
    ImageAnalyzer, SpaceProbe, estimate_extract_space, file_size, move_merge_dir, natural_cmp,
};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ArchiveCleanOptions {
    /// 清理後的輸出根目錄，會保留壓縮檔相對於掃描根目錄的路徑
    pub output_dir: PathBuf,
    /// 重新壓縮；否則以資料夾形式輸出
    pub repack: bool,
    pub format: ArchiveFormat,
}

pub struct ArchiveCleaner<'a> {
    pub rules: &'a ExtensionRules,
    pub analyzer: &'a dyn ImageAnalyzer,
    pub handler: &'a ArchiveHandler,
    pub space_probe: &'a dyn SpaceProbe,
    pub temp_root: &'a Path,
    pub enable_ad_scan: bool,
    pub options: &'a ArchiveCleanOptions,
}

impl ArchiveCleaner<'_> {
    /// 清理單一壓縮檔，回傳是否有寫出清理後的結果
    ///
    /// 沒有任何檔案需要刪除時，原壓縮檔保持不動，也不產生輸出。
    pub fn clean(&self, archive: &Path, relative_parent: &Path) -> Result<bool> {
        let required = estimate_extract_space(file_size(archive));
        if let Some(available) = self.space_probe.available_space(self.temp_root)
            && available < required
        {
            return Err(KomaError::InsufficientDiskSpace {
                path: archive.to_path_buf(),
                required,
                available,
            });
        }

        let temp = tempfile::Builder::new()
            .prefix("koma_clean_")
            .tempdir_in(self.temp_root)?;
        self.handler.extract(archive, temp.path())?;

        let stem = archive
            .file_stem()
            .ok_or_else(|| KomaError::InvalidPath(archive.to_path_buf(), "缺少檔名".into()))?;
        let container = temp.path().join(stem);

        let deleted = self.clean_tree(&container)?;
        if deleted == 0 {
            info!("壓縮檔無需清理，略過: {}", archive.display());
            return Ok(false);
        }

        let out_dir = self.options.output_dir.join(relative_parent);
        if self.options.repack {
            let output = out_dir.join(format!(
                "{}.{}",
                stem.to_string_lossy(),
                self.options.format.extension()
            ));
            self.handler.pack(
                &container,
                &output,
                self.options.format,
                CompressionLevel::for_format(self.options.format),
            )?;
            info!("已清理 {deleted} 個檔案並重新打包: {}", output.display());
        } else {
            let output = out_dir.join(stem);
            move_merge_dir(&container, &output)?;
            info!("已清理 {deleted} 個檔案並輸出資料夾: {}", output.display());
        }

        Ok(true)
    }

    /// 遞迴刪除垃圾檔與尾端廣告，回傳刪除的檔案數
    fn clean_tree(&self, root: &Path) -> Result<usize> {
        let mut deleted = 0;
        let mut junk_dirs = Vec::new();
        let mut dirs = Vec::new();

        let walker = WalkDir::new(root)
            .sort_by(|a, b| {
                natural_cmp(&a.file_name().to_string_lossy(), &b.file_name().to_string_lossy())
            })
            .into_iter()
            .filter_entry(|e| {
                let is_junk_dir = e.depth() > 0
                    && e.file_type().is_dir()
                    && self.rules.is_system_junk(&e.file_name().to_string_lossy());
                if is_junk_dir {
                    junk_dirs.push(e.path().to_path_buf());
                }
                !is_junk_dir
            });

        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_dir() {
                dirs.push(entry.into_path());
            }
        }

        for dir in junk_dirs {
            let files = WalkDir::new(&dir)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_file())
                .count();
            fs::remove_dir_all(&dir)?;
            debug!("已刪除垃圾資料夾: {}", dir.display());
            deleted += files.max(1);
        }

        let classifier = Classifier {
            rules: self.rules,
            analyzer: self.analyzer,
            enable_ad_scan: self.enable_ad_scan,
            archive_scan: false,
        };
        for dir in dirs {
            let listing = classifier.classify_directory(&dir)?;
            for path in listing.result.removable() {
                fs::remove_file(path)?;
                debug!("已刪除: {}", path.display());
                deleted += 1;
            }
        }

        Ok(deleted)
    }
}
