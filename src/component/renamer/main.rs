use super::two_phase::{execute_renames, plan_renames};
use crate::component::archive::{ArchiveFormat, ArchiveHandler, CompressionLevel};
use crate::component::scanner::{ScanOptions, Scanner};
use crate::config::ExtensionRules;
use crate::error::{KomaError, Result};
use crate::tools::{
    ImageAnalyzer, ProgressSender, Recycler, SystemTrash, is_hidden_name, move_file, natural_cmp,
    timestamped_report_path, write_csv_with_bom,
};
use chrono::Local;
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const REPORT_PREFIX: &str = "rename_report";
const REPORT_HEADER: [&str; 3] = ["資料夾", "原檔名", "新檔名"];

#[derive(Debug, Clone, Default)]
pub struct RenameOptions {
    pub export_csv: bool,
    /// 設定時會一併處理壓縮檔，並以此格式重新打包
    pub archive_format: Option<ArchiveFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameSummary {
    /// 有檔案被重新命名的資料夾數（含壓縮檔內）
    pub directories: usize,
    pub renamed_files: usize,
    pub archives_repacked: usize,
    pub archives_failed: usize,
    pub report_path: Option<PathBuf>,
}

/// 將每個資料夾的圖片重新編號為 000、001、002…
pub struct Renamer {
    target_dir: PathBuf,
    rules: ExtensionRules,
    analyzer: Arc<dyn ImageAnalyzer>,
    handler: ArchiveHandler,
    recycler: Arc<dyn Recycler>,
    options: RenameOptions,
    temp_root: PathBuf,
    progress: ProgressSender,
}

impl Renamer {
    #[must_use]
    pub fn new(target_dir: &Path, rules: ExtensionRules, analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        let handler = ArchiveHandler::library_only(&rules);
        Self {
            target_dir: target_dir.to_path_buf(),
            rules,
            analyzer,
            handler,
            recycler: Arc::new(SystemTrash),
            options: RenameOptions::default(),
            temp_root: std::env::temp_dir(),
            progress: ProgressSender::disabled(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RenameOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_archive_handler(mut self, handler: ArchiveHandler) -> Self {
        self.handler = handler;
        self
    }

    #[must_use]
    pub fn with_recycler(mut self, recycler: Arc<dyn Recycler>) -> Self {
        self.recycler = recycler;
        self
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

    pub fn run(&self) -> Result<RenameSummary> {
        if !self.target_dir.is_dir() {
            return Err(KomaError::InvalidPath(
                self.target_dir.clone(),
                "不是資料夾".into(),
            ));
        }
        info!("開始重新命名: {}", self.target_dir.display());

        let mut summary = RenameSummary::default();
        let mut rows: Vec<[String; 3]> = Vec::new();

        self.rename_tree(
            &self.target_dir,
            &|dir| dir.display().to_string(),
            &mut summary,
            &mut rows,
        );

        if let Some(format) = self.options.archive_format {
            for archive in self.collect_archives() {
                self.progress
                    .send(0, 0, format!("處理壓縮檔: {}", archive.display()));
                match self.round_trip(&archive, format, &mut summary, &mut rows) {
                    Ok(true) => summary.archives_repacked += 1,
                    Ok(false) => {}
                    Err(e) => {
                        error!("壓縮檔重新命名失敗 {}: {e}", archive.display());
                        summary.archives_failed += 1;
                    }
                }
            }
        }

        if self.options.export_csv && !rows.is_empty() {
            let path = timestamped_report_path(&self.target_dir, REPORT_PREFIX);
            match write_csv_with_bom(&path, &REPORT_HEADER, &rows) {
                Ok(()) => {
                    info!("重新命名對照表已產生: {}", path.display());
                    summary.report_path = Some(path);
                }
                Err(e) => error!("無法產生重新命名對照表: {e}"),
            }
        }

        self.progress.send(1, 1, "重新命名完成");
        info!(
            "重新命名完成：{} 個資料夾、{} 個檔案",
            summary.directories, summary.renamed_files
        );
        Ok(summary)
    }

    /// 以掃描器逐一處理資料夾，回傳本次重新命名的檔案數
    fn rename_tree(
        &self,
        root: &Path,
        label: &dyn Fn(&Path) -> String,
        summary: &mut RenameSummary,
        rows: &mut Vec<[String; 3]>,
    ) -> usize {
        let scanner = Scanner::new(root, self.rules.clone(), Arc::clone(&self.analyzer))
            .with_options(ScanOptions {
                enable_ad_scan: false,
                archive: None,
            });

        let mut renamed_total = 0;
        for (dir, result) in scanner.run() {
            let ops = plan_renames(&result.images());
            if ops.is_empty() {
                continue;
            }

            self.progress
                .send(0, 0, format!("處理資料夾: {}", dir.display()));
            match execute_renames(&dir, &ops) {
                Ok(renamed) if !renamed.is_empty() => {
                    summary.directories += 1;
                    summary.renamed_files += renamed.len();
                    renamed_total += renamed.len();
                    let label = label(&dir);
                    rows.extend(
                        renamed
                            .into_iter()
                            .map(|r| [label.clone(), r.original, r.renamed]),
                    );
                }
                Ok(_) => {}
                Err(e) => warn!("放棄處理資料夾 {}: {e}", dir.display()),
            }
        }
        renamed_total
    }

    fn collect_archives(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.target_dir)
            .sort_by(|a, b| {
                natural_cmp(&a.file_name().to_string_lossy(), &b.file_name().to_string_lossy())
            })
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden_name(&e.file_name().to_string_lossy()))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && self.rules.is_archive(entry.path()))
            .map(walkdir::DirEntry::into_path)
            .collect()
    }

    /// 解壓、重新命名、必要時重新打包；沒有任何變更時原壓縮檔完全不動
    fn round_trip(
        &self,
        archive: &Path,
        format: ArchiveFormat,
        summary: &mut RenameSummary,
        rows: &mut Vec<[String; 3]>,
    ) -> Result<bool> {
        let stem = archive
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| KomaError::InvalidPath(archive.to_path_buf(), "缺少檔名".into()))?;

        let temp = tempfile::Builder::new()
            .prefix("koma_rename_")
            .tempdir_in(&self.temp_root)?;
        self.handler.extract(archive, temp.path())?;
        let container = temp.path().join(&stem);

        let archive_label = archive.display().to_string();
        let label = |dir: &Path| match dir.strip_prefix(&container) {
            Ok(relative) if !relative.as_os_str().is_empty() => {
                format!("{archive_label}/{}", relative.display())
            }
            _ => archive_label.clone(),
        };

        if self.rename_tree(&container, &label, summary, rows) == 0 {
            info!("壓縮檔無需重新命名，略過: {}", archive.display());
            return Ok(false);
        }

        let packed = temp.path().join(format!("{stem}.{}", format.extension()));
        self.handler
            .pack(&container, &packed, format, CompressionLevel::for_format(format))?;

        // 新壓縮檔先搬到原壓縮檔旁，確定存在後才回收原檔
        let staged = staging_path(archive, &stem, format);
        move_file(&packed, &staged)?;

        if let Err(e) = self.recycler.recycle(archive) {
            warn!("無法將原壓縮檔移到回收筒 {}: {e}", archive.display());
        }

        let destination = destination_for(archive, &stem, format);
        if let Err(e) = fs::rename(&staged, &destination) {
            error!(
                "無法將新壓縮檔改名為 {}，保留於 {}",
                destination.display(),
                staged.display()
            );
            return Err(e.into());
        }
        info!("已重新打包: {}", destination.display());
        Ok(true)
    }
}

/// 與原壓縮檔同資料夾的隱藏暫存名稱，掃描時會被略過
fn staging_path(archive: &Path, stem: &str, format: ArchiveFormat) -> PathBuf {
    let parent = archive.parent().unwrap_or(Path::new(""));
    parent.join(format!(".{stem}.koma_repack.{}", format.extension()))
}

/// 目的地已有同名檔案時加上時間戳記，不覆寫
fn destination_for(archive: &Path, stem: &str, format: ArchiveFormat) -> PathBuf {
    let parent = archive.parent().unwrap_or(Path::new(""));
    let destination = parent.join(format!("{stem}.{}", format.extension()));
    if !destination.exists() {
        return destination;
    }
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    parent.join(format!("{stem}_{timestamp}.{}", format.extension()))
}
