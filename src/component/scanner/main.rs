use super::archive_cleaner::{ArchiveCleanOptions, ArchiveCleaner};
use super::classifier::Classifier;
use super::scan_result::ScanResult;
use crate::component::archive::ArchiveHandler;
use crate::config::ExtensionRules;
use crate::tools::{
    ImageAnalyzer, ProgressSender, SpaceProbe, SystemSpaceProbe, is_hidden_name, is_within,
    natural_cmp, resolve_path,
};
use log::{error, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::{DirEntry, FilterEntry, WalkDir};

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub enable_ad_scan: bool,
    /// 設定時才會處理壓縮檔
    pub archive: Option<ArchiveCleanOptions>,
}

/// 目錄樹掃描器
///
/// `run()` 每次呼叫都回傳新的惰性迭代器，依自然排序逐一產出有內容的資料夾。
pub struct Scanner {
    root: PathBuf,
    rules: ExtensionRules,
    analyzer: Arc<dyn ImageAnalyzer>,
    options: ScanOptions,
    archive_handler: ArchiveHandler,
    space_probe: Arc<dyn SpaceProbe>,
    temp_root: PathBuf,
    progress: ProgressSender,
}

impl Scanner {
    #[must_use]
    pub fn new(root: &Path, rules: ExtensionRules, analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        let archive_handler = ArchiveHandler::library_only(&rules);
        Self {
            root: root.to_path_buf(),
            rules,
            analyzer,
            options: ScanOptions::default(),
            archive_handler,
            space_probe: Arc::new(SystemSpaceProbe),
            temp_root: std::env::temp_dir(),
            progress: ProgressSender::disabled(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_archive_handler(mut self, handler: ArchiveHandler) -> Self {
        self.archive_handler = handler;
        self
    }

    #[must_use]
    pub fn with_space_probe(mut self, probe: Arc<dyn SpaceProbe>) -> Self {
        self.space_probe = probe;
        self
    }

    /// 壓縮檔清理使用的暫存根目錄，預設為系統暫存資料夾
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

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn run(&self) -> ScanIter<'_> {
        let resolved_root = resolve_path(&self.root);
        let excluded = self
            .options
            .archive
            .as_ref()
            .map(|archive| resolve_path(&archive.output_dir));
        let root = self.root.clone();

        let prune: Box<dyn FnMut(&DirEntry) -> bool + Send> = Box::new(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            if !entry.file_type().is_dir() {
                return false;
            }
            if is_hidden_name(&entry.file_name().to_string_lossy()) {
                return false;
            }
            // 輸出目錄位於輸入目錄內時，不可再掃進去
            match (&excluded, entry.path().strip_prefix(&root)) {
                (Some(excluded), Ok(relative)) => !is_within(&resolved_root.join(relative), excluded),
                _ => true,
            }
        });

        let walker = WalkDir::new(&self.root)
            .sort_by(|a, b| {
                natural_cmp(&a.file_name().to_string_lossy(), &b.file_name().to_string_lossy())
            })
            .into_iter()
            .filter_entry(prune);

        ScanIter {
            scanner: self,
            walker,
            finished: false,
        }
    }

    fn scan_directory(&self, dir: &Path) -> Option<ScanResult> {
        let classifier = Classifier {
            rules: &self.rules,
            analyzer: self.analyzer.as_ref(),
            enable_ad_scan: self.options.enable_ad_scan,
            archive_scan: self.options.archive.is_some(),
        };

        let listing = match classifier.classify_directory(dir) {
            Ok(listing) => listing,
            Err(e) => {
                warn!("無法讀取資料夾 {}: {e}", dir.display());
                return None;
            }
        };

        let mut result = listing.result;
        if let Some(options) = &self.options.archive {
            for archive in listing.archives {
                self.clean_archive(&archive, options, &mut result);
            }
        }

        (!result.is_empty()).then_some(result)
    }

    fn clean_archive(&self, archive: &Path, options: &ArchiveCleanOptions, result: &mut ScanResult) {
        self.progress
            .send(0, 0, format!("處理壓縮檔: {}", archive.display()));

        let relative_parent = archive
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.root).ok())
            .unwrap_or(Path::new(""))
            .to_path_buf();

        let cleaner = ArchiveCleaner {
            rules: &self.rules,
            analyzer: self.analyzer.as_ref(),
            handler: &self.archive_handler,
            space_probe: self.space_probe.as_ref(),
            temp_root: &self.temp_root,
            enable_ad_scan: self.options.enable_ad_scan,
            options,
        };

        match cleaner.clean(archive, &relative_parent) {
            Ok(true) => result.processed_archives += 1,
            Ok(false) => {}
            Err(e) => {
                if e.is_disk_full() {
                    error!("!!! 磁碟空間不足，已放棄處理壓縮檔 {}: {e}", archive.display());
                } else {
                    error!("處理壓縮檔失敗 {}: {e}", archive.display());
                }
                result.failed_archives.push((archive.to_path_buf(), e.to_string()));
            }
        }
    }
}

type PruneFn = Box<dyn FnMut(&DirEntry) -> bool + Send>;

pub struct ScanIter<'a> {
    scanner: &'a Scanner,
    walker: FilterEntry<walkdir::IntoIter, PruneFn>,
    finished: bool,
}

impl Iterator for ScanIter<'_> {
    type Item = (PathBuf, ScanResult);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(entry) = self.walker.next() else {
                if !self.finished {
                    self.finished = true;
                    self.scanner.progress.send(1, 1, "掃描分析完成");
                }
                return None;
            };

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("掃描時略過無法存取的路徑: {e}");
                    continue;
                }
            };

            let dir = entry.into_path();
            self.scanner
                .progress
                .send(0, 0, format!("掃描中: {}", dir.display()));

            if let Some(result) = self.scanner.scan_directory(&dir) {
                return Some((dir, result));
            }
        }
    }
}
