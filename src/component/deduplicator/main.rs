use super::title_key::TitleKeyExtractor;
use crate::config::ExtensionRules;
use crate::tools::{ProgressSender, is_hidden_name, natural_cmp};
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateItem {
    pub path: PathBuf,
    /// 壓縮檔或文件；否則為末端資料夾
    pub is_archive: bool,
}

/// 同一個模糊鍵下的重複項目，依修改時間新到舊排列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: String,
    pub items: Vec<DuplicateItem>,
}

impl DuplicateGroup {
    /// 除了最新一筆以外的項目
    #[must_use]
    pub fn older(&self) -> &[DuplicateItem] {
        self.items.get(1..).unwrap_or_default()
    }
}

/// 以名稱模糊比對找出重複的漫畫
pub struct Deduplicator {
    rules: ExtensionRules,
    extractor: TitleKeyExtractor,
    progress: ProgressSender,
}

impl Deduplicator {
    #[must_use]
    pub fn new(rules: ExtensionRules, pattern: &str) -> Self {
        Self {
            rules,
            extractor: TitleKeyExtractor::new(pattern),
            progress: ProgressSender::disabled(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn key_of(&self, item: &DuplicateItem) -> String {
        let name = if item.is_archive {
            item.path.file_stem()
        } else {
            item.path.file_name()
        };
        self.extractor
            .key(&name.map(|n| n.to_string_lossy().to_string()).unwrap_or_default())
    }

    /// 回傳至少兩個項目的群組，鍵依自然排序
    #[must_use]
    pub fn run(&self, roots: &[PathBuf]) -> Vec<DuplicateGroup> {
        let mut lookup: HashMap<String, Vec<DuplicateItem>> = HashMap::new();

        for root in roots {
            if !root.exists() {
                warn!("略過不存在的路徑: {}", root.display());
                continue;
            }
            self.progress
                .send(0, 0, format!("掃描根目錄: {}", root.display()));

            for item in self.collect_candidates(root) {
                lookup.entry(self.key_of(&item)).or_default().push(item);
            }
        }

        let mut groups: Vec<DuplicateGroup> = lookup
            .into_iter()
            .filter(|(_, items)| items.len() > 1)
            .map(|(key, mut items)| {
                items.sort_by_cached_key(|item| std::cmp::Reverse(modified_time(&item.path)));
                DuplicateGroup { key, items }
            })
            .collect();
        groups.sort_by(|a, b| natural_cmp(&a.key, &b.key));

        self.progress.send(1, 1, "掃描分析完成");
        info!("重複檢查完成，共 {} 組", groups.len());
        groups
    }

    fn collect_candidates(&self, root: &Path) -> Vec<DuplicateItem> {
        let mut items = Vec::new();
        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !is_hidden_name(&entry.file_name().to_string_lossy())
        });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("略過無法存取的路徑: {e}");
                    continue;
                }
            };
            let path = entry.path();

            if entry.file_type().is_dir() {
                if is_leaf_dir(path) {
                    items.push(DuplicateItem {
                        path: path.to_path_buf(),
                        is_archive: false,
                    });
                }
            } else if self.rules.is_archive(path) || self.rules.is_document(path) {
                items.push(DuplicateItem {
                    path: path.to_path_buf(),
                    is_archive: true,
                });
            }
        }
        items
    }
}

/// 沒有任何可見子資料夾
fn is_leaf_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|entries| {
        !entries.flatten().any(|entry| {
            entry.file_type().is_ok_and(|t| t.is_dir())
                && !is_hidden_name(&entry.file_name().to_string_lossy())
        })
    })
}

fn modified_time(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
