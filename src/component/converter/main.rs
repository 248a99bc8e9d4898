use super::conversion_result::ConversionResult;
use super::encoder_command::Encoder;
use super::report::ConversionReport;
use super::task_scheduler::{ConversionTask, TaskKind, TaskScheduler};
use crate::component::scanner::ScanResult;
use crate::error::{KomaError, Result};
use crate::tools::{ImageAnalyzer, copy_preserving_times, file_size};
use log::{info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// 依掃描結果轉檔或複製，輸出目錄保留原本的相對結構
pub struct Converter {
    input_root: PathBuf,
    output_root: PathBuf,
    encoder: Arc<dyn Encoder>,
    analyzer: Arc<dyn ImageAnalyzer>,
    scheduler: TaskScheduler,
}

impl Converter {
    #[must_use]
    pub fn new(
        input_root: &Path,
        output_root: &Path,
        encoder: Arc<dyn Encoder>,
        analyzer: Arc<dyn ImageAnalyzer>,
        scheduler: TaskScheduler,
    ) -> Self {
        Self {
            input_root: input_root.to_path_buf(),
            output_root: output_root.to_path_buf(),
            encoder,
            analyzer,
            scheduler,
        }
    }

    /// 先收集全部任務再交給工作池；報告的結果依完成順序排列
    pub fn run<I>(&self, scan: I) -> ConversionReport
    where
        I: IntoIterator<Item = (PathBuf, ScanResult)>,
    {
        let tasks = self.plan_tasks(scan);
        if tasks.is_empty() {
            info!("沒有需要轉檔或複製的圖片");
            return ConversionReport::default();
        }

        let start = Instant::now();
        let results = self
            .scheduler
            .run(&tasks, |task, result| self.process(task, result));

        ConversionReport::new(results, start.elapsed())
    }

    /// 建立任務並決定每個任務的輸出路徑
    ///
    /// 轉檔: `<output>/<相對父目錄>/<stem><新副檔名>`；複製: `<output>/<相對路徑>`。
    /// 複製的檔案先佔用檔名；之後同名的輸出改為 `<stem>_<原副檔名><副檔名>`，
    /// 仍衝突再加上序號。
    #[must_use]
    pub fn plan_tasks<I>(&self, scan: I) -> Vec<ConversionTask>
    where
        I: IntoIterator<Item = (PathBuf, ScanResult)>,
    {
        let mut tasks = Vec::new();
        let mut taken = HashSet::new();

        for (_, result) in scan {
            for source in result.to_copy {
                let candidate = self.output_root.join(self.relative(&source));
                let target = unique_target(candidate, &source, &mut taken);
                tasks.push(ConversionTask {
                    source,
                    target,
                    kind: TaskKind::Copy,
                });
            }
            for source in result.to_convert {
                let relative = self.relative(&source);
                let stem = relative
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                let name = format!("{stem}{}", self.encoder.extension());
                let candidate = match relative.parent() {
                    Some(parent) => self.output_root.join(parent).join(name),
                    None => self.output_root.join(name),
                };
                let target = unique_target(candidate, &source, &mut taken);
                tasks.push(ConversionTask {
                    source,
                    target,
                    kind: TaskKind::Convert,
                });
            }
        }
        tasks
    }

    fn relative(&self, source: &Path) -> PathBuf {
        source
            .strip_prefix(&self.input_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| source.file_name().map(PathBuf::from).unwrap_or_default())
    }

    fn process(&self, task: &ConversionTask, result: &mut ConversionResult) -> Result<()> {
        if !task.source.is_file() {
            return Err(KomaError::SourceMissing(task.source.clone()));
        }
        result.in_size = file_size(&task.source);

        let target = &task.target;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        match task.kind {
            TaskKind::Convert => {
                let info = self.analyzer.analyze(&task.source);
                self.encoder.encode(&task.source, target, info)?;
                if !target.is_file() {
                    return Err(KomaError::OutputMissing(target.clone()));
                }
                result.finish_converted(file_size(target));
            }
            TaskKind::Copy => {
                copy_preserving_times(&task.source, target)?;
                result.finish_copied(file_size(target));
            }
        }
        Ok(())
    }
}

/// 不分大小寫比對，避免在不分大小寫的檔案系統上互相覆寫
fn collision_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

fn unique_target(candidate: PathBuf, source: &Path, taken: &mut HashSet<String>) -> PathBuf {
    if taken.insert(collision_key(&candidate)) {
        return candidate;
    }

    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = candidate
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let base = match source.extension() {
        Some(source_ext) => format!("{stem}_{}", source_ext.to_string_lossy().to_lowercase()),
        None => stem,
    };

    let mut path = candidate.with_file_name(format!("{base}{ext}"));
    let mut counter = 1;
    while !taken.insert(collision_key(&path)) {
        path = candidate.with_file_name(format!("{base}_{counter}{ext}"));
        counter += 1;
    }
    warn!("輸出檔名衝突，{} 改輸出為 {}", source.display(), path.display());
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::converter::Status;
    use crate::tools::ImageInfo;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// 輸出固定長度內容的假編碼器
    struct FixedEncoder {
        output_len: usize,
        failures_before_success: usize,
        calls: AtomicUsize,
    }

    impl FixedEncoder {
        fn new(output_len: usize) -> Self {
            Self {
                output_len,
                failures_before_success: 0,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Encoder for FixedEncoder {
        fn extension(&self) -> &str {
            ".avif"
        }

        fn encode(&self, _source: &Path, destination: &Path, _info: ImageInfo) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                return Err(KomaError::ToolFailed {
                    tool: "ffmpeg".to_string(),
                    message: "boom".to_string(),
                });
            }
            fs::write(destination, vec![0u8; self.output_len])?;
            Ok(())
        }
    }

    struct PlainAnalyzer;

    impl ImageAnalyzer for PlainAnalyzer {
        fn analyze(&self, _path: &Path) -> ImageInfo {
            ImageInfo::default()
        }

        fn has_ad_qrcode(&self, _path: &Path) -> bool {
            false
        }
    }

    fn converter(input: &Path, output: &Path, encoder: Arc<dyn Encoder>) -> Converter {
        let scheduler = TaskScheduler::new(2, Arc::new(AtomicBool::new(false)))
            .unwrap()
            .with_retry_delay(Duration::ZERO);
        Converter::new(input, output, encoder, Arc::new(PlainAnalyzer), scheduler)
    }

    #[test]
    fn test_convert_and_copy_mirror_structure() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in");
        let output = temp.path().join("out");
        let chapter = input.join("vol1").join("ch1");
        fs::create_dir_all(&chapter).unwrap();
        fs::write(chapter.join("001.jpg"), vec![1u8; 100]).unwrap();
        fs::write(chapter.join("002.webp"), vec![2u8; 30]).unwrap();

        let scan = vec![(
            chapter.clone(),
            ScanResult {
                to_convert: vec![chapter.join("001.jpg")],
                to_copy: vec![chapter.join("002.webp")],
                ..Default::default()
            },
        )];

        let report = converter(&input, &output, Arc::new(FixedEncoder::new(10))).run(scan);

        assert_eq!(report.total(), 2);
        assert!(report.failures().is_empty());
        assert_eq!(fs::read(output.join("vol1/ch1/001.avif")).unwrap().len(), 10);
        assert_eq!(fs::read(output.join("vol1/ch1/002.webp")).unwrap(), vec![2u8; 30]);
    }

    #[test]
    fn test_bigger_output_is_success() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("a.png"), [7u8]).unwrap();

        let scan = vec![(
            input.clone(),
            ScanResult {
                to_convert: vec![input.join("a.png")],
                ..Default::default()
            },
        )];
        let report =
            converter(&input, &temp.path().join("out"), Arc::new(FixedEncoder::new(20))).run(scan);

        assert_eq!(report.results[0].status, Status::Bigger);
        assert!(report.results[0].error.is_empty());
    }

    #[test]
    fn test_retry_recovers_from_transient_failure() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("a.png"), vec![0u8; 50]).unwrap();

        let encoder = Arc::new(FixedEncoder {
            failures_before_success: 2,
            ..FixedEncoder::new(10)
        });
        let scan = vec![(
            input.clone(),
            ScanResult {
                to_convert: vec![input.join("a.png")],
                ..Default::default()
            },
        )];
        let report = converter(&input, &temp.path().join("out"), encoder.clone()).run(scan);

        assert_eq!(encoder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.results[0].status, Status::Success);
    }

    #[test]
    fn test_missing_source_is_reported() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in");
        fs::create_dir_all(&input).unwrap();

        let scan = vec![(
            input.clone(),
            ScanResult {
                to_copy: vec![input.join("gone.png")],
                ..Default::default()
            },
        )];
        let report =
            converter(&input, &temp.path().join("out"), Arc::new(FixedEncoder::new(1))).run(scan);

        assert_eq!(report.results[0].status, Status::Error);
        assert!(report.results[0].error.contains("gone.png"));
    }

    #[test]
    fn test_same_stem_outputs_do_not_overwrite_each_other() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in");
        let output = temp.path().join("out");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("1.jpg"), vec![1u8; 40]).unwrap();
        fs::write(input.join("1.png"), vec![2u8; 40]).unwrap();
        fs::write(input.join("1.avif"), vec![3u8; 5]).unwrap();

        let scan = vec![(
            input.clone(),
            ScanResult {
                to_convert: vec![input.join("1.jpg"), input.join("1.png")],
                to_copy: vec![input.join("1.avif")],
                ..Default::default()
            },
        )];
        let converter = converter(&input, &output, Arc::new(FixedEncoder::new(10)));

        let mut targets: Vec<PathBuf> =
            converter.plan_tasks(scan.clone()).into_iter().map(|t| t.target).collect();
        targets.sort();
        assert_eq!(
            targets,
            vec![output.join("1.avif"), output.join("1_jpg.avif"), output.join("1_png.avif")]
        );

        let report = converter.run(scan);
        assert_eq!(report.total(), 3);
        assert!(report.failures().is_empty());
        assert_eq!(fs::read(output.join("1.avif")).unwrap(), vec![3u8; 5]);
        assert_eq!(fs::read(output.join("1_jpg.avif")).unwrap().len(), 10);
        assert_eq!(fs::read(output.join("1_png.avif")).unwrap().len(), 10);
        assert_eq!(fs::read_dir(&output).unwrap().count(), 3);
    }

    #[test]
    fn test_empty_scan_produces_empty_report() {
        let temp = TempDir::new().unwrap();
        let report = converter(temp.path(), temp.path(), Arc::new(FixedEncoder::new(1)))
            .run(Vec::new());
        assert_eq!(report.total(), 0);
    }
}
