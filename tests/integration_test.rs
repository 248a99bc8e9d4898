//! 整合測試 - 掃描器與壓縮檔清理
//!
//! 以假的圖片分析器與磁碟空間探測器取代真實實作，不需要任何外部工具

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use koma::component::archive::{ArchiveFormat, ArchiveHandler};
use koma::component::scanner::{ArchiveCleanOptions, ScanOptions, ScanResult, Scanner};
use koma::config::{ExtensionRules, load_embedded_extension_rules};
use koma::tools::{ImageAnalyzer, ImageInfo, SpaceProbe};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// 依檔名判斷廣告的假分析器，並記錄 QR 偵測次數
#[derive(Default)]
struct FakeAnalyzer {
    ads: HashSet<String>,
    qr_calls: AtomicUsize,
}

impl FakeAnalyzer {
    fn with_ads(names: &[&str]) -> Self {
        Self {
            ads: names.iter().map(ToString::to_string).collect(),
            qr_calls: AtomicUsize::new(0),
        }
    }
}

impl ImageAnalyzer for FakeAnalyzer {
    fn analyze(&self, _path: &Path) -> ImageInfo {
        ImageInfo::default()
    }

    fn has_ad_qrcode(&self, path: &Path) -> bool {
        self.qr_calls.fetch_add(1, Ordering::SeqCst);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        self.ads.contains(&name)
    }
}

struct FixedSpace(u64);

impl SpaceProbe for FixedSpace {
    fn available_space(&self, _path: &Path) -> Option<u64> {
        Some(self.0)
    }
}

fn rules() -> ExtensionRules {
    load_embedded_extension_rules().unwrap()
}

fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, data) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

fn zip_names(path: &Path) -> Vec<String> {
    let zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = zip.file_names().map(ToString::to_string).collect();
    names.sort();
    names
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

fn scan(root: &Path, analyzer: FakeAnalyzer, options: ScanOptions) -> Vec<(PathBuf, ScanResult)> {
    Scanner::new(root, rules(), Arc::new(analyzer))
        .with_options(options)
        .run()
        .collect()
}

fn archive_options(output_dir: PathBuf) -> ScanOptions {
    ScanOptions {
        enable_ad_scan: false,
        archive: Some(ArchiveCleanOptions {
            output_dir,
            repack: true,
            format: ArchiveFormat::Cbz,
        }),
    }
}

/// 測試 1: 資料夾與檔案都依自然排序，且每個檔案只屬於一個分類
#[test]
fn test_scanner_natural_order_and_exclusive_buckets() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    for dir in ["b", "a10", "a2"] {
        fs::create_dir_all(root.join(dir)).unwrap();
        fs::write(root.join(dir).join("1.jpg"), b"x").unwrap();
    }
    for name in ["10.jpg", "2.png", "1.webp", "Thumbs.db", "notes.xyz", "ComicInfo.xml", "doc.pdf"] {
        fs::write(root.join(name), b"x").unwrap();
    }

    let results = scan(root, FakeAnalyzer::default(), ScanOptions::default());

    let dirs: Vec<PathBuf> = results.iter().map(|(d, _)| d.clone()).collect();
    assert_eq!(
        dirs,
        vec![
            root.to_path_buf(),
            root.join("a2"),
            root.join("a10"),
            root.join("b"),
        ]
    );

    let top = &results[0].1;
    assert_eq!(file_names(&top.to_convert), vec!["2.png", "10.jpg"]);
    assert_eq!(file_names(&top.to_copy), vec!["1.webp"]);
    assert_eq!(file_names(&top.junk), vec!["notes.xyz", "Thumbs.db"]);
    assert!(top.ads.is_empty());
    assert_eq!(file_names(&top.images()), vec!["1.webp", "2.png", "10.jpg"]);

    for (_, result) in &results {
        let all: Vec<&PathBuf> = result
            .to_convert
            .iter()
            .chain(&result.to_copy)
            .chain(&result.ads)
            .chain(&result.junk)
            .collect();
        let unique: HashSet<&PathBuf> = all.iter().copied().collect();
        assert_eq!(all.len(), unique.len(), "同一個檔案不可出現在兩個分類");
    }
}

/// 測試 2: 廣告偵測從最後一張往前，遇到乾淨頁面就停止
#[test]
fn test_trailing_ads_stop_at_first_clean_page() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    for i in 1..=6 {
        fs::write(root.join(format!("{i}.jpg")), b"x").unwrap();
    }

    let analyzer = Arc::new(FakeAnalyzer::with_ads(&["5.jpg", "6.jpg", "2.jpg"]));
    let results: Vec<(PathBuf, ScanResult)> =
        Scanner::new(root, rules(), Arc::clone(&analyzer) as Arc<dyn ImageAnalyzer>)
            .with_options(ScanOptions {
                enable_ad_scan: true,
                archive: None,
            })
            .run()
            .collect();

    let result = &results[0].1;
    assert_eq!(file_names(&result.ads), vec!["5.jpg", "6.jpg"]);
    assert_eq!(file_names(&result.to_convert), vec!["1.jpg", "2.jpg", "3.jpg", "4.jpg"]);
    assert!(analyzer.qr_calls.load(Ordering::SeqCst) <= 3);
}

/// 測試 3: 單一資料夾包裝的壓縮檔會解開包裝，多個項目則回傳容器本身
#[test]
fn test_archive_smart_unwrap() {
    let temp = TempDir::new().unwrap();
    let handler = ArchiveHandler::library_only(&rules());

    let wrapped = temp.path().join("wrapped.zip");
    write_zip(
        &wrapped,
        &[("inner/1.jpg", b"1"), ("inner/2.jpg", b"2"), ("Thumbs.db", b"j")],
    );
    let root = handler.extract(&wrapped, &temp.path().join("out")).unwrap();
    assert_eq!(root, temp.path().join("out/wrapped/inner"));

    let flat = temp.path().join("flat.cbz");
    write_zip(&flat, &[("1.jpg", b"1"), ("2.jpg", b"2")]);
    let root = handler.extract(&flat, &temp.path().join("out")).unwrap();
    assert_eq!(root, temp.path().join("out/flat"));
}

/// 測試 4: 不需清理的壓縮檔保持原樣，也不產生輸出
#[test]
fn test_clean_archive_is_left_untouched() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("input");
    let output = temp.path().join("output");
    fs::create_dir_all(&input).unwrap();

    let archive = input.join("clean.cbz");
    write_zip(&archive, &[("001.jpg", b"page1"), ("002.jpg", b"page2")]);
    let before = fs::read(&archive).unwrap();

    let results = scan(&input, FakeAnalyzer::default(), archive_options(output.clone()));

    assert!(results.iter().all(|(_, r)| r.processed_archives == 0));
    assert_eq!(fs::read(&archive).unwrap(), before);
    assert!(!output.exists() || fs::read_dir(&output).unwrap().next().is_none());
}

/// 測試 5: 有垃圾檔的壓縮檔會被清理並以原本的相對路徑重新打包
#[test]
fn test_dirty_archive_is_cleaned_and_repacked() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("input");
    let output = temp.path().join("output");
    fs::create_dir_all(input.join("series")).unwrap();

    let archive = input.join("series/vol1.zip");
    write_zip(
        &archive,
        &[
            ("vol1/001.jpg", b"page1"),
            ("vol1/002.jpg", b"page2"),
            ("vol1/desktop.ini", b"junk"),
            ("vol1/.DS_Store", b"junk"),
        ],
    );
    let before = fs::read(&archive).unwrap();

    let results = scan(&input, FakeAnalyzer::default(), archive_options(output.clone()));

    let processed: usize = results.iter().map(|(_, r)| r.processed_archives).sum();
    assert_eq!(processed, 1);
    assert_eq!(fs::read(&archive).unwrap(), before, "原壓縮檔不可被修改");

    let cleaned = output.join("series/vol1.cbz");
    let names = zip_names(&cleaned);
    assert!(names.contains(&"vol1/001.jpg".to_string()));
    assert!(names.contains(&"vol1/002.jpg".to_string()));
    assert!(!names.iter().any(|n| n.contains("desktop.ini") || n.contains(".DS_Store")));

    let mut zip = ZipArchive::new(File::open(&cleaned).unwrap()).unwrap();
    let mut content = Vec::new();
    zip.by_name("vol1/002.jpg")
        .unwrap()
        .read_to_end(&mut content)
        .unwrap();
    assert_eq!(content, b"page2");
}

/// 測試 6: 預估暫存空間不足時直接放棄，不會解壓
#[test]
fn test_disk_space_guard_skips_extraction() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("input");
    let scratch = temp.path().join("scratch");
    fs::create_dir_all(&input).unwrap();
    fs::create_dir_all(&scratch).unwrap();

    let archive = input.join("big.cbz");
    write_zip(&archive, &[("001.jpg", b"page"), ("Thumbs.db", b"junk")]);

    let results: Vec<(PathBuf, ScanResult)> =
        Scanner::new(&input, rules(), Arc::new(FakeAnalyzer::default()))
            .with_options(archive_options(temp.path().join("output")))
            .with_space_probe(Arc::new(FixedSpace(1)))
            .with_temp_root(scratch.clone())
            .run()
            .collect();

    assert_eq!(results.len(), 1);
    let result = &results[0].1;
    assert_eq!(result.processed_archives, 0);
    assert_eq!(result.failed_archives.len(), 1);
    assert_eq!(result.failed_archives[0].0, archive);
    assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0, "不應建立暫存資料夾");
    assert!(!temp.path().join("output").exists());
}

/// 測試 7: 輸出資料夾位於輸入資料夾內時不會被再次掃描
#[test]
fn test_output_inside_input_is_pruned() {
    let temp = TempDir::new().unwrap();
    let input = temp.path();
    let output = input.join("cleaned");
    fs::create_dir_all(output.join("old")).unwrap();
    fs::write(output.join("old/1.jpg"), b"x").unwrap();
    fs::write(input.join("1.jpg"), b"x").unwrap();

    let results = scan(input, FakeAnalyzer::default(), archive_options(output.clone()));

    assert!(results.iter().all(|(dir, _)| !dir.starts_with(&output)));
    assert_eq!(results.len(), 1);
}
