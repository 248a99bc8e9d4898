use crate::component::archive::{ArchiveFormat, ArchiveHandler};
use crate::component::converter::{Converter, FfmpegEncoder, TaskScheduler};
use crate::component::deduplicator::{Deduplicator, DuplicateGroup};
use crate::component::renamer::{RenameOptions, Renamer};
use crate::component::scanner::{ArchiveCleanOptions, ScanOptions, ScanResult, Scanner};
use crate::component::Binder;
use crate::config::{Config, add_recent_path, save_settings};
use crate::pause;
use crate::tools::{
    DEFAULT_PROGRESS_CAPACITY, DefaultImageAnalyzer, ImageAnalyzer, PermanentDelete,
    ProgressSender, Recycler, SystemTrash, progress_channel, spawn_progress_bar,
    validate_directory_exists,
};
use anyhow::Result;
use chrono::{DateTime, Local};
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

const NEW_PATH_ITEM: &str = "輸入新路徑...";

pub fn run_scan_and_clean(term: &Term, config: &mut Config) -> Result<()> {
    report_error(scan_and_clean(term, config));
    pause(term)
}

pub fn run_converter(term: &Term, shutdown_signal: &Arc<AtomicBool>, config: &mut Config) -> Result<()> {
    report_error(convert(term, shutdown_signal, config));
    pause(term)
}

pub fn run_renamer(term: &Term, config: &mut Config) -> Result<()> {
    report_error(rename(term, config));
    pause(term)
}

pub fn run_deduplicator(term: &Term, config: &mut Config) -> Result<()> {
    report_error(find_duplicates(term, config));
    pause(term)
}

pub fn run_binder(term: &Term, config: &mut Config) -> Result<()> {
    report_error(bind(term, config));
    pause(term)
}

fn report_error(result: Result<()>) {
    if let Err(e) = result {
        error!("{e:#}");
        eprintln!("{} {e:#}", style("錯誤:").red().bold());
    }
}

fn scan_and_clean(term: &Term, config: &mut Config) -> Result<()> {
    println!("{}", style("=== 掃描與清理 ===").cyan().bold());

    let root = prompt_directory(term, config, "請選擇要掃描的資料夾")?;
    let clean_archives = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("是否一併清理壓縮檔？")
        .default(false)
        .interact_on(term)?;

    let rules = config.extension_rules.clone();
    let handler = ArchiveHandler::new(&rules, &config.resources);

    let archive = if clean_archives {
        let default_output = format!("{}_cleaned", root.display());
        let output: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("清理後的壓縮檔輸出資料夾")
            .default(default_output)
            .interact_text_on(term)?;
        Some(ArchiveCleanOptions {
            output_dir: PathBuf::from(output.trim()),
            repack: config.settings.archive.repack,
            format: usable_format(&handler, config.settings.archive.pack_format),
        })
    } else {
        None
    };

    let options = ScanOptions {
        enable_ad_scan: config.settings.scanner.enable_ad_scan,
        archive,
    };
    let analyzer = image_analyzer(config);

    println!("{}", style("掃描中...").dim());
    let results: Vec<(PathBuf, ScanResult)> = with_progress_bar(|progress| {
        Scanner::new(&root, rules, analyzer)
            .with_options(options)
            .with_archive_handler(handler)
            .with_progress(progress)
            .run()
            .collect()
    });

    print_scan_summary(&results);

    let removable: Vec<PathBuf> = results
        .iter()
        .flat_map(|(_, result)| result.removable().cloned())
        .collect();
    if removable.is_empty() {
        println!("{}", style("沒有需要刪除的檔案").green());
        return Ok(());
    }

    for path in &removable {
        println!("  {}", style(path.display()).dim());
    }
    let choices = ["移到資源回收筒", "永久刪除", "不處理"];
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("要如何處理以上 {} 個廣告與雜項檔案？", removable.len()))
        .items(&choices)
        .default(0)
        .interact_on_opt(term)?;

    let recycler: Box<dyn Recycler> = match selection {
        Some(0) => Box::new(SystemTrash),
        Some(1) => Box::new(PermanentDelete),
        _ => return Ok(()),
    };
    let (removed, failed) = recycle_all(recycler.as_ref(), removable.iter());
    println!("  已刪除: {}", style(removed).green());
    if failed > 0 {
        println!("  失敗: {}", style(failed).red());
    }
    Ok(())
}

/// 沒有 7-Zip 時 7z 系列無法打包，改用 cbz
fn usable_format(handler: &ArchiveHandler, wanted: ArchiveFormat) -> ArchiveFormat {
    if handler.has_native_tool() || wanted.is_zip_family() {
        return wanted;
    }
    warn!("未找到 7-Zip，無法輸出 .{wanted}，改用 .cbz");
    ArchiveFormat::Cbz
}

fn print_scan_summary(results: &[(PathBuf, ScanResult)]) {
    let sum = |f: fn(&ScanResult) -> usize| results.iter().map(|(_, r)| f(r)).sum::<usize>();

    println!();
    println!("{}", style("=== 掃描摘要 ===").cyan().bold());
    println!("  資料夾: {} 個", results.len());
    println!("  需轉檔圖片: {}", sum(|r| r.to_convert.len()));
    println!("  直接複製圖片: {}", sum(|r| r.to_copy.len()));
    println!("  廣告頁: {}", style(sum(|r| r.ads.len())).yellow());
    println!("  雜項檔案: {}", style(sum(|r| r.junk.len())).yellow());
    println!("  已清理壓縮檔: {}", style(sum(|r| r.processed_archives)).green());

    let failed: Vec<&(PathBuf, String)> = results
        .iter()
        .flat_map(|(_, r)| r.failed_archives.iter())
        .collect();
    if !failed.is_empty() {
        println!("  處理失敗的壓縮檔: {}", style(failed.len()).red());
        for (path, reason) in failed {
            println!("    {}: {}", path.display(), style(reason).red());
        }
    }
}

fn convert(term: &Term, shutdown_signal: &Arc<AtomicBool>, config: &mut Config) -> Result<()> {
    println!("{}", style("=== 圖片轉檔 ===").cyan().bold());

    let input = prompt_directory(term, config, "請選擇要轉檔的資料夾")?;
    let default_output = format!("{}_converted", input.display());
    let output: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("輸出資料夾")
        .default(default_output)
        .interact_text_on(term)?;
    let output = PathBuf::from(output.trim());

    let settings = &config.settings.converter;
    let encoder = FfmpegEncoder::locate(&config.resources, settings)?;
    let workers = settings.actual_workers();
    println!(
        "{}",
        style(format!(
            "格式: {}，品質: {}，並行數: {workers}",
            settings.format, settings.quality
        ))
        .dim()
    );

    let rules = config.extension_rules.clone();
    let analyzer = image_analyzer(config);
    let options = ScanOptions {
        enable_ad_scan: config.settings.scanner.enable_ad_scan,
        archive: None,
    };
    let scheduler = TaskScheduler::new(workers, Arc::clone(shutdown_signal))?;

    let mut report = with_progress_bar(|progress| {
        let scanner = Scanner::new(&input, rules, Arc::clone(&analyzer))
            .with_options(options)
            .with_progress(progress.clone());
        let converter = Converter::new(
            &input,
            &output,
            Arc::new(encoder),
            analyzer,
            scheduler.with_progress(progress),
        );
        converter.run(scanner.run())
    });

    if let Err(e) = report.write_csv(&output) {
        warn!("無法寫入轉檔報告: {e}");
    }
    report.log_summary();

    let failures = report.failures().len();
    println!();
    println!("{}", style("=== 轉檔摘要 ===").cyan().bold());
    println!("  總計: {} 個檔案", report.total());
    println!("  成功: {} 個", style(report.success_count()).green());
    if failures > 0 {
        println!("  失敗: {} 個", style(failures).red());
    }
    if let Some(path) = &report.report_path {
        println!("  報告: {}", path.display());
    }
    Ok(())
}

fn rename(term: &Term, config: &mut Config) -> Result<()> {
    println!("{}", style("=== 圖片重新編號 ===").cyan().bold());

    let dir = prompt_directory(term, config, "請選擇要重新命名的資料夾")?;
    let theme = ColorfulTheme::default();
    let export_csv = Confirm::with_theme(&theme)
        .with_prompt("是否輸出 CSV 對照表？")
        .default(true)
        .interact_on(term)?;
    let include_archives = Confirm::with_theme(&theme)
        .with_prompt("是否一併處理壓縮檔？")
        .default(false)
        .interact_on(term)?;

    let handler = ArchiveHandler::new(&config.extension_rules, &config.resources);
    let archive_format = if include_archives {
        // 沒有 7-Zip 時只能打包 zip 系列
        let formats: Vec<ArchiveFormat> = ArchiveFormat::ALL
            .into_iter()
            .filter(|f| handler.has_native_tool() || f.is_zip_family())
            .collect();
        let default = formats
            .iter()
            .position(|f| *f == config.settings.archive.pack_format)
            .unwrap_or(0);
        let selection = Select::with_theme(&theme)
            .with_prompt("重新打包格式")
            .items(&formats)
            .default(default)
            .interact_on(term)?;
        Some(formats[selection])
    } else {
        None
    };

    let mut warning = String::from("確定要執行重新命名嗎？此操作無法復原。");
    if include_archives {
        warning.push_str("（有變更的原壓縮檔會被移到資源回收筒）");
    }
    if !Confirm::with_theme(&theme)
        .with_prompt(warning)
        .default(false)
        .interact_on(term)?
    {
        return Ok(());
    }

    let renamer = Renamer::new(&dir, config.extension_rules.clone(), image_analyzer(config))
        .with_options(RenameOptions {
            export_csv,
            archive_format,
        })
        .with_archive_handler(handler);
    let summary = with_progress_bar(|progress| renamer.with_progress(progress).run())?;

    println!();
    println!("{}", style("=== 重新命名摘要 ===").cyan().bold());
    println!("  資料夾: {} 個", summary.directories);
    println!("  檔案: {} 個", style(summary.renamed_files).green());
    if include_archives {
        println!("  重新打包: {} 個", style(summary.archives_repacked).green());
        if summary.archives_failed > 0 {
            println!("  失敗: {} 個", style(summary.archives_failed).red());
        }
    }
    if let Some(path) = &summary.report_path {
        println!("  對照表: {}", path.display());
    }
    Ok(())
}

fn find_duplicates(term: &Term, config: &mut Config) -> Result<()> {
    println!("{}", style("=== 重複漫畫檢查 ===").cyan().bold());

    let mut roots = vec![prompt_directory(term, config, "請選擇要檢查的資料夾")?];
    roots.extend(prompt_path_list(term, "其他要一併比對的資料夾（留空結束）")?);

    let deduplicator = Deduplicator::new(
        config.extension_rules.clone(),
        &config.settings.dedupe.comic_title_pattern,
    );
    let groups = with_progress_bar(|progress| deduplicator.with_progress(progress).run(&roots));

    if groups.is_empty() {
        println!("{}", style("沒有找到重複項目").green());
        return Ok(());
    }

    for group in &groups {
        print_group(group);
    }

    let older: Vec<&PathBuf> = groups
        .iter()
        .flat_map(|g| g.older().iter().map(|item| &item.path))
        .collect();
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "共 {} 組重複，是否將較舊的 {} 個項目移到資源回收筒？",
            groups.len(),
            older.len()
        ))
        .default(false)
        .interact_on(term)?;

    if confirmed {
        let (removed, failed) = recycle_all(&SystemTrash, older.into_iter());
        println!("  已移到資源回收筒: {}", style(removed).green());
        if failed > 0 {
            println!("  失敗: {}", style(failed).red());
        }
    }
    Ok(())
}

fn print_group(group: &DuplicateGroup) {
    println!();
    println!("{}", style(&group.key).cyan().bold());
    for (index, item) in group.items.iter().enumerate() {
        let modified = std::fs::metadata(&item.path)
            .and_then(|m| m.modified())
            .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| "-".to_string());
        let tag = if index == 0 {
            style("保留").green()
        } else {
            style("較舊").yellow()
        };
        let kind = if item.is_archive { "檔案" } else { "資料夾" };
        println!("  [{tag}] {modified} {kind} {}", item.path.display());
    }
}

fn bind(term: &Term, config: &mut Config) -> Result<()> {
    println!("{}", style("=== 合集裝訂 ===").cyan().bold());
    println!(
        "{}",
        style("依序輸入圖片、壓縮檔或資料夾路徑，輸出順序與輸入順序相同").dim()
    );

    let entries = prompt_path_list(term, "加入路徑（留空結束）")?;
    if entries.is_empty() {
        println!("{}", style("沒有輸入任何路徑").yellow());
        return Ok(());
    }

    let output: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("輸出資料夾")
        .interact_text_on(term)?;
    let output = PathBuf::from(output.trim());

    let binder = Binder::new(
        config.extension_rules.clone(),
        ArchiveHandler::new(&config.extension_rules, &config.resources),
    );
    let summary =
        with_progress_bar(|progress| binder.with_progress(progress).bind(&entries, &output))?;

    println!();
    println!("{}", style("=== 裝訂摘要 ===").cyan().bold());
    println!("  收集: {} 張", summary.collected);
    println!("  輸出: {} 張", style(summary.copied).green());
    if summary.failed > 0 {
        println!("  失敗: {} 張", style(summary.failed).red());
    }
    Ok(())
}

fn image_analyzer(config: &Config) -> Arc<dyn ImageAnalyzer> {
    Arc::new(DefaultImageAnalyzer::new(
        &config.settings.scanner.qr_whitelist,
    ))
}

/// 從最近使用的路徑中選擇，或輸入新路徑；選定後記錄到設定檔
fn prompt_directory(term: &Term, config: &mut Config, prompt: &str) -> Result<PathBuf> {
    let recent = config.settings.recent_paths.clone();

    let path = if recent.is_empty() {
        prompt_text(term, prompt)?
    } else {
        let mut items = recent.clone();
        items.push(NEW_PATH_ITEM.to_string());
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(&items)
            .default(0)
            .interact_on(term)?;
        match recent.get(selection) {
            Some(path) => path.clone(),
            None => prompt_text(term, prompt)?,
        }
    };

    let dir = PathBuf::from(&path);
    validate_directory_exists(&dir)?;

    add_recent_path(&mut config.settings, &path);
    if let Err(e) = save_settings(&config.settings) {
        warn!("無法儲存最近使用的路徑: {e:#}");
    }
    Ok(dir)
}

fn prompt_text(term: &Term, prompt: &str) -> Result<String> {
    let text: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text_on(term)?;
    Ok(text.trim().to_string())
}

/// 逐行輸入路徑直到空白行
fn prompt_path_list(term: &Term, prompt: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    loop {
        let text: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text_on(term)?;
        let text = text.trim().trim_matches('"');
        if text.is_empty() {
            break;
        }
        let path = PathBuf::from(text);
        if path.exists() {
            paths.push(path);
        } else {
            println!("{}", style(format!("路徑不存在: {text}")).yellow());
        }
    }
    Ok(paths)
}

/// 在背景畫進度條，所有傳送端釋放後等待進度條結束
fn with_progress_bar<T>(work: impl FnOnce(ProgressSender) -> T) -> T {
    let (sender, receiver) = progress_channel(DEFAULT_PROGRESS_CAPACITY);
    let handle = spawn_progress_bar(receiver);
    let output = work(sender);
    if handle.join().is_err() {
        warn!("進度條執行緒異常結束");
    }
    output
}

fn recycle_all<'a>(
    recycler: &dyn Recycler,
    paths: impl Iterator<Item = &'a PathBuf>,
) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;
    for path in paths {
        match recycler.recycle(path) {
            Ok(()) => {
                info!("已刪除: {}", path.display());
                removed += 1;
            }
            Err(e) => {
                error!("刪除失敗 {}: {e}", path.display());
                failed += 1;
            }
        }
    }
    (removed, failed)
}
