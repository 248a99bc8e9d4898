use crate::config::Config;
use crate::menu::handlers::{
    run_binder, run_converter, run_deduplicator, run_renamer, run_scan_and_clean,
};
use anyhow::Result;
use console::{Term, style};
use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// 顯示主選單並執行選擇的功能，回傳 `false` 代表結束程式
pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style("=== Koma 漫畫整理工具 ===").cyan().bold());
    println!("{}", style("按 ESC 離開").dim());

    let options = vec![
        "掃描與清理（廣告頁、雜項檔案、壓縮檔）",
        "圖片轉檔",
        "圖片重新編號",
        "重複漫畫檢查",
        "合集裝訂",
        "離開",
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("請選擇功能")
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => run_scan_and_clean(term, config)?,
        Some(1) => run_converter(term, shutdown_signal, config)?,
        Some(2) => run_renamer(term, config)?,
        Some(3) => run_deduplicator(term, config)?,
        Some(4) => run_binder(term, config)?,
        Some(5) | None => return Ok(false),
        _ => unreachable!(),
    }
    Ok(true)
}
