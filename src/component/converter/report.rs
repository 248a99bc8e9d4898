use super::conversion_result::{ConversionResult, Status};
use crate::error::Result;
use crate::tools::{format_size, timestamped_report_path, write_csv_with_bom};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::time::Duration;

const REPORT_PREFIX: &str = "convert_report";
const REPORT_HEADER: [&str; 6] = ["檔案名稱", "原始大小", "新大小", "比例%", "狀態", "錯誤訊息"];
/// 摘要中最多列出的失敗數
const MAX_LISTED_FAILURES: usize = 20;

/// 整批轉檔的彙總結果
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    /// 依完成順序排列
    pub results: Vec<ConversionResult>,
    pub elapsed: Duration,
    pub report_path: Option<PathBuf>,
}

impl ConversionReport {
    #[must_use]
    pub const fn new(results: Vec<ConversionResult>, elapsed: Duration) -> Self {
        Self {
            results,
            elapsed,
            report_path: None,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn failures(&self) -> Vec<&ConversionResult> {
        self.results.iter().filter(|r| r.is_failure()).collect()
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.total() - self.failures().len()
    }

    #[must_use]
    pub fn count(&self, status: Status) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// 成功項目（含複製）的原始與輸出大小總和
    #[must_use]
    pub fn size_totals(&self) -> (u64, u64) {
        self.results
            .iter()
            .filter(|r| !r.is_failure())
            .fold((0, 0), |(input, output), r| {
                (input + r.in_size, output + r.out_size)
            })
    }

    pub fn log_summary(&self) {
        let failures = self.failures();
        let (input, output) = self.size_totals();

        info!("========== 轉檔完成 ==========");
        info!("總計: {} 個檔案", self.total());
        info!(
            "成功: {} 個（其中變大 {} 個、直接複製 {} 個）",
            self.success_count(),
            self.count(Status::Bigger),
            self.count(Status::Copy)
        );
        info!("失敗: {} 個", failures.len());
        info!("耗時: {:.1} 秒", self.elapsed.as_secs_f64());
        info!("原始大小: {}", format_size(input));
        info!("新大小: {}", format_size(output));

        if input > 0 {
            let percent = (input.abs_diff(output) as f64) / input as f64 * 100.0;
            if output <= input {
                info!("節省: {} ({percent:.1}%)", format_size(input - output));
            } else {
                info!("增加: {} ({percent:.1}%)", format_size(output - input));
            }
        }

        if !failures.is_empty() {
            error!("失敗清單:");
            for result in failures.iter().take(MAX_LISTED_FAILURES) {
                error!("  {}: {}", result.file.display(), result.error);
            }
            if failures.len() > MAX_LISTED_FAILURES {
                error!("...以及其他 {} 個錯誤", failures.len() - MAX_LISTED_FAILURES);
            }
        }

        if let Some(path) = &self.report_path {
            info!("報告已儲存: {}", path.display());
        }
    }

    /// 沒有任何結果時不產生報告
    pub fn write_csv(&mut self, dir: &Path) -> Result<Option<PathBuf>> {
        if self.results.is_empty() {
            return Ok(None);
        }

        let path = timestamped_report_path(dir, REPORT_PREFIX);
        write_csv_with_bom(
            &path,
            &REPORT_HEADER,
            self.results.iter().map(ConversionResult::csv_row),
        )?;
        self.report_path = Some(path.clone());
        Ok(Some(path))
    }
}
