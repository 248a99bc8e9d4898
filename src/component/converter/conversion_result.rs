use crate::tools::format_size;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Success,
    Error,
    /// 轉檔成功但輸出比輸入大，仍算成功
    Bigger,
    Copy,
}

impl Status {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::Bigger => "BIGGER",
            Self::Copy => "COPY",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 單一檔案的處理結果，`status == Error` 若且唯若 `error` 非空
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub file: PathBuf,
    pub in_size: u64,
    pub out_size: u64,
    pub status: Status,
    pub error: String,
}

impl ConversionResult {
    #[must_use]
    pub const fn new(file: PathBuf) -> Self {
        Self {
            file,
            in_size: 0,
            out_size: 0,
            status: Status::Pending,
            error: String::new(),
        }
    }

    /// 以失敗結束，錯誤訊息不可為空
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.error = if message.trim().is_empty() {
            "未知錯誤".to_string()
        } else {
            message
        };
        self.status = Status::Error;
    }

    /// 成功轉檔後依大小決定 `Success` 或 `Bigger`
    pub fn finish_converted(&mut self, out_size: u64) {
        self.out_size = out_size;
        self.error.clear();
        self.status = if out_size > self.in_size {
            Status::Bigger
        } else {
            Status::Success
        };
    }

    pub fn finish_copied(&mut self, out_size: u64) {
        self.out_size = out_size;
        self.error.clear();
        self.status = Status::Copy;
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == Status::Error
    }

    /// `(out - in) / in * 100`，任一大小為 0 時為 0
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.in_size == 0 || self.out_size == 0 {
            return 0.0;
        }
        let ratio = (self.out_size as f64 - self.in_size as f64) / self.in_size as f64 * 100.0;
        (ratio * 100.0).round() / 100.0
    }

    #[must_use]
    pub fn ratio_cell(&self) -> String {
        let ratio = self.ratio();
        if ratio == 0.0 {
            "-".to_string()
        } else {
            format!("{ratio:.2}%")
        }
    }

    #[must_use]
    pub fn csv_row(&self) -> [String; 6] {
        [
            self.file.display().to_string(),
            format_size(self.in_size),
            format_size(self.out_size),
            self.ratio_cell(),
            self.status.label().to_string(),
            self.error.clone(),
        ]
    }
}

impl fmt::Display for ConversionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parent = self
            .file
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = self
            .file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if self.status == Status::Error {
            write!(
                f,
                "{parent}/{name} | {:>10} | {:>10} | {:>10} | {}",
                format_size(self.in_size),
                "-",
                "-",
                self.status
            )
        } else {
            write!(
                f,
                "{parent}/{name} | {:>10} | {:>10} | {:>+9.1}% | {}",
                format_size(self.in_size),
                format_size(self.out_size),
                self.ratio(),
                self.status
            )
        }
    }
}
