//! 圖片轉檔元件
//!
//! 以固定大小的工作池呼叫外部編碼器，無法轉檔的圖片直接複製，
//! 完成後輸出摘要與 CSV 報告。

mod conversion_result;
mod encoder_command;
mod main;
mod report;
mod task_scheduler;

pub use conversion_result::{ConversionResult, Status};
pub use encoder_command::{CodecFamily, Encoder, EncoderCommand, FfmpegEncoder};
pub use main::Converter;
pub use report::ConversionReport;
pub use task_scheduler::{ConversionTask, DEFAULT_RETRY_DELAY, MAX_ATTEMPTS, TaskKind, TaskScheduler};
