use super::conversion_result::ConversionResult;
use crate::error::{KomaError, Result};
use crate::tools::ProgressSender;
use log::{error, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// 每個任務最多嘗試次數（含第一次）
pub const MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Convert,
    Copy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionTask {
    pub source: PathBuf,
    /// 輸出路徑，同一批任務中不會重複
    pub target: PathBuf,
    pub kind: TaskKind,
}

/// 固定大小的工作池，結果依完成順序回傳
pub struct TaskScheduler {
    pool: ThreadPool,
    workers: usize,
    retry_delay: Duration,
    shutdown_signal: Arc<AtomicBool>,
    progress: ProgressSender,
}

impl TaskScheduler {
    pub fn new(workers: usize, shutdown_signal: Arc<AtomicBool>) -> Result<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("koma-worker-{i}"))
            .build()
            .map_err(|e| KomaError::Io(io::Error::other(e)))?;

        Ok(Self {
            pool,
            workers,
            retry_delay: DEFAULT_RETRY_DELAY,
            shutdown_signal,
            progress: ProgressSender::disabled(),
        })
    }

    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// 執行所有任務；`attempt` 負責單次嘗試並填寫結果，回傳錯誤即重試
    pub fn run<F>(&self, tasks: &[ConversionTask], attempt: F) -> Vec<ConversionResult>
    where
        F: Fn(&ConversionTask, &mut ConversionResult) -> Result<()> + Sync,
    {
        let total = tasks.len();
        info!("開始處理任務，共 {total} 個（並行數: {}）", self.workers);

        let (sender, receiver) = mpsc::channel();
        let mut results = Vec::with_capacity(total);

        self.pool.in_place_scope(|scope| {
            for task in tasks {
                let sender = sender.clone();
                let attempt = &attempt;
                scope.spawn(move |_| {
                    let result = self.execute(task, attempt);
                    let _ = sender.send(result);
                });
            }
            drop(sender);

            for (index, result) in receiver.iter().enumerate() {
                let completed = index + 1;
                let name = result
                    .file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                self.progress.send(
                    completed,
                    total,
                    format!("處理中 ({completed}/{total}): {name}"),
                );
                results.push(result);
            }
        });

        results
    }

    fn execute<F>(&self, task: &ConversionTask, attempt: &F) -> ConversionResult
    where
        F: Fn(&ConversionTask, &mut ConversionResult) -> Result<()>,
    {
        let mut result = ConversionResult::new(task.source.clone());

        for n in 1..=MAX_ATTEMPTS {
            if self.shutdown_signal.load(Ordering::SeqCst) {
                result.fail(KomaError::Interrupted.to_string());
                return result;
            }

            result.error.clear();
            match attempt(task, &mut result) {
                Ok(()) => {
                    info!("{result}");
                    return result;
                }
                Err(e) => {
                    result.error = e.to_string();
                    if n < MAX_ATTEMPTS {
                        warn!(
                            "處理失敗，正在重試 ({n}/{MAX_ATTEMPTS}): {}: {e}",
                            task.source.display()
                        );
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        let message = std::mem::take(&mut result.error);
        result.fail(message);
        error!("{result}");
        error!("  └── {}", result.error.lines().next().unwrap_or_default());
        result
    }
}
