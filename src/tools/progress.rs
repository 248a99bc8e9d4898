//! 工作執行緒到單一消費者的進度事件通道

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::thread::{self, JoinHandle};

pub const DEFAULT_PROGRESS_CAPACITY: usize = 256;

/// `completed == total == 0` 代表無法預估進度的階段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub completed: usize,
    pub total: usize,
    pub message: String,
}

impl ProgressEvent {
    #[must_use]
    pub fn is_indeterminate(&self) -> bool {
        self.completed == 0 && self.total == 0
    }
}

/// 可複製到各工作執行緒的傳送端，通道滿時直接丟棄事件，不阻塞工作
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    sender: Option<SyncSender<ProgressEvent>>,
}

impl ProgressSender {
    /// 不回報進度
    #[must_use]
    pub const fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn send(&self, completed: usize, total: usize, message: impl Into<String>) {
        let Some(sender) = &self.sender else {
            return;
        };
        let event = ProgressEvent {
            completed,
            total,
            message: message.into(),
        };
        if let Err(TrySendError::Disconnected(_)) = sender.try_send(event) {
            log::trace!("進度接收端已關閉");
        }
    }
}

#[must_use]
pub fn progress_channel(capacity: usize) -> (ProgressSender, Receiver<ProgressEvent>) {
    let (sender, receiver) = sync_channel(capacity);
    (
        ProgressSender {
            sender: Some(sender),
        },
        receiver,
    )
}

/// 在背景執行緒把進度事件畫成進度條，所有傳送端釋放後結束
pub fn spawn_progress_bar(receiver: Receiver<ProgressEvent>) -> JoinHandle<()> {
    thread::spawn(move || {
        let progress_bar = ProgressBar::new(0);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );

        for event in receiver {
            if event.is_indeterminate() {
                progress_bar.tick();
            } else {
                progress_bar.set_length(event.total as u64);
                progress_bar.set_position(event.completed as u64);
            }
            progress_bar.set_message(event.message);
        }

        progress_bar.finish_with_message("完成");
    })
}
