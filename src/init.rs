use env_logger::{Builder, Env};
use std::io::Write;

/// 初始化日誌，預設等級 info，可用 `RUST_LOG` 覆寫
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} | {:<5} | {}",
                chrono::Local::now().format("%m/%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .try_init();
}
