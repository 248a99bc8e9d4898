//! 合集裝訂元件

mod main;

pub use main::{BindSummary, Binder};
