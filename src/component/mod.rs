//! 功能元件模組
//!
//! 每個子模組實現一個獨立的處理引擎，互相之間只透過公開型別溝通

pub mod archive;
pub mod binder;
pub mod converter;
pub mod deduplicator;
pub mod renamer;
pub mod scanner;

pub use archive::ArchiveHandler;
pub use binder::Binder;
pub use converter::Converter;
pub use deduplicator::Deduplicator;
pub use renamer::Renamer;
pub use scanner::Scanner;
