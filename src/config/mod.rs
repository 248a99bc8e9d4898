pub mod load;
pub mod save;
pub mod types;

pub use load::load_embedded_extension_rules;
pub use save::{add_recent_path, save_settings, save_settings_to};
pub use types::{
    ArchiveSettings, Config, ConverterSettings, DEFAULT_COMIC_TITLE_PATTERN, DedupeSettings,
    ExtensionRules, MAX_RECENT_PATHS, OUTPUT_FORMATS, ScannerSettings, UserSettings,
    dotted_extension,
};
