mod csv_report;
mod disk_space;
mod file_tools;
mod image_analyzer;
mod natural_sort;
mod path_validator;
mod progress;
mod recycler;
mod resource_locator;

pub use csv_report::{format_size, timestamped_report_path, write_csv_with_bom};
pub use disk_space::{SpaceProbe, SystemSpaceProbe, estimate_extract_space};
pub use file_tools::{copy_preserving_times, file_size, move_file, move_merge_dir};
pub use image_analyzer::{DefaultImageAnalyzer, ImageAnalyzer, ImageInfo};
pub use natural_sort::{natural_cmp, natural_cmp_path, sort_paths_naturally};
pub use path_validator::{is_hidden_name, is_within, resolve_path, validate_directory_exists};
pub use progress::{
    DEFAULT_PROGRESS_CAPACITY, ProgressEvent, ProgressSender, progress_channel, spawn_progress_bar,
};
pub use recycler::{PermanentDelete, Recycler, SystemTrash};
pub use resource_locator::ResourceLocator;
