use super::format::{ArchiveFormat, CompressionLevel};
use crate::config::ExtensionRules;
use crate::error::{KomaError, Result};
use crate::tools::{ResourceLocator, natural_cmp_path, resolve_path};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const SEVEN_ZIP: &str = "7z";

#[derive(Debug, Clone)]
enum Backend {
    /// 外部 7-Zip，支援所有格式且可多執行緒
    Native(PathBuf),
    /// 只支援 zip/cbz
    Library,
}

/// 壓縮檔解壓與打包
///
/// 後端在建立時決定一次：找得到 7-Zip 就用 7-Zip，否則退回 `zip` crate。
#[derive(Debug, Clone)]
pub struct ArchiveHandler {
    backend: Backend,
    junk_names: BTreeSet<String>,
}

impl ArchiveHandler {
    #[must_use]
    pub fn new(rules: &ExtensionRules, locator: &ResourceLocator) -> Self {
        match locator.find_tool(SEVEN_ZIP) {
            Some(tool) => {
                info!("使用 7-Zip: {}", tool.display());
                Self::with_native_tool(rules, tool)
            }
            None => {
                warn!("未找到 7-Zip，改用內建 zip 函式庫（僅支援 zip/cbz，且打包較慢）");
                Self::library_only(rules)
            }
        }
    }

    #[must_use]
    pub fn with_native_tool(rules: &ExtensionRules, tool: PathBuf) -> Self {
        Self {
            backend: Backend::Native(tool),
            junk_names: rules.system_junk.clone(),
        }
    }

    #[must_use]
    pub fn library_only(rules: &ExtensionRules) -> Self {
        Self {
            backend: Backend::Library,
            junk_names: rules.system_junk.clone(),
        }
    }

    #[must_use]
    pub const fn has_native_tool(&self) -> bool {
        matches!(self.backend, Backend::Native(_))
    }

    fn is_junk(&self, name: &str) -> bool {
        self.junk_names.contains(&name.to_lowercase())
    }

    /// 解壓到 `<output_root>/<壓縮檔主檔名>`，回傳內容根目錄
    ///
    /// 若解壓結果（排除系統垃圾檔後）只有單一資料夾，回傳該資料夾。
    pub fn extract(&self, archive: &Path, output_root: &Path) -> Result<PathBuf> {
        if !archive.is_file() {
            return Err(KomaError::SourceMissing(archive.to_path_buf()));
        }

        let stem = archive
            .file_stem()
            .ok_or_else(|| KomaError::InvalidPath(archive.to_path_buf(), "缺少檔名".into()))?;
        let container = output_root.join(stem);
        fs::create_dir_all(&container)?;

        match &self.backend {
            Backend::Native(tool) => {
                let mut command = Command::new(tool);
                command.args(extract_args(archive, &container));
                run_tool(command, archive)?;
            }
            Backend::Library => {
                let is_zip = ArchiveFormat::from_path(archive).is_some_and(ArchiveFormat::is_zip_family);
                if !is_zip {
                    return Err(KomaError::ToolUnavailable(format!(
                        "{SEVEN_ZIP}（無法解壓 {}）",
                        archive.display()
                    )));
                }
                let mut zip = ZipArchive::new(BufReader::new(File::open(archive)?))?;
                zip.extract(&container)?;
            }
        }

        debug!("已解壓 {} -> {}", archive.display(), container.display());
        self.smart_unwrap(&container)
    }

    fn smart_unwrap(&self, container: &Path) -> Result<PathBuf> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(container)? {
            let entry = entry?;
            if !self.is_junk(&entry.file_name().to_string_lossy()) {
                entries.push(entry.path());
            }
        }

        match entries.as_slice() {
            [only] if only.is_dir() => Ok(only.clone()),
            _ => Ok(container.to_path_buf()),
        }
    }

    /// 將資料夾內容打包，系統垃圾檔（檔案或資料夾）不會被收進壓縮檔
    ///
    /// 先寫入同目錄的暫存檔，完成後才取代 `output`。
    pub fn pack(
        &self,
        source: &Path,
        output: &Path,
        format: ArchiveFormat,
        level: CompressionLevel,
    ) -> Result<()> {
        if !source.is_dir() {
            return Err(KomaError::SourceMissing(source.to_path_buf()));
        }
        let output = resolve_path(output);
        let parent = output
            .parent()
            .ok_or_else(|| KomaError::InvalidPath(output.clone(), "缺少上層資料夾".into()))?;
        fs::create_dir_all(parent)?;

        let partial = partial_path(&output, format);
        if partial.exists() {
            fs::remove_file(&partial)?;
        }

        let result = match &self.backend {
            Backend::Native(tool) => {
                let mut command = Command::new(tool);
                command
                    .current_dir(source)
                    .args(pack_args(&partial, format, level, &self.junk_names));
                run_tool(command, &output)
            }
            Backend::Library if format.is_zip_family() => {
                self.pack_with_library(source, &partial, level)
            }
            Backend::Library => Err(KomaError::ToolUnavailable(format!(
                "{SEVEN_ZIP}（無法建立 .{format}）"
            ))),
        };

        if let Err(e) = result {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        fs::rename(&partial, &output)?;
        info!("已打包: {}", output.display());
        Ok(())
    }

    fn pack_with_library(&self, source: &Path, output: &Path, level: CompressionLevel) -> Result<()> {
        let options = SimpleFileOptions::default()
            .compression_method(level.zip_method())
            .unix_permissions(0o644);
        let mut zip = ZipWriter::new(BufWriter::new(File::create(output)?));

        let walker = WalkDir::new(source)
            .min_depth(1)
            .sort_by(|a, b| natural_cmp_path(Path::new(a.file_name()), Path::new(b.file_name())))
            .into_iter()
            .filter_entry(|e| !self.is_junk(&e.file_name().to_string_lossy()));

        for entry in walker {
            let entry = entry.map_err(io::Error::other)?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| KomaError::InvalidPath(entry.path().to_path_buf(), e.to_string()))?;
            let name = zip_entry_name(relative);

            if entry.file_type().is_dir() {
                zip.add_directory(name, options)?;
            } else if entry.file_type().is_file() {
                zip.start_file(name, options)?;
                let mut reader = BufReader::new(File::open(entry.path())?);
                io::copy(&mut reader, &mut zip)?;
            }
        }

        zip.finish()?;
        Ok(())
    }
}

/// zip 內的路徑一律使用 `/`
fn zip_entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn partial_path(output: &Path, format: ArchiveFormat) -> PathBuf {
    let stem = output
        .file_stem()
        .map_or_else(|| "archive".into(), |s| s.to_string_lossy());
    output.with_file_name(format!(".{stem}.partial.{}", format.extension()))
}

fn extract_args(archive: &Path, container: &Path) -> Vec<OsString> {
    let mut target = OsString::from("-o");
    target.push(container);
    vec![
        "x".into(),
        archive.as_os_str().to_owned(),
        target,
        "-y".into(),
        "-aoa".into(),
    ]
}

fn pack_args(
    output: &Path,
    format: ArchiveFormat,
    level: CompressionLevel,
    junk_names: &BTreeSet<String>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "a".into(),
        output.as_os_str().to_owned(),
        ".".into(),
        format!("-t{}", format.container_type()).into(),
        format!("-mx={}", level.seven_zip_level()).into(),
        "-mmt=on".into(),
        "-bsp0".into(),
        "-bso0".into(),
    ];
    args.extend(junk_names.iter().map(|name| OsString::from(format!("-xr!{name}"))));
    args
}

fn run_tool(mut command: Command, target: &Path) -> Result<()> {
    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()?;

    if output.status.success() {
        return Ok(());
    }

    let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if message.to_lowercase().contains("not enough space") {
        return Err(KomaError::DiskFull(target.to_path_buf()));
    }
    Err(KomaError::ToolFailed {
        tool: SEVEN_ZIP.to_string(),
        message,
    })
}
