use crate::config::ConverterSettings;
use crate::error::{KomaError, Result};
use crate::tools::{ImageInfo, ResourceLocator};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const FFMPEG: &str = "ffmpeg";
const SVT_PARAMS: &str = "tune=0:lp=2";

/// 支援的編碼器家族；同一種容器（avif）可能對應不同編碼器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecFamily {
    AvifSvt,
    AvifAom,
    Webp,
    Jxl,
}

impl CodecFamily {
    /// 由設定中的格式名稱解析，例如 `avif (aom)`；無法辨識時使用 SVT-AV1
    #[must_use]
    pub fn from_format_name(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.split_whitespace().next().unwrap_or_default() {
            "webp" => Self::Webp,
            "jxl" => Self::Jxl,
            _ if name.contains("aom") => Self::AvifAom,
            _ => Self::AvifSvt,
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::AvifSvt | Self::AvifAom => ".avif",
            Self::Webp => ".webp",
            Self::Jxl => ".jxl",
        }
    }

    /// 品質 1-100 轉成各編碼器的參數；`lossless` 或品質 100 時切換為無損
    #[must_use]
    pub fn encoding_args(self, quality: u8, lossless: bool, info: ImageInfo) -> Vec<String> {
        let quality = i32::from(quality.min(100));
        let lossless = lossless || quality >= 100;
        let pix_fmt = if info.is_grayscale { "gray10le" } else { "yuv420p10le" };

        match self {
            Self::AvifSvt => {
                let (crf, preset, params) = if lossless {
                    (0, 8, format!("{SVT_PARAMS}:lossless=1"))
                } else {
                    let crf = (f64::from(100 - quality) * 0.76 + 16.0) as i32;
                    (crf.clamp(0, 63), 6, SVT_PARAMS.to_string())
                };
                vec![
                    "-c:v".into(),
                    "libsvtav1".into(),
                    "-preset".into(),
                    preset.to_string(),
                    "-crf".into(),
                    crf.to_string(),
                    "-pix_fmt".into(),
                    pix_fmt.into(),
                    "-svtav1-params".into(),
                    params,
                ]
            }
            Self::AvifAom => {
                let crf = if lossless {
                    0
                } else {
                    ((f64::from(100 - quality) * 0.6 + 8.0) as i32).clamp(0, 63)
                };
                vec![
                    "-c:v".into(),
                    "libaom-av1".into(),
                    "-cpu-used".into(),
                    "6".into(),
                    "-crf".into(),
                    crf.to_string(),
                    "-pix_fmt".into(),
                    pix_fmt.into(),
                    "-b:v".into(),
                    "0".into(),
                ]
            }
            Self::Webp => {
                let encoder = if info.is_animated { "libwebp_anim" } else { "libwebp" };
                let mut args: Vec<String> = vec!["-c:v".into(), encoder.into()];
                if lossless {
                    args.extend(["-lossless".into(), "1".into()]);
                } else {
                    args.extend([
                        "-q:v".into(),
                        quality.to_string(),
                        "-preset".into(),
                        "default".into(),
                    ]);
                }
                args
            }
            Self::Jxl => {
                let distance = if lossless {
                    0.0
                } else {
                    f64::from(100 - quality) / 10.0
                };
                let mut args: Vec<String> = vec![
                    "-c:v".into(),
                    "libjxl".into(),
                    "-effort".into(),
                    "7".into(),
                    "-distance".into(),
                    format!("{distance:.1}"),
                ];
                if info.is_grayscale {
                    args.extend(["-pix_fmt".into(), "gray10le".into()]);
                }
                args
            }
        }
    }
}

/// 由設定產生 ffmpeg 參數的純函式層
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCommand {
    family: CodecFamily,
    quality: u8,
    lossless: bool,
    /// 自訂參數與副檔名，設定後取代編碼器表
    custom: Option<(Vec<String>, String)>,
}

impl EncoderCommand {
    #[must_use]
    pub fn from_settings(settings: &ConverterSettings) -> Self {
        let custom_ext = settings.custom_ext.trim();
        let custom = (!custom_ext.is_empty()).then(|| {
            let ext = if custom_ext.starts_with('.') {
                custom_ext.to_string()
            } else {
                format!(".{custom_ext}")
            };
            let params = settings
                .custom_params
                .split_whitespace()
                .map(ToString::to_string)
                .collect();
            (params, ext)
        });

        Self {
            family: CodecFamily::from_format_name(&settings.format),
            quality: settings.quality,
            lossless: settings.lossless,
            custom,
        }
    }

    /// 含前導點的輸出副檔名
    #[must_use]
    pub fn extension(&self) -> &str {
        self.custom
            .as_ref()
            .map_or(self.family.extension(), |(_, ext)| ext.as_str())
    }

    #[must_use]
    pub fn args(&self, source: &Path, destination: &Path, info: ImageInfo) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-y", "-an", "-sn", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(source.as_os_str().to_owned());

        let encoding = match &self.custom {
            Some((params, _)) => params.clone(),
            None => self
                .family
                .encoding_args(self.quality, self.lossless, info),
        };
        args.extend(encoding.into_iter().map(OsString::from));

        if !info.is_animated {
            args.extend(["-frames:v", "1"].iter().map(OsString::from));
        }

        args.push(destination.as_os_str().to_owned());
        args
    }

    #[must_use]
    pub fn build_command(
        &self,
        binary: &Path,
        source: &Path,
        destination: &Path,
        info: ImageInfo,
    ) -> Command {
        let mut cmd = Command::new(binary);
        cmd.args(self.args(source, destination, info));
        cmd
    }
}

/// 單張圖片的編碼器
pub trait Encoder: Send + Sync {
    /// 含前導點的輸出副檔名
    fn extension(&self) -> &str;

    fn encode(&self, source: &Path, destination: &Path, info: ImageInfo) -> Result<()>;
}

pub struct FfmpegEncoder {
    binary: PathBuf,
    command: EncoderCommand,
}

impl FfmpegEncoder {
    #[must_use]
    pub const fn new(binary: PathBuf, command: EncoderCommand) -> Self {
        Self { binary, command }
    }

    pub fn locate(locator: &ResourceLocator, settings: &ConverterSettings) -> Result<Self> {
        let binary = locator
            .find_tool(FFMPEG)
            .ok_or_else(|| KomaError::ToolUnavailable(FFMPEG.to_string()))?;
        Ok(Self::new(binary, EncoderCommand::from_settings(settings)))
    }
}

impl Encoder for FfmpegEncoder {
    fn extension(&self) -> &str {
        self.command.extension()
    }

    fn encode(&self, source: &Path, destination: &Path, info: ImageInfo) -> Result<()> {
        let output = self
            .command
            .build_command(&self.binary, source, destination, info)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("未知錯誤")
                .trim()
                .to_string();
            return Err(KomaError::ToolFailed {
                tool: FFMPEG.to_string(),
                message,
            });
        }

        if !destination.exists() {
            return Err(KomaError::OutputMissing(destination.to_path_buf()));
        }
        Ok(())
    }
}
