use crate::config::types::{
    Config, DEFAULT_OUTPUT_FORMAT, DEFAULT_QUALITY, ExtensionRules, OUTPUT_FORMATS, UserSettings,
};
use crate::tools::ResourceLocator;
use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::Path;

/// 編譯時嵌入的副檔名規則（不需要外部檔案）
const EXTENSION_RULES_JSON: &str = include_str!("../data/extension_rules.json");

pub const SETTINGS_FILE: &str = "settings.json";

impl Config {
    pub fn new(resources: ResourceLocator) -> Result<Self> {
        let settings = match Self::load_settings(Path::new(SETTINGS_FILE)) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("讀取設定失敗，使用預設值: {e:#}");
                UserSettings::default()
            }
        };
        Self::from_settings(settings, resources)
    }

    /// 以指定的使用者設定建立設定物件
    pub fn from_settings(settings: UserSettings, resources: ResourceLocator) -> Result<Self> {
        let settings = sanitize_settings(settings);
        let extension_rules = match &settings.extensions {
            Some(custom) => custom.clone().normalized(),
            None => load_embedded_extension_rules()?,
        };

        Ok(Self {
            extension_rules,
            settings,
            resources,
        })
    }

    fn load_settings(path: &Path) -> Result<UserSettings> {
        if !path.exists() {
            return Ok(UserSettings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

        info!("已載入設定檔: {}", path.display());
        Ok(settings)
    }
}

/// 從編譯時嵌入的 JSON 載入副檔名規則
pub fn load_embedded_extension_rules() -> Result<ExtensionRules> {
    let rules: ExtensionRules =
        serde_json::from_str(EXTENSION_RULES_JSON).context("無法解析嵌入的副檔名設定")?;
    Ok(rules.normalized())
}

fn sanitize_settings(mut settings: UserSettings) -> UserSettings {
    let converter = &mut settings.converter;

    let format = converter.format.trim().to_lowercase();
    if OUTPUT_FORMATS.contains(&format.as_str()) {
        converter.format = format;
    } else {
        warn!(
            "不支援的輸出格式 '{}'，改用 {DEFAULT_OUTPUT_FORMAT}",
            converter.format
        );
        converter.format = DEFAULT_OUTPUT_FORMAT.to_string();
    }

    if !(1..=100).contains(&converter.quality) {
        warn!("品質 {} 超出範圍，改用 {DEFAULT_QUALITY}", converter.quality);
        converter.quality = DEFAULT_QUALITY;
    }

    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_embedded_rules_parse() {
        let rules = load_embedded_extension_rules().unwrap();
        assert!(rules.convert.contains(".jpg"));
        assert!(rules.passthrough.contains(".avif"));
        assert!(rules.archive.contains(".cb7"));
        assert!(rules.system_junk.contains("__macosx"));
    }

    #[test]
    fn test_invalid_format_and_quality_fall_back() {
        let mut settings = UserSettings::default();
        settings.converter.format = "bmp".to_string();
        settings.converter.quality = 0;

        let config =
            Config::from_settings(settings, ResourceLocator::new(PathBuf::from("."))).unwrap();
        assert_eq!(config.settings.converter.format, DEFAULT_OUTPUT_FORMAT);
        assert_eq!(config.settings.converter.quality, DEFAULT_QUALITY);
    }

    #[test]
    fn test_custom_extensions_override_embedded() {
        let mut settings = UserSettings::default();
        let mut custom = load_embedded_extension_rules().unwrap();
        custom.convert.insert("QOI".to_string());
        settings.extensions = Some(custom);

        let config =
            Config::from_settings(settings, ResourceLocator::new(PathBuf::from("."))).unwrap();
        assert!(config.extension_rules.convert.contains(".qoi"));
    }

    #[test]
    fn test_partial_settings_json_uses_defaults() {
        let settings: UserSettings =
            serde_json::from_str(r#"{"converter": {"quality": 90}}"#).unwrap();
        assert_eq!(settings.converter.quality, 90);
        assert_eq!(settings.converter.format, DEFAULT_OUTPUT_FORMAT);
        assert!(!settings.scanner.qr_whitelist.is_empty());
    }
}
