//! 漫畫名稱的模糊比對鍵
//!
//! 由 `artist`、`title`、`series` 三個具名群組組成，忽略展會、語言等裝飾。

use log::warn;
use regex::Regex;
use std::sync::LazyLock;

const KEY_SEPARATOR: &str = " - ";
const FALLBACK_PATTERN: &str = r"(?P<title>.*)";

static REGEX_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

pub struct TitleKeyExtractor {
    pattern: Regex,
}

impl TitleKeyExtractor {
    /// 規則無法編譯時退回以整個名稱作為 `title`
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let pattern = Regex::new(pattern).unwrap_or_else(|e| {
            warn!("名稱比對規則編譯失敗，改用完整名稱比對: {e}");
            Regex::new(FALLBACK_PATTERN).expect("Invalid regex")
        });
        Self { pattern }
    }

    #[must_use]
    pub fn key(&self, name: &str) -> String {
        let Some(captures) = self.pattern.captures(name) else {
            return normalize(name);
        };
        let group = |n: &str| captures.name(n).map_or("", |m| m.as_str());

        let artist = normalize(circle_name(group("artist")));
        let title = normalize(group("title"));
        let series = normalize(group("series").trim_end_matches([')', ' ']));

        let parts: Vec<String> = [artist, title, series]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            normalize(name)
        } else {
            parts.join(KEY_SEPARATOR)
        }
    }
}

/// `社團 (作者)` 只保留社團名稱
fn circle_name(artist: &str) -> &str {
    let artist = artist.trim_matches(['[', ']']);
    artist.split_once('(').map_or(artist, |(circle, _)| circle)
}

/// 全形空白轉半形、合併連續空白、去頭尾並轉小寫
fn normalize(text: &str) -> String {
    let text = text.replace('\u{3000}', " ");
    REGEX_WHITESPACE
        .replace_all(&text, " ")
        .trim()
        .to_lowercase()
}
