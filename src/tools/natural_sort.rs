//! 自然排序：`2.png` 排在 `10.jpg` 前面

use std::cmp::Ordering;
use std::path::Path;

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Number(&'a str),
    Text(String),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;

    for (i, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        match in_digits {
            Some(current) if current != is_digit => {
                result.push(make_chunk(&s[start..i], current));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }
    if let Some(current) = in_digits {
        result.push(make_chunk(&s[start..], current));
    }
    result
}

fn make_chunk(part: &str, is_digit: bool) -> Chunk<'_> {
    if is_digit {
        Chunk::Number(part)
    } else {
        Chunk::Text(part.to_lowercase())
    }
}

/// 比較兩個數字字串（不轉成整數，避免溢位）
fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}

/// 不分大小寫的自然排序，完全相同時再以原字串比較以保證排序穩定
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ordering = match (l, r) {
            (Chunk::Number(x), Chunk::Number(y)) => compare_numbers(x, y),
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
            (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

/// 逐層比較路徑元件
#[must_use]
pub fn natural_cmp_path(a: &Path, b: &Path) -> Ordering {
    let mut left = a.components();
    let mut right = b.components();
    loop {
        match (left.next(), right.next()) {
            (Some(l), Some(r)) => {
                let ordering = natural_cmp(
                    &l.as_os_str().to_string_lossy(),
                    &r.as_os_str().to_string_lossy(),
                );
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

pub fn sort_paths_naturally<P: AsRef<Path>>(paths: &mut [P]) {
    paths.sort_by(|a, b| natural_cmp_path(a.as_ref(), b.as_ref()));
}
