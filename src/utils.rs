use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::ProgressStyle;
use regex::Regex;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .expect("invalid progress bar template")
        .progress_chars("##-")
}

/// 读取整个图片文件
pub fn read_image_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).with_context(|| format!("无法读取文件: {}", path.display()))
}

/// 根据逗号分隔的后缀名列表构建匹配文件扩展名的正则
pub fn suffix_regex(suffix: &str) -> Result<Regex> {
    let alternatives = suffix
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    Ok(Regex::new(&format!("(?i)^({alternatives})$"))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_regex() {
        let re = suffix_regex("jpg, png,webp").unwrap();
        assert!(re.is_match("jpg"));
        assert!(re.is_match("PNG"));
        assert!(!re.is_match("jpeg"));
        assert!(!re.is_match("xpng"));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_image_file("/definitely/not/here.png").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.png"));
    }
}
