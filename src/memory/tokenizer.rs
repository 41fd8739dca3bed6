//! 分词：供 TF-IDF 证据检索使用
//!
//! 包含 CJK 字符时用 jieba-rs 搜索引擎模式分词；否则按 `\w\w+` 取词（与常见 TF-IDF 默认切词一致），统一小写。

use std::sync::OnceLock;

use jieba_rs::Jieba;
use regex::Regex;

/// 全局 Jieba 实例（延迟初始化）
static JIEBA: OnceLock<Jieba> = OnceLock::new();

static WORD: OnceLock<Regex> = OnceLock::new();

fn get_jieba() -> &'static Jieba {
    JIEBA.get_or_init(Jieba::new)
}

fn word_regex() -> &'static Regex {
    WORD.get_or_init(|| Regex::new(r"\w\w+").expect("static regex"))
}

/// 判断字符是否为 CJK（中日韩）字符
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |   // CJK Unified Ideographs
        '\u{3400}'..='\u{4DBF}' |   // CJK Unified Ideographs Extension A
        '\u{F900}'..='\u{FAFF}' |   // CJK Compatibility Ideographs
        '\u{3040}'..='\u{309F}' |   // Hiragana
        '\u{30A0}'..='\u{30FF}'     // Katakana
    )
}

pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// 分词（保留重复词，TF 计数需要）
pub fn tokenize(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    if contains_cjk(text) {
        get_jieba()
            .cut_for_search(text, true)
            .into_iter()
            .filter(|s| s.chars().any(char::is_alphanumeric))
            .filter(|s| s.chars().count() > 1 || s.chars().next().is_some_and(is_cjk))
            .map(|s| s.to_lowercase())
            .collect()
    } else {
        word_regex()
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }
}
