//! 有依据的修正：只用上下文中逐字出现过的值改写失败任务
//!
//! 1. failing_literals：从错误文本找出失败的字面量（引号内且在任务中出现的值；否则取错误关键词在任务中对应的参数值）；
//! 2. find_replacement：在来源文本中查找「字面量 + 替换关系标记 + 新值」的句子；
//! 3. substitute：整词、区分大小写地替换。
//!
//! 找不到显式替换关系就返回 None，绝不猜测。

use std::sync::OnceLock;

use regex::Regex;

/// 「旧值 标记 新值」
const FORWARD_MARKERS: &[&str] = &[
    "renamed to",
    "renamed as",
    "changed to",
    "moved to",
    "replaced by",
    "replaced with",
    "now called",
    "now named",
    "did you mean",
    "->",
    "=>",
];

/// 只在新值带引号时才算替换关系（「emp 目前为空」之类的状态描述不算）
const QUOTED_ONLY_MARKERS: &[&str] = &["is now"];

/// 「新值 标记 旧值」
const BACKWARD_MARKERS: &[&str] = &["instead of"];

const ARTICLES: &[&str] = &["the", "a", "an"];

/// 不作为参数名的错误词
const ERROR_STOPWORDS: &[&str] = &[
    "error", "not", "found", "missing", "invalid", "unknown", "does", "exist", "exists", "failed",
    "failure", "cannot", "could", "unable", "the", "with", "from", "for", "and", "that", "this",
    "was", "were", "has", "have", "been", "already", "denied", "permission", "access", "such",
    "into", "there", "are", "you",
];

/// 参数名与值之间的填充词
const VALUE_FILLERS: &[&str] = &["named", "called", "the", "id", "name"];

/// 一次有依据的修正
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub original: String,
    pub replacement: String,
    /// 给出替换关系的原句
    pub source: String,
}

fn quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"'([^'\n]+)'|"([^"\n]+)"|`([^`\n]+)`"#).expect("static regex"))
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z]{3,}").expect("static regex"))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_value_char(c: char) -> bool {
    is_word_char(c) || matches!(c, '.' | '-' | '/' | ':')
}

/// literal 在 text 中所有整词出现的字节区间
fn whole_word_matches(text: &str, literal: &str) -> Vec<(usize, usize)> {
    if literal.is_empty() {
        return Vec::new();
    }
    text.match_indices(literal)
        .filter(|(start, _)| {
            let end = start + literal.len();
            let before_ok = text[..*start].chars().next_back().map_or(true, |c| !is_word_char(c));
            let after_ok = text[end..].chars().next().map_or(true, |c| !is_word_char(c));
            before_ok && after_ok
        })
        .map(|(start, _)| (start, start + literal.len()))
        .collect()
}

pub fn contains_whole_word(text: &str, literal: &str) -> bool {
    !whole_word_matches(text, literal).is_empty()
}

/// 整词、区分大小写地把 literal 替换为 replacement
pub fn substitute(task: &str, literal: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(task.len());
    let mut last = 0;
    for (start, end) in whole_word_matches(task, literal) {
        out.push_str(&task[last..start]);
        out.push_str(replacement);
        last = end;
    }
    out.push_str(&task[last..]);
    out
}

fn quoted_literals(text: &str) -> Vec<String> {
    quoted_regex()
        .captures_iter(text)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn trim_value(value: &str) -> &str {
    value.trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '?' | '!'))
}

/// 任务中参数名 keyword 之后的值：JSON 形式 `"bucket_name": "B"` 或文本形式 `bucket B`
fn value_after_keyword(task: &str, keyword: &str) -> Option<String> {
    let key = regex::escape(keyword);
    let json = Regex::new(&format!(r#"(?i)"\w*{key}\w*"\s*:\s*"([^"]+)""#)).ok()?;
    if let Some(c) = json.captures(task) {
        return c.get(1).map(|m| m.as_str().to_string());
    }

    let lower = task.to_ascii_lowercase();
    for (_, end) in whole_word_matches(&lower, keyword) {
        let rest = &task[end..];
        if let Some(value) = first_value(rest, VALUE_FILLERS) {
            return Some(value);
        }
    }
    None
}

/// 失败字面量，按优先级排序且去重
pub fn failing_literals(error_detail: &str, failed_task: &str) -> Vec<String> {
    let mut literals: Vec<String> = quoted_literals(error_detail)
        .into_iter()
        .filter(|lit| contains_whole_word(failed_task, lit))
        .collect();

    if literals.is_empty() {
        for m in word_regex().find_iter(error_detail) {
            let keyword = m.as_str().to_ascii_lowercase();
            if ERROR_STOPWORDS.contains(&keyword.as_str()) {
                continue;
            }
            if let Some(value) = value_after_keyword(failed_task, &keyword) {
                literals.push(value);
            }
        }
    }

    let mut seen = Vec::new();
    literals.retain(|lit| {
        if seen.contains(lit) {
            false
        } else {
            seen.push(lit.clone());
            true
        }
    });
    literals
}

/// text 开头的第一个值（引号内文本或一个 token），跳过 skip 中的词
fn first_value(text: &str, skip: &[&str]) -> Option<String> {
    let mut rest = text.trim_start();
    loop {
        let first = rest.chars().next()?;
        if matches!(first, '\'' | '"' | '`') {
            let inner = &rest[first.len_utf8()..];
            let end = inner.find(first)?;
            let value = inner[..end].trim();
            return (!value.is_empty()).then(|| value.to_string());
        }
        let end = rest
            .char_indices()
            .find(|(_, c)| !is_value_char(*c))
            .map_or(rest.len(), |(i, _)| i);
        let token = trim_value(&rest[..end]);
        if token.is_empty() {
            return None;
        }
        if skip.iter().any(|s| s.eq_ignore_ascii_case(token)) {
            rest = rest[end..].trim_start();
            continue;
        }
        return Some(token.to_string());
    }
}

/// text 末尾的最后一个值
fn last_value(text: &str) -> Option<String> {
    let trimmed = text.trim_end();
    let last = trimmed.chars().next_back()?;
    if matches!(last, '\'' | '"' | '`') {
        let inner = &trimmed[..trimmed.len() - last.len_utf8()];
        let start = inner.rfind(last)?;
        let value = inner[start + last.len_utf8()..].trim();
        return (!value.is_empty()).then(|| value.to_string());
    }
    let start = trimmed
        .char_indices()
        .rev()
        .find(|(_, c)| !is_value_char(*c))
        .map_or(0, |(i, c)| i + c.len_utf8());
    let token = trim_value(&trimmed[start..]);
    (!token.is_empty()).then(|| token.to_string())
}

fn starts_with_quote(text: &str) -> bool {
    matches!(text.trim_start().chars().next(), Some('\'' | '"' | '`'))
}

fn sentences(source: &str) -> impl Iterator<Item = &str> {
    source
        .lines()
        .flat_map(|line| line.split(". "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn replacement_in_sentence(literal: &str, sentence: &str) -> Option<String> {
    let occurrences = whole_word_matches(sentence, literal);
    if occurrences.is_empty() {
        return None;
    }
    let lower = sentence.to_ascii_lowercase();

    for &(_, lit_end) in &occurrences {
        let after = &lower[lit_end..];
        let hit = FORWARD_MARKERS
            .iter()
            .map(|m| (m, false))
            .chain(QUOTED_ONLY_MARKERS.iter().map(|m| (m, true)))
            .filter_map(|(m, quoted_only)| {
                let pos = after.find(m)?;
                let tail = &sentence[lit_end + pos + m.len()..];
                if quoted_only && !starts_with_quote(tail) {
                    return None;
                }
                Some((pos, tail))
            })
            .min_by_key(|(pos, _)| *pos);
        if let Some((_, tail)) = hit {
            if let Some(value) = first_value(tail, ARTICLES) {
                if value != literal {
                    return Some(value);
                }
            }
        }
    }

    for marker in BACKWARD_MARKERS {
        let Some(pos) = lower.find(marker) else {
            continue;
        };
        let marker_end = pos + marker.len();
        if occurrences.iter().any(|&(start, _)| start >= marker_end) {
            if let Some(value) = last_value(&sentence[..pos]) {
                if value != literal && !contains_whole_word(&value, literal) {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// 在 source 中查找 literal 的显式替换关系，返回新值与所在句子
pub fn find_replacement(literal: &str, source: &str) -> Option<(String, String)> {
    sentences(source).find_map(|sentence| {
        replacement_in_sentence(literal, sentence).map(|value| (value, sentence.to_string()))
    })
}

/// 改写后任务中新出现的每个词都必须逐字出现在某个来源里
pub fn is_grounded(original_task: &str, corrected_task: &str, sources: &[&str]) -> bool {
    let original: Vec<&str> = original_task.split(|c: char| !is_word_char(c)).collect();
    corrected_task
        .split(|c: char| !is_word_char(c))
        .filter(|w| !w.is_empty() && !original.contains(w))
        .all(|w| sources.iter().any(|s| contains_whole_word(s, w)))
}

/// 按来源优先级（错误文本 → 证据 → 原始请求）寻找第一个可用修正
pub fn propose_correction(error_detail: &str, failed_task: &str, sources: &[&str]) -> Option<Correction> {
    for literal in failing_literals(error_detail, failed_task) {
        for source in sources {
            let Some((replacement, sentence)) = find_replacement(&literal, source) else {
                continue;
            };
            let corrected = substitute(failed_task, &literal, &replacement);
            if corrected == failed_task || !is_grounded(failed_task, &corrected, sources) {
                continue;
            }
            return Some(Correction {
                original: literal,
                replacement,
                source: sentence,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_literal_must_appear_in_task() {
        let lits = failing_literals("ERROR: missing column 'id'", "select id, name from employees.csv");
        assert_eq!(lits, vec!["id".to_string()]);
        assert!(failing_literals("ERROR: missing column 'id'", "select uid from t").is_empty());
    }

    #[test]
    fn test_keyword_value_from_prose_and_json() {
        assert_eq!(
            failing_literals("ERROR: bucket not found", "download a.csv from bucket B in project P"),
            vec!["B".to_string()]
        );
        assert_eq!(
            failing_literals(
                "ERROR: bucket not found",
                r#"Download a.csv with parameters {"bucket_name":"raw-zone","project_id":"P"}"#
            ),
            vec!["raw-zone".to_string()]
        );
        assert_eq!(
            failing_literals("ERROR: dataset does not exist", "create table t in dataset named emp_data"),
            vec!["emp_data".to_string()]
        );
    }

    #[test]
    fn test_find_replacement_forward_markers() {
        let src = r#"Schema updated. Column "id" was renamed to "ID" last week."#;
        assert_eq!(find_replacement("id", src).map(|r| r.0), Some("ID".to_string()));
        assert_eq!(
            find_replacement("B", "bucket B moved to the B-archive.").map(|r| r.0),
            Some("B-archive".to_string())
        );
        assert_eq!(
            find_replacement("emp", "ERROR: unknown dataset 'emp', did you mean 'emp_data'?").map(|r| r.0),
            Some("emp_data".to_string())
        );
        assert_eq!(find_replacement("x", "x -> y").map(|r| r.0), Some("y".to_string()));
    }

    #[test]
    fn test_find_replacement_instead_of() {
        assert_eq!(
            find_replacement("id", "use employee_id instead of id").map(|r| r.0),
            Some("employee_id".to_string())
        );
    }

    #[test]
    fn test_no_marker_means_no_replacement() {
        assert!(find_replacement("B", "listed bucket B2 with 3 objects").is_none());
        assert!(find_replacement("B", "bucket B not found").is_none());
        // 标记在字面量之前不算
        assert!(find_replacement("id", "renamed to ID: the id column").is_none());
    }

    #[test]
    fn test_state_description_is_not_a_rename() {
        assert!(find_replacement("emp_data", "dataset emp_data is now empty").is_none());
        assert_eq!(
            find_replacement("emp_data", "dataset emp_data is now 'emp_v2'").map(|r| r.0),
            Some("emp_v2".to_string())
        );
        assert_eq!(
            find_replacement("emp_data", "dataset emp_data is now called emp_v2").map(|r| r.0),
            Some("emp_v2".to_string())
        );

        let task = "create table t in dataset emp_data";
        let error = "ERROR: dataset 'emp_data' not found";
        let sources = [error, "dataset emp_data is now empty", "build the employee table"];
        assert!(propose_correction(error, task, &sources).is_none());
    }

    #[test]
    fn test_substitute_is_whole_word_and_case_sensitive() {
        assert_eq!(substitute("select id, uid, ID from t", "id", "ID"), "select ID, uid, ID from t");
        assert_eq!(substitute("no match here", "id", "ID"), "no match here");
    }

    #[test]
    fn test_propose_correction_scenario() {
        let task = "select id, name from employees.csv";
        let error = "ERROR: missing column 'id'";
        let evidence = r#"column "id" was renamed to "ID""#;
        let fix = propose_correction(error, task, &[error, evidence, "show employee names"]).unwrap();
        assert_eq!(fix.replacement, "ID");
        assert_eq!(substitute(task, &fix.original, &fix.replacement), "select ID, name from employees.csv");
    }

    #[test]
    fn test_propose_correction_without_relation_is_none() {
        let task = "download a.csv from bucket B in project P";
        let error = "ERROR: bucket not found";
        let sources = [error, "listed bucket B2: a.csv, b.csv", task];
        assert!(propose_correction(error, task, &sources).is_none());
    }

    #[test]
    fn test_is_grounded() {
        assert!(is_grounded("select id", "select ID", &["renamed to ID"]));
        assert!(!is_grounded("select id", "select ident", &["renamed to ID"]));
        // 新值只作为更长标识符的一部分出现不算
        assert!(!is_grounded("select id", "select ID", &["IDX renamed"]));
        assert!(is_grounded("get b", "get B-archive", &["bucket B moved to the B-archive."]));
    }
}
