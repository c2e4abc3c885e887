//! Parsing JSON out of free-form LLM replies.
//!
//! Extraction order is fixed:
//! 1. drop `<think>...</think>` reasoning regions
//! 2. the first fenced code block with non-empty content
//! 3. the span from the first `{` to the last `}`
//! 4. the whole reply, trimmed
//!
//! If the extracted text does not parse, `//` comments and trailing commas
//! are stripped and parsing is retried once.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid regex"));

static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<think>").expect("valid regex"));

static CLOSE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</think>").expect("valid regex"));

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("valid regex"));

#[derive(Debug, Error)]
#[error("invalid JSON in LLM output: {message}")]
pub struct JsonExtractError {
    pub message: String,
}

/// Remove reasoning regions emitted by thinking models.
///
/// A dangling `</think>` (opening tag cut off) drops everything before it;
/// a dangling `<think>` drops everything after it.
pub fn strip_think_tags(text: &str) -> String {
    let cleaned = THINK_BLOCK.replace_all(text, "");
    // Offsets come from matches on `cleaned` itself, so slicing stays on char boundaries.
    let rest = match CLOSE_TAG.find_iter(&cleaned).last() {
        Some(close) => &cleaned[close.end()..],
        None => match OPEN_TAG.find(&cleaned) {
            Some(open) => &cleaned[..open.start()],
            None => &cleaned[..],
        },
    };
    rest.trim().to_string()
}

/// The most likely JSON payload in `text`.
pub fn extract_json_block(text: &str) -> String {
    let cleaned = strip_think_tags(text);

    if let Some(block) = FENCED_BLOCK
        .captures_iter(&cleaned)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .find(|s| !s.is_empty())
    {
        return block.to_string();
    }

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if end > start {
            return cleaned[start..=end].to_string();
        }
    }

    cleaned
}

/// Strip `//` line comments and trailing commas outside string literals.
pub fn sanitize_json(json: &str) -> String {
    let without_comments = strip_line_comments(json);
    strip_trailing_commas(&without_comments)
}

fn strip_line_comments(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn strip_trailing_commas(json: &str) -> String {
    let chars: Vec<char> = json.chars().collect();
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Extract, then deserialize into `T`, sanitizing on the second attempt.
pub fn parse_llm_json<T: DeserializeOwned>(text: &str) -> Result<T, JsonExtractError> {
    let block = extract_json_block(text);
    if block.is_empty() {
        return Err(JsonExtractError {
            message: "empty response".to_string(),
        });
    }

    match serde_json::from_str(&block) {
        Ok(value) => Ok(value),
        Err(first) => serde_json::from_str(&sanitize_json(&block)).map_err(|_| JsonExtractError {
            message: first.to_string(),
        }),
    }
}

/// Accept a bare string where an object is expected: `"Bob"` becomes
/// `{"<field>": "Bob"}`. Other values pass through.
pub fn coerce_object(value: Value, field: &str) -> Value {
    match value {
        Value::String(s) => serde_json::json!({ field: s }),
        other => other,
    }
}

/// Apply [`coerce_object`] to every element of an array.
pub fn coerce_object_list(value: Option<Value>, field: &str) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.into_iter().map(|v| coerce_object(v, field)).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(single) => vec![coerce_object(single, field)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_think_tags() {
        assert_eq!(strip_think_tags("<think>hmm {x}</think>{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_think_tags("reasoning...</think> answer"), "answer");
        assert_eq!(strip_think_tags("answer <think>never closed"), "answer");
        assert_eq!(strip_think_tags("plain"), "plain");
    }

    #[test]
    fn test_strip_think_tags_after_case_folding_chars() {
        // İ grows and the Kelvin sign shrinks under lowercasing.
        assert_eq!(strip_think_tags("İ</think>"), "");
        assert_eq!(strip_think_tags("İİİ</THINK>{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_think_tags("\u{212A}\u{212A} answer <Think>cut"), "\u{212A}\u{212A} answer");

        let raw = "İİİİİİİİİ</think>{\"intent\": \"code_help\", \"confidence\": 0.9}";
        let value: Value = parse_llm_json(raw).unwrap();
        assert_eq!(value["intent"], "code_help");
    }

    #[test]
    fn test_fenced_block_preferred() {
        let text = "Sure! {not this}\n```json\n{\"intent\": \"research\"}\n```\ntrailing }";
        assert_eq!(extract_json_block(text), "{\"intent\": \"research\"}");
    }

    #[test]
    fn test_fence_without_language() {
        assert_eq!(extract_json_block("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_brace_span_fallback() {
        let text = "Here you go: {\"a\": {\"b\": 2}} hope that helps";
        assert_eq!(extract_json_block(text), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_raw_trim_fallback() {
        assert_eq!(extract_json_block("  [1, 2]  "), "[1, 2]");
        assert_eq!(extract_json_block("} backwards {"), "} backwards {");
    }

    #[test]
    fn test_sanitize_comments_and_trailing_commas() {
        let dirty = "{\n  \"a\": 1, // first\n  \"url\": \"http://x.y\",\n  \"list\": [1, 2,],\n}";
        let value: Value = serde_json::from_str(&sanitize_json(dirty)).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["url"], "http://x.y");
        assert_eq!(value["list"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_sanitize_keeps_commas_in_strings() {
        let json = r#"{"text": "a, }", "n": 1}"#;
        assert_eq!(sanitize_json(json), json);
    }

    #[test]
    fn test_parse_llm_json_retries_with_sanitize() {
        let value: Value = parse_llm_json("```json\n{\"x\": [1,],}\n```").unwrap();
        assert_eq!(value["x"], serde_json::json!([1]));
        assert!(parse_llm_json::<Value>("no json here").is_err());
        assert!(parse_llm_json::<Value>("{\"truncated\": ").is_err());
        assert!(parse_llm_json::<Value>("").is_err());
    }

    #[test]
    fn test_coerce_object() {
        assert_eq!(coerce_object(serde_json::json!("Bob"), "name"), serde_json::json!({"name": "Bob"}));
        let list = coerce_object_list(Some(serde_json::json!(["Ann", {"name": "Bo"}])), "name");
        assert_eq!(list[0]["name"], "Ann");
        assert_eq!(list[1]["name"], "Bo");
        assert_eq!(coerce_object_list(Some(serde_json::json!("solo")), "task").len(), 1);
        assert!(coerce_object_list(None, "task").is_empty());
    }
}
