//! Turning raw model text into JSON.
//!
//! Models wrap their answer in prose or code fences and sometimes escape
//! characters that JSON does not allow to be escaped (`\'`, `\-`, `\_`).
//! [`parse_model_json`] tries a strict parse first and only falls back to the
//! repair steps below when that fails:
//!
//! 1. strip Markdown code-fence markers,
//! 2. cut out the first balanced `[...]` or `{...}` span,
//! 3. repair backslashes inside that span: `\\` pairs are parked behind a
//!    placeholder, every other backslash that does not start a valid JSON
//!    escape is dropped, then the pairs are restored. Raw newlines and tabs
//!    inside string literals are escaped on the way.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use tb_core::truncate_chars;

const SNIPPET_CHARS: usize = 200;
const PLACEHOLDER: &str = "\u{E000}\u{E001}";

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("no JSON object or array in model output: {snippet}")]
    NoJson { snippet: String },

    #[error("model output is not valid JSON after repair ({source}): {snippet}")]
    Invalid {
        source: serde_json::Error,
        snippet: String,
    },
}

impl From<SanitizeError> for tb_core::Error {
    fn from(e: SanitizeError) -> Self {
        tb_core::Error::Parse(e.to_string())
    }
}

fn snippet(text: &str) -> String {
    truncate_chars(text.trim(), SNIPPET_CHARS).to_string()
}

pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// First balanced `[...]` / `{...}` span, skipping brackets inside string literals.
///
/// When the text ends before the span closes (a truncated answer), the greedy
/// span from the opener to the last matching closer is returned instead.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find(|c| c == '[' || c == '{')?;
    let opener = text[start..].chars().next()?;
    let closer = if opener == '[' { ']' } else { '}' };

    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in text[start..].char_indices() {
        if in_string {
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
            '"' => in_string = true,
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ']' | '}' if stack.last() == Some(&c) => {
                stack.pop();
                if stack.is_empty() {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

fn valid_escape_at(chars: &[char], i: usize) -> bool {
    match chars.get(i + 1) {
        Some('"' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => true,
        Some('u') => chars
            .get(i + 2..i + 6)
            .map_or(false, |hex| hex.iter().all(|c| c.is_ascii_hexdigit())),
        _ => false,
    }
}

/// Drops stray backslashes while keeping `\\` pairs and valid JSON escapes intact.
pub fn repair_backslashes(span: &str) -> String {
    let parked = span.replace("\\\\", PLACEHOLDER);
    let chars: Vec<char> = parked.chars().collect();
    let mut out = String::with_capacity(parked.len());
    let mut in_string = false;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if valid_escape_at(&chars, i) => {
                out.push(c);
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            '\\' => {}
            '"' => {
                in_string = !in_string;
                out.push(c);
            }
            '\n' if in_string => out.push_str("\\n"),
            '\r' if in_string => out.push_str("\\r"),
            '\t' if in_string => out.push_str("\\t"),
            _ => out.push(c),
        }
        i += 1;
    }

    out.replace(PLACEHOLDER, "\\\\")
}

/// Strict parse first, then fence stripping, span extraction and backslash repair.
pub fn parse_model_json(raw: &str) -> Result<Value, SanitizeError> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let unfenced = strip_code_fences(trimmed);
    if let Ok(value) = serde_json::from_str(&unfenced) {
        return Ok(value);
    }

    let span = extract_json_span(&unfenced).ok_or_else(|| SanitizeError::NoJson {
        snippet: snippet(trimmed),
    })?;
    if let Ok(value) = serde_json::from_str(span) {
        return Ok(value);
    }

    let repaired = repair_backslashes(span);
    serde_json::from_str(&repaired).map_err(|source| SanitizeError::Invalid {
        source,
        snippet: snippet(&repaired),
    })
}

pub fn parse_model_output<T: DeserializeOwned>(raw: &str) -> Result<T, SanitizeError> {
    let value = parse_model_json(raw)?;
    let rendered = value.to_string();
    serde_json::from_value(value).map_err(|source| SanitizeError::Invalid {
        source,
        snippet: snippet(&rendered),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_json_passes_untouched() {
        let raw = r#"{"summaries": [], "generatedAt": "2025-11-22"}"#;
        assert_eq!(parse_model_json(raw).unwrap(), json!({"summaries": [], "generatedAt": "2025-11-22"}));
    }

    #[test]
    fn test_code_fences_parse_like_unwrapped() {
        let inner = r#"{"summaries": [{"title": "ISAC", "url": "https://arxiv.org/abs/1"}]}"#;
        let fenced = format!("```json\n{}\n```", inner);
        assert_eq!(
            parse_model_json(&fenced).unwrap(),
            serde_json::from_str::<Value>(inner).unwrap()
        );

        let bare_fence = format!("```\n{}\n```", inner);
        assert_eq!(parse_model_json(&bare_fence).unwrap(), parse_model_json(inner).unwrap());
    }

    #[test]
    fn test_commentary_around_json() {
        let raw = "Here are the results you asked for:\n[3, 1, 5]\nLet me know if you need more.";
        assert_eq!(parse_model_json(raw).unwrap(), json!([3, 1, 5]));
    }

    #[test]
    fn test_extract_span_ignores_brackets_in_strings() {
        let text = r#"note {"title": "a } tricky ] title", "n": [1, {"x": 2}]} trailing }"#;
        assert_eq!(
            extract_json_span(text),
            Some(r#"{"title": "a } tricky ] title", "n": [1, {"x": 2}]}"#)
        );
    }

    #[test]
    fn test_extract_span_prefers_first_opener() {
        assert_eq!(extract_json_span(r#"x [1, 2] {"a": 1}"#), Some("[1, 2]"));
        assert_eq!(extract_json_span(r#"x {"a": [1]} [2]"#), Some(r#"{"a": [1]}"#));
        assert_eq!(extract_json_span("no json here"), None);
    }

    #[test]
    fn test_extract_span_greedy_when_unbalanced() {
        let text = r#"{"a": {"b": 1} } extra {"#;
        assert_eq!(extract_json_span(text), Some(r#"{"a": {"b": 1} }"#));
        // opener never closed and no closer anywhere after it
        assert_eq!(extract_json_span(r#"{"a": [1, 2"#), None);
    }

    #[test]
    fn test_stray_backslashes_repaired() {
        let raw = r#"{"title": "SKT\'s roadmap \- phase 2", "summary": "said \"AI first\""}"#;
        let value = parse_model_json(raw).unwrap();
        assert_eq!(value["title"], "SKT's roadmap - phase 2");
        assert_eq!(value["summary"], "said \"AI first\"");
    }

    #[test]
    fn test_double_escapes_survive_repair() {
        let raw = r#"{"path": "C:\\temp\\6g", "note": "it\'s", "line": "a\nb", "u": "\u00e9"}"#;
        let value = parse_model_json(raw).unwrap();
        assert_eq!(value["path"], "C:\\temp\\6g");
        assert_eq!(value["note"], "it's");
        assert_eq!(value["line"], "a\nb");
        assert_eq!(value["u"], "é");
    }

    #[test]
    fn test_raw_newlines_inside_strings() {
        let raw = "{\"summary\": \"first line\nsecond line\", \"x\": 1}";
        let value = parse_model_json(raw).unwrap();
        assert_eq!(value["summary"], "first line\nsecond line");
    }

    #[test]
    fn test_repair_backslashes_directly() {
        assert_eq!(repair_backslashes(r#""a\'b""#), r#""a'b""#);
        assert_eq!(repair_backslashes(r#""a\\b""#), r#""a\\b""#);
        assert_eq!(repair_backslashes(r#""a\\\'b""#), r#""a\\'b""#);
        assert_eq!(repair_backslashes(r#""\uZZZZ""#), r#""uZZZZ""#);
    }

    #[test]
    fn test_errors_carry_snippets() {
        match parse_model_json("I could not find any relevant articles.") {
            Err(SanitizeError::NoJson { snippet }) => assert!(snippet.starts_with("I could not")),
            other => panic!("unexpected: {:?}", other),
        }
        match parse_model_json(r#"{"summaries": [ {"title": } ]}"#) {
            Err(SanitizeError::Invalid { snippet, .. }) => assert!(snippet.contains("summaries")),
            other => panic!("unexpected: {:?}", other),
        }
        let err: tb_core::Error = SanitizeError::NoJson { snippet: "x".to_string() }.into();
        assert!(matches!(err, tb_core::Error::Parse(_)));
    }

    #[test]
    fn test_parse_model_output_typed() {
        #[derive(serde::Deserialize)]
        struct Pick {
            selected: Vec<usize>,
        }
        let pick: Pick = parse_model_output("```json\n{\"selected\": [2, 4]}\n```").unwrap();
        assert_eq!(pick.selected, vec![2, 4]);
        assert!(parse_model_output::<Pick>("[1, 2]").is_err());
    }
}
