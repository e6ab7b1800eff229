//! Recover a JSON value from a model reply that may wrap it in prose.

use crate::utils::error::{IntelError, Result};
use serde_json::Value;

/// Three passes, first hit wins:
/// 1. the whole trimmed reply parses
/// 2. the reply starts with an object or array, trailing text ignored
/// 3. the first balanced `{...}` or `[...]` span that parses, in order of appearance
pub fn recover_json(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(value) = leading_value(trimmed) {
        tracing::debug!("Recovered leading JSON value, ignoring trailing text");
        return Ok(value);
    }

    for (start, end) in bracket_spans(text) {
        match serde_json::from_str::<Value>(&text[start..end]) {
            Ok(value) if is_record_shaped(&value) => {
                tracing::debug!("Recovered JSON span at bytes {}..{}", start, end);
                return Ok(value);
            }
            Ok(_) => tracing::debug!("Candidate span {}..{} is not a record list", start, end),
            Err(e) => tracing::debug!("Candidate span {}..{} rejected: {}", start, end, e),
        }
    }

    Err(IntelError::NoStructuredContentFound {
        text: text.to_string(),
    })
}

/// 開頭就是物件或陣列時，只解析第一個值
fn leading_value(text: &str) -> Option<Value> {
    if !text.starts_with(['{', '[']) {
        return None;
    }
    serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .next()
        .and_then(|parsed| parsed.ok())
}

/// Objects always qualify; arrays only when they hold objects, so citation
/// markers like `[1]` in prose are passed over.
fn is_record_shaped(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => !items.is_empty() && items.iter().all(Value::is_object),
        _ => false,
    }
}

/// Byte ranges of every balanced bracket span, one per `{` or `[` in order of appearance.
///
/// Brackets inside JSON string literals do not count towards depth. An enclosing
/// array is always tried before the objects inside it.
fn bracket_spans(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| matches!(**b, b'{' | b'['))
        .filter_map(move |(start, _)| matching_close(bytes, start).map(|end| (start, end + 1)))
}

fn matching_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                // 括號種類不符就放棄這個起點
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_json_is_parsed_directly() {
        let inputs = [
            r#"{"Company Name": "Acme Pharma"}"#,
            "  [1, 2, 3]\n",
            r#""just a string""#,
            "42",
        ];
        for input in inputs {
            let expected: Value = serde_json::from_str(input.trim()).unwrap();
            assert_eq!(recover_json(input).unwrap(), expected);
        }
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let reply = "Sure! Here is the data you asked for:\n{\"Company Name\": \"Acme Pharma\", \"City\": \"Basel\"}\nLet me know if you need more.";
        assert_eq!(
            recover_json(reply).unwrap(),
            json!({"Company Name": "Acme Pharma", "City": "Basel"})
        );
    }

    #[test]
    fn test_markdown_fenced_reply() {
        let reply = "```json\n{\"Companies\": [{\"Company Name\": \"X\"}]}\n```";
        assert_eq!(
            recover_json(reply).unwrap(),
            json!({"Companies": [{"Company Name": "X"}]})
        );
    }

    #[test]
    fn test_nested_object_is_returned_whole() {
        let reply = r#"Result: {"a": {"b": {"c": 1}}, "d": [ {"e": 2} ]} done"#;
        assert_eq!(
            recover_json(reply).unwrap(),
            json!({"a": {"b": {"c": 1}}, "d": [{"e": 2}]})
        );
    }

    #[test]
    fn test_first_of_multiple_objects() {
        let reply = r#"First {"Company Name": "X"} and then {"Company Name": "Y"}"#;
        assert_eq!(recover_json(reply).unwrap(), json!({"Company Name": "X"}));
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let reply =
            r#"Note: {"Company Name": "Curly } Brace {Bio}", "quote": "say \"hi\" }"} trailing"#;
        assert_eq!(
            recover_json(reply).unwrap(),
            json!({"Company Name": "Curly } Brace {Bio}", "quote": "say \"hi\" }"})
        );
    }

    #[test]
    fn test_skips_brace_span_that_is_not_json() {
        let reply = r#"Using {placeholders} here: {"Company Name": "Z"}"#;
        assert_eq!(recover_json(reply).unwrap(), json!({"Company Name": "Z"}));
    }

    #[test]
    fn test_bare_array_with_trailing_note_keeps_every_item() {
        let reply = "[{\"Company Name\": \"X\"}, {\"Company Name\": \"Y\"}]\n\nNote: figures are approximate.";
        assert_eq!(
            recover_json(reply).unwrap(),
            json!([{"Company Name": "X"}, {"Company Name": "Y"}])
        );
    }

    #[test]
    fn test_leading_object_with_trailing_text() {
        let reply = "{\"Company Name\": \"X\"}\nSources: perplexity.ai";
        assert_eq!(recover_json(reply).unwrap(), json!({"Company Name": "X"}));
    }

    #[test]
    fn test_array_in_prose_is_returned_whole() {
        let reply =
            r#"Here are the matches: [{"Company Name": "X"}, {"Company Name": "Y"}] (2 found)"#;
        assert_eq!(
            recover_json(reply).unwrap(),
            json!([{"Company Name": "X"}, {"Company Name": "Y"}])
        );
    }

    #[test]
    fn test_citation_markers_are_skipped() {
        let reply = r#"Acme is a peptide developer [1][2]. {"Company Name": "Acme"}"#;
        assert_eq!(
            recover_json(reply).unwrap(),
            json!({"Company Name": "Acme"})
        );
    }

    #[test]
    fn test_no_braces_fails() {
        let err =
            recover_json("I could not find any companies matching that description.").unwrap_err();
        match err {
            IntelError::NoStructuredContentFound { text } => {
                assert!(text.starts_with("I could not find"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unbalanced_braces_fail() {
        assert!(matches!(
            recover_json(r#"Partial {"Company Name": "Acme""#),
            Err(IntelError::NoStructuredContentFound { .. })
        ));
    }
}
