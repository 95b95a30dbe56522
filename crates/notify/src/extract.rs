//! Bounded-depth text recovery from shape-varying JSON payloads.
//!
//! Agent payloads nest their text under different conventions. Rather than
//! probing properties ad hoc at every call site, this walks a
//! `serde_json::Value` with an explicit ordered fallback chain of key
//! names, preferring a direct hit over concatenating everything.

use serde_json::Value;

/// Recursion bound; payload nesting beyond this is ignored.
const MAX_DEPTH: usize = 6;

/// Keys probed on objects, in priority order.
const PREFERRED_KEYS: [&str; 8] = [
    "text",
    "content",
    "message",
    "input",
    "prompt",
    "input_text",
    "inputText",
    "value",
];

/// Recover human text from an arbitrarily shaped payload value.
///
/// Strings are returned as-is, numbers and booleans stringified, arrays
/// concatenated element-wise. Objects are first probed via the preferred
/// keys; the first key yielding non-empty text wins, otherwise all values
/// are concatenated.
pub fn extract_text_deep(value: &Value) -> String {
    walk(value, 0)
}

fn walk(value: &Value, depth: usize) -> String {
    if depth > MAX_DEPTH {
        return String::new();
    }
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items.iter().map(|item| walk(item, depth + 1)).collect(),
        Value::Object(map) => {
            for key in PREFERRED_KEYS {
                if let Some(inner) = map.get(key) {
                    let text = walk(inner, depth + 1);
                    if !text.is_empty() {
                        return text;
                    }
                }
            }
            map.values().map(|item| walk(item, depth + 1)).collect()
        },
    }
}

/// First non-empty line of `text`, trimmed.
pub fn first_non_empty_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn plain_string() {
        assert_eq!(extract_text_deep(&json!("hello")), "hello");
    }

    #[test]
    fn scalars_stringify() {
        assert_eq!(extract_text_deep(&json!(42)), "42");
        assert_eq!(extract_text_deep(&json!(true)), "true");
        assert_eq!(extract_text_deep(&Value::Null), "");
    }

    #[test]
    fn arrays_concatenate() {
        assert_eq!(extract_text_deep(&json!(["a", "b", "c"])), "abc");
    }

    #[test]
    fn preferred_key_beats_concatenation() {
        let value = json!({"zz_other": "noise", "text": "the text"});
        assert_eq!(extract_text_deep(&value), "the text");
    }

    #[test]
    fn preferred_key_order_is_respected() {
        let value = json!({"content": "from content", "text": "from text"});
        assert_eq!(extract_text_deep(&value), "from text");
    }

    #[test]
    fn empty_preferred_value_falls_through() {
        let value = json!({"text": "", "content": "fallback"});
        assert_eq!(extract_text_deep(&value), "fallback");
    }

    #[test]
    fn nested_content_blocks() {
        let value = json!({
            "message": {
                "content": [
                    {"type": "text", "text": "part one "},
                    {"type": "text", "text": "part two"},
                ]
            }
        });
        assert_eq!(extract_text_deep(&value), "part one part two");
    }

    #[test]
    fn depth_is_bounded() {
        let mut value = json!("too deep");
        for _ in 0..8 {
            value = json!({ "wrap": value });
        }
        assert_eq!(extract_text_deep(&value), "");
    }

    #[test]
    fn first_non_empty_line_skips_blanks() {
        assert_eq!(first_non_empty_line("\n  \n first\nsecond"), "first");
        assert_eq!(first_non_empty_line("   "), "");
        assert_eq!(first_non_empty_line(""), "");
    }
}
