// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tolerant JSON extraction from LLM output.
//!
//! Models wrap JSON in markdown fences or chat around it. Extraction
//! uses ordered fallbacks: a fenced code block first, then the first
//! balanced `{...}` span, then the raw text -- each candidate only
//! counts if it actually parses.

use serde_json::Value;

/// Extracts the first JSON object from `text`, if any.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Some(inner) = fenced_block(trimmed) {
        if let Some(value) = first_balanced_object(inner) {
            return Some(value);
        }
    }

    if let Some(value) = first_balanced_object(trimmed) {
        return Some(value);
    }

    serde_json::from_str::<Value>(trimmed)
        .ok()
        .filter(Value::is_object)
}

/// Returns the contents of the first ``` fenced block, tolerating a
/// language tag after the opening fence.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    Some(&body[..end])
}

/// Finds the first `{...}` span with balanced braces (string-aware) that
/// parses as a JSON object. Spans that balance but fail to parse are
/// skipped in favour of later candidates.
fn first_balanced_object(text: &str) -> Option<Value> {
    let mut search_from = 0;
    while let Some(relative) = text[search_from..].find('{') {
        let start = search_from + relative;
        match balanced_span(text, start) {
            Some(end) => {
                let candidate = &text[start..end];
                if let Some(value) = serde_json::from_str::<Value>(candidate)
                    .ok()
                    .filter(Value::is_object)
                {
                    return Some(value);
                }
                search_from = start + 1;
            }
            // Unbalanced to end of input; no later span can close either.
            None => return None,
        }
    }
    None
}

/// Returns the exclusive end of the balanced `{...}` span starting at
/// `start`, tracking strings and escapes.
fn balanced_span(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}
