// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extraction of the verifier's JSON decision from free-form output.

use serde_json::Value;

/// Find the last well-formed top-level JSON object in `text`.
///
/// Scans with a small lexer (string- and escape-aware brace depth),
/// collecting candidate `{...}` spans that open at depth zero, and keeps
/// the last one serde accepts as an object. Prose braces that never form
/// valid JSON are skipped.
pub fn parse_last_json_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut span_start: Option<usize> = None;
    let mut last_valid: Option<Value> = None;

    for (i, &byte) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => {
                if depth == 0 {
                    span_start = Some(i);
                }
                depth += 1;
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(start) = span_start.take() {
                        if let Ok(value) = serde_json::from_slice::<Value>(&bytes[start..=i]) {
                            if value.is_object() {
                                last_valid = Some(value);
                            }
                        }
                    }
                }
                if depth < 0 {
                    // Unbalanced prose brace: reset the lexer.
                    depth = 0;
                    in_string = false;
                    span_start = None;
                }
            }
            _ => {}
        }
    }
    last_valid
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
