// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for decision extraction

use super::*;

#[test]
fn finds_a_bare_object() {
    let value = parse_last_json_object(r#"{"decision":"done"}"#).unwrap();
    assert_eq!(value["decision"], "done");
}

#[test]
fn takes_the_last_of_several_objects() {
    let text = r#"
        thinking... {"decision":"not_done"}
        final answer:
        {"decision":"done","explanation":"all checks pass"}
    "#;
    let value = parse_last_json_object(text).unwrap();
    assert_eq!(value["decision"], "done");
}

#[test]
fn survives_braces_inside_strings() {
    let text = r#"{"explanation":"use {braces} carefully","decision":"blocked"}"#;
    let value = parse_last_json_object(text).unwrap();
    assert_eq!(value["decision"], "blocked");
}

#[test]
fn survives_escaped_quotes() {
    let text = r#"{"summary":"she said \"done\"","decision":"not_done"}"#;
    let value = parse_last_json_object(text).unwrap();
    assert_eq!(value["decision"], "not_done");
}

#[test]
fn handles_nested_objects() {
    let text = r#"log line {"outer":{"inner":1},"decision":"done"} trailing"#;
    let value = parse_last_json_object(text).unwrap();
    assert_eq!(value["outer"]["inner"], 1);
}

#[test]
fn ignores_malformed_candidates() {
    let text = r#"{broken json} and then {"decision":"failed"} and {also broken"#;
    let value = parse_last_json_object(text).unwrap();
    assert_eq!(value["decision"], "failed");
}

#[test]
fn none_when_no_object_exists() {
    assert!(parse_last_json_object("no json here").is_none());
    assert!(parse_last_json_object("[1, 2, 3]").is_none());
    assert!(parse_last_json_object("").is_none());
}

#[test]
fn unbalanced_prose_brace_does_not_poison_later_objects() {
    let text = "weird } prose\n{\"decision\":\"done\"}";
    let value = parse_last_json_object(text).unwrap();
    assert_eq!(value["decision"], "done");
}
