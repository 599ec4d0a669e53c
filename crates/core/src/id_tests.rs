// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for ID generation

use super::*;

crate::define_id! {
    /// Test-only ID type.
    pub struct TestId("tst-");
}

#[test]
fn generated_ids_carry_prefix_and_length() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("tst-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn generated_ids_are_unique() {
    let a = TestId::new();
    let b = TestId::new();
    assert_ne!(a, b);
}

#[test]
fn from_string_round_trips() {
    let id = TestId::from_string("tst-abc123");
    assert_eq!(id, "tst-abc123");
    assert_eq!(id.suffix(), "abc123");
}

#[test]
fn suffix_without_prefix_returns_whole() {
    let id = TestId::from_string("other-form");
    assert_eq!(id.suffix(), "other-form");
}

#[test]
fn short_truncates() {
    assert_eq!(short("abcdef", 3), "abc");
    assert_eq!(short("ab", 3), "ab");
}

#[test]
fn idbuf_hash_matches_str_hash() {
    use std::collections::HashMap;
    let mut map: HashMap<TestId, u32> = HashMap::new();
    map.insert(TestId::from_string("tst-x"), 1);
    assert_eq!(map.get("tst-x"), Some(&1));
}

#[test]
fn serde_transparent() {
    let id = TestId::from_string("tst-json");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"tst-json\"");
    let back: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
