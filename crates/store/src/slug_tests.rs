// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for slug generation

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "Fix Login Flow", "fix-login-flow" },
    punctuation = { "a/b: c_d!", "a-b-c-d" },
    unicode = { "héllo wörld", "h-llo-w-rld" },
    squeeze = { "a   --  b", "a-b" },
    leading = { "--start", "start" },
    empty = { "!!!", "untitled" },
)]
fn slugify_cases(input: &str, expected: &str) {
    assert_eq!(slugify(input, DEFAULT_MAX_LEN), expected);
}

#[test]
fn slugify_truncates_without_trailing_dash() {
    let slug = slugify("alpha beta gamma", 11);
    assert!(slug.len() <= 11);
    assert!(!slug.ends_with('-'));
    assert_eq!(slug, "alpha-beta");
}

#[test]
fn slugify_is_deterministic() {
    assert_eq!(slugify("Same Input", 64), slugify("Same Input", 64));
}

#[test]
fn collision_suffix_is_stable_hex() {
    let a = collision_suffix("cloud-id-1");
    let b = collision_suffix("cloud-id-1");
    assert_eq!(a, b);
    assert_eq!(a.len(), 8);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, collision_suffix("cloud-id-2"));
}
