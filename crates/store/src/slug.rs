// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic slug generation.

use sha2::{Digest, Sha256};

pub const DEFAULT_MAX_LEN: usize = 64;

/// Produce a stable, URL-safe slug from arbitrary text.
///
/// Lowercases, maps runs of non-alphanumerics to a single `-`, trims
/// leading/trailing dashes, and truncates to `max_length`. Deterministic
/// for a given input.
pub fn slugify(text: &str, max_length: usize) -> String {
    let mut slug = String::with_capacity(text.len().min(max_length));
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= max_length {
            break;
        }
    }
    slug.truncate(max_length);
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("untitled");
    }
    slug
}

/// Stable collision suffix for a cloud identity.
///
/// When a project directory already belongs to a different cloud id, the
/// slug gains `-` plus the first 8 hex chars of `sha256(cloud_id)`. Hash
/// derived (not a counter) so folder selection is idempotent across
/// restarts.
pub fn collision_suffix(cloud_id: &str) -> String {
    let digest = Sha256::digest(cloud_id.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

#[cfg(test)]
#[path = "slug_tests.rs"]
mod tests;
