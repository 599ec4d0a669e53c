// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! Environment variables are authoritative; CLI flags override them at the
//! binary edge by mutating the loaded [`Config`].

use std::time::Duration;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok()).unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name).ok().and_then(|s| s.parse::<u32>().ok()).unwrap_or(default)
}

/// Task service base URL (`AGX_CLOUD_URL`).
pub fn cloud_url() -> String {
    std::env::var("AGX_CLOUD_URL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "http://localhost:41741".to_string())
}

/// Value for the `x-user-id` header (`AGX_USER_ID`).
pub fn user_id() -> String {
    std::env::var("AGX_USER_ID").unwrap_or_default()
}

/// Resolved orchestrator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub cloud_url: String,
    pub user_id: String,
    /// Worker pool size, clamped to ≥ 1.
    pub max_workers: u32,
    /// Queue poll interval, clamped to ≥ 200 ms.
    pub poll_interval: Duration,
    /// Per-provider execute timeout.
    pub provider_timeout: Duration,
    /// Verifier timeout.
    pub verify_timeout: Duration,
    /// Per-invocation provider retries.
    pub provider_retries: u32,
    /// Iteration cap for swarm tasks.
    pub swarm_max_iters: u32,
    /// Iteration cap for single-agent tasks.
    pub single_max_iters: u32,
    /// Verifier prompt length ceiling in characters.
    pub verify_prompt_max_chars: usize,
    /// Files larger than this skip sha256 in the artifact manifest.
    pub artifact_sha_max_bytes: u64,
}

impl Config {
    /// Load from the environment, applying defaults and clamps.
    pub fn load() -> Self {
        Self {
            cloud_url: cloud_url(),
            user_id: user_id(),
            max_workers: env_u32("AGX_DAEMON_MAX_CONCURRENT", 1).max(1),
            poll_interval: Duration::from_millis(env_u64("AGX_DAEMON_POLL_MS", 1500).max(200)),
            provider_timeout: Duration::from_millis(env_u64("AGX_SWARM_TIMEOUT_MS", 600_000)),
            verify_timeout: Duration::from_millis(env_u64("AGX_VERIFY_TIMEOUT_MS", 300_000)),
            provider_retries: env_u32("AGX_SWARM_RETRIES", 1),
            swarm_max_iters: env_u32("AGX_SWARM_MAX_ITERS", 2),
            single_max_iters: env_u32("AGX_SINGLE_MAX_ITERS", 6),
            verify_prompt_max_chars: env_u64("AGX_VERIFY_PROMPT_MAX_CHARS", 6000) as usize,
            artifact_sha_max_bytes: env_u64("AGX_LOCAL_ARTIFACT_SHA_MAX_BYTES", 5_242_880),
        }
    }

    /// Iteration cap for a task, by execute shape.
    pub fn max_iters(&self, swarm: bool) -> u32 {
        if swarm {
            self.swarm_max_iters
        } else {
            self.single_max_iters
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::load()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
