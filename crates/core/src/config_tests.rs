// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for environment configuration

use super::*;
use serial_test::serial;

fn clear_agx_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("AGX_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn defaults_apply_without_env() {
    clear_agx_env();
    let config = Config::load();
    assert_eq!(config.cloud_url, "http://localhost:41741");
    assert_eq!(config.max_workers, 1);
    assert_eq!(config.poll_interval, Duration::from_millis(1500));
    assert_eq!(config.provider_timeout, Duration::from_millis(600_000));
    assert_eq!(config.verify_timeout, Duration::from_millis(300_000));
    assert_eq!(config.single_max_iters, 6);
    assert_eq!(config.swarm_max_iters, 2);
    assert_eq!(config.verify_prompt_max_chars, 6000);
    assert_eq!(config.artifact_sha_max_bytes, 5_242_880);
}

#[test]
#[serial]
fn clamps_enforce_floors() {
    clear_agx_env();
    std::env::set_var("AGX_DAEMON_MAX_CONCURRENT", "0");
    std::env::set_var("AGX_DAEMON_POLL_MS", "50");
    let config = Config::load();
    assert_eq!(config.max_workers, 1);
    assert_eq!(config.poll_interval, Duration::from_millis(200));
    clear_agx_env();
}

#[test]
#[serial]
fn unparseable_values_fall_back() {
    clear_agx_env();
    std::env::set_var("AGX_SINGLE_MAX_ITERS", "lots");
    let config = Config::load();
    assert_eq!(config.single_max_iters, 6);
    clear_agx_env();
}

#[test]
#[serial]
fn max_iters_selects_by_shape() {
    clear_agx_env();
    let config = Config::load();
    assert_eq!(config.max_iters(true), 2);
    assert_eq!(config.max_iters(false), 6);
}
