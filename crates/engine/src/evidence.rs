// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local verification evidence.
//!
//! A deterministic inspection of the working repository, run before the
//! verifier provider so its prompt carries real command results rather
//! than the provider's claims.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Per-command stdout/stderr capture cap.
const CAPTURE_MAX_CHARS: usize = 20_000;

/// Ceiling on any single verification command.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// One detected verification invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyCommand {
    pub id: String,
    pub label: String,
    pub cmd: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

/// Outcome of one verification command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResult {
    pub id: String,
    pub label: String,
    pub cmd: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything the verifier prompt embeds about the working repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evidence {
    pub commands: Vec<VerifyCommand>,
    pub results: Vec<VerifyResult>,
    pub git_status: String,
    pub git_diff_stat: String,
}

impl Evidence {
    /// Whether any detected verification command passed.
    pub fn any_check_passed(&self) -> bool {
        self.results.iter().any(|r| r.exit_code == 0 && r.error.is_none())
    }

    pub fn has_changes(&self) -> bool {
        !self.git_diff_stat.trim().is_empty() || !self.git_status.trim().is_empty()
    }
}

fn command(id: &str, label: &str, cmd: &str, args: &[&str], cwd: &Path) -> VerifyCommand {
    VerifyCommand {
        id: id.to_string(),
        label: label.to_string(),
        cmd: cmd.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        cwd: cwd.to_path_buf(),
    }
}

fn npm_scripts(workdir: &Path) -> Vec<String> {
    let Ok(bytes) = std::fs::read(workdir.join("package.json")) else {
        return Vec::new();
    };
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return Vec::new();
    };
    match value.get("scripts").and_then(|s| s.as_object()) {
        Some(scripts) => scripts.keys().cloned().collect(),
        None => Vec::new(),
    }
}

fn makefile_has_test_target(workdir: &Path) -> bool {
    std::fs::read_to_string(workdir.join("Makefile"))
        .map(|text| text.lines().any(|l| l.starts_with("test:")))
        .unwrap_or(false)
}

/// Detect verification invocations by well-known file presence.
///
/// Probe order is fixed so the returned list is stable for a given tree:
/// Cargo.toml, package.json scripts (lint/test/build), tsconfig.json,
/// go.mod, Makefile.
pub fn detect_verify_commands(workdir: &Path) -> Vec<VerifyCommand> {
    let mut commands = Vec::new();

    if workdir.join("Cargo.toml").is_file() {
        commands.push(command("cargo-check", "cargo check", "cargo", &["check"], workdir));
        commands.push(command("cargo-test", "cargo test", "cargo", &["test"], workdir));
    }
    if workdir.join("package.json").is_file() {
        let scripts = npm_scripts(workdir);
        for name in ["lint", "test", "build"] {
            if scripts.iter().any(|s| s == name) {
                commands.push(command(
                    &format!("npm-{name}"),
                    &format!("npm run {name}"),
                    "npm",
                    &["run", name],
                    workdir,
                ));
            }
        }
    }
    if workdir.join("tsconfig.json").is_file() {
        commands.push(command("tsc", "tsc --noEmit", "tsc", &["--noEmit"], workdir));
    }
    if workdir.join("go.mod").is_file() {
        commands.push(command("go-vet", "go vet", "go", &["vet", "./..."], workdir));
        commands.push(command("go-test", "go test", "go", &["test", "./..."], workdir));
    }
    if makefile_has_test_target(workdir) {
        commands.push(command("make-test", "make test", "make", &["test"], workdir));
    }
    commands
}

fn cap_capture(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.chars().count() <= CAPTURE_MAX_CHARS {
        return text.into_owned();
    }
    text.chars().take(CAPTURE_MAX_CHARS).collect()
}

async fn run_command(spec: &VerifyCommand) -> VerifyResult {
    let started = Instant::now();
    let output = tokio::time::timeout(
        COMMAND_TIMEOUT,
        tokio::process::Command::new(&spec.cmd)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(std::process::Stdio::null())
            .output(),
    )
    .await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match output {
        Ok(Ok(output)) => VerifyResult {
            id: spec.id.clone(),
            label: spec.label.clone(),
            cmd: spec.cmd.clone(),
            args: spec.args.clone(),
            cwd: spec.cwd.clone(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: cap_capture(&output.stdout),
            stderr: cap_capture(&output.stderr),
            duration_ms,
            error: None,
        },
        Ok(Err(error)) => failed_result(spec, duration_ms, error.to_string()),
        Err(_) => failed_result(spec, duration_ms, "timed out".to_string()),
    }
}

fn failed_result(spec: &VerifyCommand, duration_ms: u64, error: String) -> VerifyResult {
    VerifyResult {
        id: spec.id.clone(),
        label: spec.label.clone(),
        cmd: spec.cmd.clone(),
        args: spec.args.clone(),
        cwd: spec.cwd.clone(),
        exit_code: -1,
        stdout: String::new(),
        stderr: String::new(),
        duration_ms,
        error: Some(error),
    }
}

async fn git_capture(workdir: &Path, args: &[&str]) -> String {
    let output = tokio::process::Command::new("git")
        .args(args)
        .current_dir(workdir)
        .stdin(std::process::Stdio::null())
        .output()
        .await;
    match output {
        Ok(output) if output.status.success() => cap_capture(&output.stdout),
        _ => String::new(),
    }
}

/// Run the detection table and gather git summaries.
pub async fn collect_evidence(workdir: &Path) -> Evidence {
    let commands = detect_verify_commands(workdir);
    let mut results = Vec::with_capacity(commands.len());
    for spec in &commands {
        tracing::debug!(id = %spec.id, "running verification command");
        results.push(run_command(spec).await);
    }
    let git_status = git_capture(workdir, &["status", "--porcelain"]).await;
    let git_diff_stat = git_capture(workdir, &["diff", "--stat"]).await;
    Evidence { commands, results, git_status, git_diff_stat }
}

#[cfg(test)]
#[path = "evidence_tests.rs"]
mod tests;
