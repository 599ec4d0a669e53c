// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider process spawning and supervision.

use crate::manager::ProcessManager;
use crate::watcher::CancellationWatcher;
use crate::RunnerError;
use agx_core::RunEvent;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;

/// Bound on the stdout/stderr tails carried in trace events.
const TAIL_MAX_CHARS: usize = 4_000;

/// Grace period between SIGTERM and SIGKILL on cancellation.
const CANCEL_GRACE: Duration = Duration::from_millis(500);

/// One provider invocation.
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    /// Full argv; `args[0]` is the program. No shell interpretation.
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Human label for heartbeats and logs.
    pub label: String,
    pub cwd: Option<std::path::PathBuf>,
}

/// Captured output of a zero-exit provider.
#[derive(Debug, Clone)]
pub struct ProviderOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

/// Stream and trace handlers for one invocation.
#[derive(Default)]
pub struct RunnerHooks {
    pub on_stdout: Option<Box<dyn FnMut(&str) + Send>>,
    pub on_stderr: Option<Box<dyn FnMut(&str) + Send>>,
    pub on_trace: Option<Box<dyn FnMut(RunEvent) + Send>>,
}

impl RunnerHooks {
    fn trace(&mut self, event: RunEvent) {
        if let Some(on_trace) = &mut self.on_trace {
            on_trace(event);
        }
    }
}

fn iso_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Strip embedded NUL bytes; they cannot cross `execve`.
fn sanitize_args(args: &[String]) -> Vec<String> {
    args.iter().map(|a| a.replace('\0', "")).collect()
}

fn push_bounded(tail: &mut String, chunk: &str) {
    tail.push_str(chunk);
    if tail.len() > TAIL_MAX_CHARS {
        let mut cut = tail.len() - TAIL_MAX_CHARS;
        while !tail.is_char_boundary(cut) {
            cut += 1;
        }
        tail.drain(..cut);
    }
}

enum Outcome {
    Exited(std::process::ExitStatus),
    WaitFailed(std::io::Error),
    TimedOut,
    Cancelled(String),
}

struct Streams {
    stdout: String,
    stderr: String,
    stdout_tail: String,
    stderr_tail: String,
}

/// Spawn a provider and supervise it to completion.
///
/// Resolves to the captured output when the child exits zero. Non-zero
/// exit, timeout (SIGKILL), and cancellation (SIGTERM, 500 ms grace,
/// SIGKILL) fail with the corresponding [`RunnerError`]. Every path emits
/// its trace events through `hooks.on_trace`.
pub async fn run_provider(
    spec: &ProviderSpec,
    hooks: &mut RunnerHooks,
    watcher: Option<&dyn CancellationWatcher>,
    manager: Option<&ProcessManager>,
) -> Result<ProviderOutput, RunnerError> {
    if let Some(watcher) = watcher {
        watcher.check()?;
    }

    let args = sanitize_args(&spec.args);
    let (program, rest) = args.split_first().ok_or_else(|| RunnerError::Spawn {
        program: String::new(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
    })?;

    let mut command = tokio::process::Command::new(program);
    command
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }

    tracing::info!(label = %spec.label, program = %program, "spawning provider");
    let started = Instant::now();
    let started_at = iso_now();
    let mut child = command.spawn().map_err(|source| {
        hooks.trace(RunEvent::ProviderError { error: source.to_string(), finished_at: iso_now() });
        RunnerError::Spawn { program: program.clone(), source }
    })?;
    let pid = child.id();

    hooks.trace(RunEvent::ProviderStart {
        pid,
        args: args.clone(),
        timeout_ms: spec.timeout.as_millis() as u64,
        started_at: started_at.clone(),
    });
    if let (Some(manager), Some(pid)) = (manager, pid) {
        manager.register(pid, &spec.label, &started_at);
    }

    // Cancellation rides a oneshot registered before supervision begins.
    let (cancel_tx, mut cancel_rx) = tokio::sync::oneshot::channel::<String>();
    let subscription = watcher.map(|w| {
        let mut tx = Some(cancel_tx);
        w.on_cancel(Box::new(move |reason| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(reason);
            }
        }))
    });

    let mut streams = Streams {
        stdout: String::new(),
        stderr: String::new(),
        stdout_tail: String::new(),
        stderr_tail: String::new(),
    };

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let mut stdout_buf = vec![0u8; 8192];
    let mut stderr_buf = vec![0u8; 8192];
    let deadline = tokio::time::sleep(spec.timeout);
    tokio::pin!(deadline);

    let outcome = loop {
        tokio::select! {
            read = read_some(&mut stdout_pipe, &mut stdout_buf) => {
                match read {
                    Some(n) if n > 0 => {
                        let chunk = String::from_utf8_lossy(&stdout_buf[..n]).into_owned();
                        streams.stdout.push_str(&chunk);
                        push_bounded(&mut streams.stdout_tail, &chunk);
                        if let Some(on_stdout) = &mut hooks.on_stdout {
                            on_stdout(&chunk);
                        }
                    }
                    _ => stdout_pipe = None,
                }
            }
            read = read_some(&mut stderr_pipe, &mut stderr_buf) => {
                match read {
                    Some(n) if n > 0 => {
                        let chunk = String::from_utf8_lossy(&stderr_buf[..n]).into_owned();
                        streams.stderr.push_str(&chunk);
                        push_bounded(&mut streams.stderr_tail, &chunk);
                        if let Some(on_stderr) = &mut hooks.on_stderr {
                            on_stderr(&chunk);
                        }
                    }
                    _ => stderr_pipe = None,
                }
            }
            status = child.wait(), if stdout_pipe.is_none() && stderr_pipe.is_none() => {
                match status {
                    Ok(status) => break Outcome::Exited(status),
                    Err(error) => break Outcome::WaitFailed(error),
                }
            }
            _ = &mut deadline => break Outcome::TimedOut,
            reason = &mut cancel_rx => {
                break Outcome::Cancelled(reason.unwrap_or_else(|_| "cancelled".to_string()));
            }
        }
    };

    if let (Some(watcher), Some(subscription)) = (watcher, subscription) {
        watcher.unsubscribe(subscription);
    }
    if let (Some(manager), Some(pid)) = (manager, pid) {
        manager.deregister(pid);
    }

    let duration_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Outcome::Exited(status) => {
            let exit_code = status.code().unwrap_or(-1);
            tracing::info!(exit_code, duration_ms, "provider exited");
            hooks.trace(RunEvent::ProviderExit {
                exit_code,
                duration_ms,
                finished_at: iso_now(),
                stdout_tail: streams.stdout_tail,
                stderr_tail: streams.stderr_tail,
            });
            if exit_code == 0 {
                Ok(ProviderOutput { stdout: streams.stdout, stderr: streams.stderr, code: 0 })
            } else {
                Err(RunnerError::ExitedNonZero {
                    code: exit_code,
                    stdout: streams.stdout,
                    stderr: streams.stderr,
                })
            }
        }
        Outcome::WaitFailed(error) => {
            hooks.trace(RunEvent::ProviderError {
                error: error.to_string(),
                finished_at: iso_now(),
            });
            Err(RunnerError::Io(error))
        }
        Outcome::TimedOut => {
            tracing::warn!(duration_ms, "provider timed out; killing");
            let _ = child.start_kill();
            let _ = child.wait().await;
            hooks.trace(RunEvent::ProviderTimeout {
                timeout_ms: spec.timeout.as_millis() as u64,
                duration_ms,
                finished_at: iso_now(),
                stdout_tail: streams.stdout_tail.clone(),
                stderr_tail: streams.stderr_tail.clone(),
            });
            Err(RunnerError::Timeout {
                timeout_ms: spec.timeout.as_millis() as u64,
                stdout_tail: streams.stdout_tail,
                stderr_tail: streams.stderr_tail,
            })
        }
        Outcome::Cancelled(reason) => {
            tracing::info!(reason = %reason, "provider cancelled; terminating");
            terminate(&mut child, pid).await;
            hooks.trace(RunEvent::ProviderCancel {
                reason: reason.clone(),
                finished_at: iso_now(),
            });
            Err(RunnerError::Cancelled { reason })
        }
    }
}

async fn read_some(
    pipe: &mut Option<impl tokio::io::AsyncRead + Unpin>,
    buf: &mut [u8],
) -> Option<usize> {
    match pipe {
        Some(reader) => reader.read(buf).await.ok(),
        None => std::future::pending().await,
    }
}

/// SIGTERM, wait up to the grace period, then SIGKILL.
async fn terminate(child: &mut tokio::process::Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(pid as i32),
            nix::sys::signal::Signal::SIGTERM,
        );
    }
    let graceful = tokio::time::timeout(CANCEL_GRACE, child.wait()).await;
    if graceful.is_err() {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

/// Re-invoke [`run_provider`] up to `retries` additional times.
///
/// The runner itself never retries; this helper is the caller's opt-in.
/// Each attempt emits its own full trace. Cancellation is never retried.
pub async fn run_provider_with_retries(
    spec: &ProviderSpec,
    retries: u32,
    hooks: &mut RunnerHooks,
    watcher: Option<&dyn CancellationWatcher>,
    manager: Option<&ProcessManager>,
) -> Result<ProviderOutput, RunnerError> {
    let mut attempt = 0;
    loop {
        match run_provider(spec, hooks, watcher, manager).await {
            Ok(output) => return Ok(output),
            Err(error) if error.is_cancellation() => return Err(error),
            Err(error) => {
                if attempt >= retries {
                    return Err(error);
                }
                attempt += 1;
                tracing::warn!(attempt, error = %error, "provider attempt failed; retrying");
            }
        }
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
