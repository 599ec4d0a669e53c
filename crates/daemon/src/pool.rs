// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The N-way claim/execute worker pool.

use agx_core::Task;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Queue poll backoff ceiling after repeated errors.
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Grace period before SIGKILL on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Source of queued tasks (the task service in production).
#[async_trait]
pub trait ClaimSource: Send + Sync {
    async fn poll(&self) -> Result<Option<Task>, String>;
}

/// Executes one claimed task to completion.
#[async_trait]
pub trait ClaimHandler: Send + Sync {
    async fn handle(&self, task: Task, stop: &CancellationToken);
}

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_workers: u32,
    pub poll_interval: Duration,
}

/// N concurrent claim/execute workers plus the orphan sweep.
pub struct WorkerPool<Q, H> {
    source: Arc<Q>,
    handler: Arc<H>,
    manager: agx_runner::ProcessManager,
    config: PoolConfig,
    stop: CancellationToken,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl<Q, H> WorkerPool<Q, H>
where
    Q: ClaimSource + 'static,
    H: ClaimHandler + 'static,
{
    pub fn new(
        source: Q,
        handler: H,
        manager: agx_runner::ProcessManager,
        config: PoolConfig,
    ) -> Self {
        Self {
            source: Arc::new(source),
            handler: Arc::new(handler),
            manager,
            config: PoolConfig {
                max_workers: config.max_workers.max(1),
                poll_interval: config.poll_interval.max(Duration::from_millis(200)),
            },
            stop: CancellationToken::new(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Token observers can use to request a graceful stop.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Run until stopped: workers poll and execute; on stop, spawned
    /// children are killed and in-flight executions are awaited.
    pub async fn run(&self) {
        let mut workers = Vec::with_capacity(self.config.max_workers as usize);
        for index in 0..self.config.max_workers {
            workers.push(self.spawn_worker(index));
        }
        let sweep = tokio::spawn(crate::sweep::orphan_sweep(
            self.manager.procs_dir().to_path_buf(),
            self.stop.clone(),
        ));

        // allSettled: a panicking worker must not tear down its peers.
        futures_util::future::join_all(workers).await;
        self.stop.cancel();
        let _ = sweep.await;

        self.manager.kill_all(SHUTDOWN_GRACE).await;
        tracing::info!("worker pool stopped");
    }

    fn spawn_worker(&self, index: u32) -> tokio::task::JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let handler = Arc::clone(&self.handler);
        let stop = self.stop.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let poll_interval = self.config.poll_interval;

        tokio::spawn(async move {
            let mut backoff = poll_interval;
            loop {
                if stop.is_cancelled() {
                    break;
                }
                match source.poll().await {
                    Ok(Some(task)) => {
                        backoff = poll_interval;
                        // No two workers run the same task concurrently.
                        let claimed = in_flight.lock().insert(task.id.clone());
                        if !claimed {
                            tracing::debug!(worker = index, task = %task.slug, "duplicate claim dropped");
                            continue;
                        }
                        let task_id = task.id.clone();
                        tracing::info!(worker = index, task = %task.slug, "claimed task");
                        handler.handle(task, &stop).await;
                        in_flight.lock().remove(&task_id);
                    }
                    Ok(None) => {
                        backoff = poll_interval;
                        sleep_or_stop(poll_interval, &stop).await;
                    }
                    Err(error) => {
                        tracing::warn!(worker = index, error = %error, "queue poll failed; backing off");
                        sleep_or_stop(backoff, &stop).await;
                        backoff = (backoff * 2).min(BACKOFF_MAX);
                    }
                }
            }
            tracing::debug!(worker = index, "worker exited");
        })
    }
}

async fn sleep_or_stop(duration: Duration, stop: &CancellationToken) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = stop.cancelled() => {}
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
