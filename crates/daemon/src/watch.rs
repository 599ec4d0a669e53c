// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task cancellation watcher.
//!
//! Polls the task service while a claim executes and flips when the
//! remote record is cancelled out from under the worker (status moved to
//! a terminal state by someone else). Daemon shutdown is wired in through
//! the same watcher so children die exactly once, through one path.

use agx_client::TaskServiceClient;
use agx_core::TaskStatus;
use agx_runner::{CancellationWatcher, ManualWatcher, RunnerError, Subscription};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Watcher combining remote-cancel polling with daemon shutdown.
pub struct TaskCancelWatcher {
    inner: ManualWatcher,
    poller: Mutex<Option<tokio::task::JoinHandle<()>>>,
    client: TaskServiceClient,
    task_id: String,
    shutdown: CancellationToken,
}

impl TaskCancelWatcher {
    pub fn new(
        client: TaskServiceClient,
        task_id: impl Into<String>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner: ManualWatcher::new(),
            poller: Mutex::new(None),
            client,
            task_id: task_id.into(),
            shutdown,
        })
    }

    fn spawn_poller(self: &Arc<Self>) {
        let watcher = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = watcher.shutdown.cancelled() => {
                        watcher.inner.cancel("daemon shutdown");
                        break;
                    }
                    _ = tokio::time::sleep(POLL_INTERVAL) => {
                        match watcher.client.get_task(&watcher.task_id).await {
                            Ok(task) if matches!(task.status, TaskStatus::Failed) => {
                                watcher.inner.cancel("task cancelled remotely");
                                break;
                            }
                            Ok(_) => {}
                            Err(error) => {
                                tracing::debug!(error = %error, "cancel poll failed");
                            }
                        }
                    }
                }
            }
        });
        *self.poller.lock() = Some(handle);
    }

    /// Start polling. Call after registering callbacks.
    pub fn start_polling(self: &Arc<Self>) {
        self.inner.start();
        self.spawn_poller();
    }
}

impl CancellationWatcher for TaskCancelWatcher {
    fn start(&self) {
        self.inner.start();
    }

    fn on_cancel(&self, callback: Box<dyn FnOnce(String) + Send>) -> Subscription {
        self.inner.on_cancel(callback)
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.inner.unsubscribe(subscription)
    }

    fn check(&self) -> Result<(), RunnerError> {
        if self.shutdown.is_cancelled() {
            self.inner.cancel("daemon shutdown");
        }
        self.inner.check()
    }

    fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    fn reason(&self) -> Option<String> {
        self.inner.reason()
    }

    fn destroy(&self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }
        self.inner.destroy();
    }
}
