// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation watchers.
//!
//! A watcher is a cancellation signal source the runner and iteration
//! engine consult. Callbacks must be registered before `start()` so
//! delivery is deterministic; a callback registered after cancellation
//! fires immediately.

use crate::RunnerError;
use parking_lot::Mutex;
use std::sync::Arc;

type CancelFn = Box<dyn FnOnce(String) + Send>;

/// Handle for a registered cancel callback. Dropping does not unregister;
/// call [`Subscription::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

/// Cancellation signal source, treated as opaque by the runner.
pub trait CancellationWatcher: Send + Sync {
    /// Begin watching. Callbacks registered after this may race delivery.
    fn start(&self);

    /// Register a cancel callback; returns an unsubscribe handle.
    fn on_cancel(&self, callback: CancelFn) -> Subscription;

    fn unsubscribe(&self, subscription: Subscription);

    /// Error with [`RunnerError::Cancelled`] when cancellation was requested.
    fn check(&self) -> Result<(), RunnerError>;

    fn is_cancelled(&self) -> bool;

    fn reason(&self) -> Option<String>;

    /// Stop watching and drop registered callbacks.
    fn destroy(&self);
}

#[derive(Default)]
struct ManualState {
    started: bool,
    cancelled: Option<String>,
    callbacks: Vec<(u64, CancelFn)>,
    next_subscription: u64,
}

/// In-process watcher flipped by an explicit [`ManualWatcher::cancel`] call.
///
/// Used by tests and by the daemon's signal wiring; the task-service
/// polling watcher lives with the daemon, where the client is available.
#[derive(Clone, Default)]
pub struct ManualWatcher {
    state: Arc<Mutex<ManualState>>,
}

impl ManualWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the watcher. Fires registered callbacks exactly once.
    pub fn cancel(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let callbacks = {
            let mut state = self.state.lock();
            if state.cancelled.is_some() {
                return;
            }
            state.cancelled = Some(reason.clone());
            std::mem::take(&mut state.callbacks)
        };
        for (_, callback) in callbacks {
            callback(reason.clone());
        }
    }
}

impl CancellationWatcher for ManualWatcher {
    fn start(&self) {
        self.state.lock().started = true;
    }

    fn on_cancel(&self, callback: CancelFn) -> Subscription {
        let mut state = self.state.lock();
        if let Some(reason) = state.cancelled.clone() {
            drop(state);
            callback(reason);
            return Subscription(0);
        }
        let id = state.next_subscription + 1;
        state.next_subscription = id;
        state.callbacks.push((id, callback));
        Subscription(id)
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.state.lock().callbacks.retain(|(id, _)| *id != subscription.0);
    }

    fn check(&self) -> Result<(), RunnerError> {
        match self.state.lock().cancelled.clone() {
            Some(reason) => Err(RunnerError::Cancelled { reason }),
            None => Ok(()),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled.is_some()
    }

    fn reason(&self) -> Option<String> {
        self.state.lock().cancelled.clone()
    }

    fn destroy(&self) {
        let mut state = self.state.lock();
        state.started = false;
        state.callbacks.clear();
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
