// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for cancellation watchers

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn check_errors_after_cancel() {
    let watcher = ManualWatcher::new();
    watcher.start();
    assert!(watcher.check().is_ok());
    watcher.cancel("operator stop");
    match watcher.check() {
        Err(RunnerError::Cancelled { reason }) => assert_eq!(reason, "operator stop"),
        other => panic!("expected Cancelled, got {other:?}"),
    }
    assert!(watcher.is_cancelled());
    assert_eq!(watcher.reason().as_deref(), Some("operator stop"));
}

#[test]
fn callbacks_fire_exactly_once() {
    let watcher = ManualWatcher::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    watcher.on_cancel(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    watcher.start();
    watcher.cancel("first");
    watcher.cancel("second");
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(watcher.reason().as_deref(), Some("first"));
}

#[test]
fn late_registration_fires_immediately() {
    let watcher = ManualWatcher::new();
    watcher.start();
    watcher.cancel("early");
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    watcher.on_cancel(Box::new(move |reason| {
        assert_eq!(reason, "early");
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn unsubscribe_prevents_delivery() {
    let watcher = ManualWatcher::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let subscription = watcher.on_cancel(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    watcher.unsubscribe(subscription);
    watcher.cancel("ignored");
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
