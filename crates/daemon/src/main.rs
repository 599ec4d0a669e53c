// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! agxd: the agx orchestrator daemon.

use agx_client::{ClientConfig, TaskCache, TaskServiceClient};
use agx_core::{Clock, Config, SystemClock};
use agx_daemon::{
    init_tracing, recover_incomplete_runs, AgxHome, ClaimContext, DaemonClaimHandler,
    PoolConfig, ServiceClaimSource, WorkerPool,
};
use agx_runner::ProcessManager;
use agx_store::ArtifactStore;
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

/// Task orchestrator daemon: claims queued tasks and drives them through
/// the execute/verify loop.
#[derive(Debug, Parser)]
#[command(name = "agxd", version)]
struct Args {
    /// Worker pool size (overrides AGX_DAEMON_MAX_CONCURRENT).
    #[arg(long)]
    max_concurrent: Option<u32>,

    /// Queue poll interval in milliseconds (overrides AGX_DAEMON_POLL_MS).
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Task service base URL (overrides AGX_CLOUD_URL).
    #[arg(long)]
    cloud_url: Option<String>,

    /// Working repository the verification evidence inspects.
    #[arg(long)]
    workdir: Option<std::path::PathBuf>,
}

async fn wait_signal(signal: Option<&mut tokio::signal::unix::Signal>) {
    match signal {
        Some(signal) => {
            signal.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load();
    if let Some(max) = args.max_concurrent {
        config.max_workers = max.max(1);
    }
    if let Some(poll_ms) = args.poll_ms {
        config.poll_interval = Duration::from_millis(poll_ms.max(200));
    }
    if let Some(url) = args.cloud_url {
        config.cloud_url = url;
    }

    let home = Arc::new(AgxHome::open_exclusive().context("daemon already running?")?);
    std::fs::create_dir_all(home.logs_dir())
        .with_context(|| format!("creating {}", home.logs_dir().display()))?;
    let _log_guard = init_tracing(&home.logs_dir());

    tracing::info!(
        workers = config.max_workers,
        poll_ms = config.poll_interval.as_millis() as u64,
        cloud_url = %config.cloud_url,
        "agxd starting"
    );
    home.audit("daemon started");

    let store = ArtifactStore::new(home.projects_dir());
    let recovered = recover_incomplete_runs(&store, &SystemClock.now_iso());
    if recovered > 0 {
        tracing::info!(recovered, "recovered incomplete runs from previous daemon");
    }

    let client = TaskServiceClient::new(
        ClientConfig::from_env(&config),
        Some(TaskCache::new(home.task_cache_path())),
    );
    let manager = ProcessManager::new(home.procs_dir());

    let workdir = match args.workdir {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolving working directory")?,
    };

    let handler = DaemonClaimHandler::new(ClaimContext {
        client: client.clone(),
        store,
        manager: manager.clone(),
        config: config.clone(),
        home: home.clone(),
        workdir,
    });
    let pool = Arc::new(WorkerPool::new(
        ServiceClaimSource { client },
        handler,
        manager,
        PoolConfig { max_workers: config.max_workers, poll_interval: config.poll_interval },
    ));

    // SIGINT/SIGTERM flip the stop token; workers drain and children die.
    let stop = pool.stop_token();
    tokio::spawn(async move {
        let mut sigint =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
                .map_err(|e| tracing::error!(error = %e, "sigint handler failed"))
                .ok();
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .map_err(|e| tracing::error!(error = %e, "sigterm handler failed"))
                .ok();
        tokio::select! {
            _ = wait_signal(sigint.as_mut()) => {}
            _ = wait_signal(sigterm.as_mut()) => {}
        }
        tracing::info!("shutdown signal received");
        stop.cancel();
    });

    pool.run().await;
    home.audit("daemon stopped");
    Ok(())
}
