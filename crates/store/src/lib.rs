// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agx-store: Filesystem-backed store of projects, tasks, runs, and locks.
//!
//! Layout under the store root:
//!
//! ```text
//! <projectSlug>/
//!   state.json
//!   <taskSlug>/
//!     state.json
//!     working_set.md
//!     task.lock
//!     runs/
//!       <runContainer>/
//!         plan/plan.md
//!         <stage>/
//!           meta.json prompt.md output.md decision.json events.ndjson
//!           artifacts/...
//! ```

mod error;
mod fsutil;
mod index;
mod lock;
mod project;
mod run;
mod slug;
mod task;

pub use error::StoreError;
pub use fsutil::{append_ndjson_line, write_atomic};
pub use index::build_run_index_entry;
pub use lock::TaskLock;
pub use run::{CreateRun, IncompleteRun, RunHandle};
pub use slug::slugify;
pub use task::{CreateTask, TaskState};

use std::path::{Path, PathBuf};

/// Filesystem-backed artifact store rooted at a projects directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `~/.agx/projects` (or `$AGX_HOME/projects`).
    pub fn open_default() -> Result<Self, StoreError> {
        let home = agx_home()?;
        Ok(Self::new(home.join("projects")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, project_slug: &str) -> PathBuf {
        self.root.join(project_slug)
    }

    pub fn task_dir(&self, project_slug: &str, task_slug: &str) -> PathBuf {
        self.project_dir(project_slug).join(task_slug)
    }

    pub fn runs_dir(&self, project_slug: &str, task_slug: &str) -> PathBuf {
        self.task_dir(project_slug, task_slug).join("runs")
    }
}

/// Resolve the agx home directory: `$AGX_HOME` > `~/.agx`.
pub fn agx_home() -> Result<PathBuf, StoreError> {
    if let Ok(dir) = std::env::var("AGX_HOME") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::home_dir().map(|h| h.join(".agx")).ok_or(StoreError::NoHomeDir)
}
