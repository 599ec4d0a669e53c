// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run index entries: the per-run summary posted with completions.

use crate::run::RunHandle;
use crate::StoreError;
use agx_core::{ArtifactManifestEntry, ManifestKind, RunIndexEntry};
use sha2::{Digest, Sha256};
use std::path::Path;

fn hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

fn local_uri(path: &Path) -> String {
    format!("local://{}{}", hostname(), path.display())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(64);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

fn manifest_entry(
    kind: ManifestKind,
    path: &Path,
    sha_max_bytes: u64,
) -> Result<Option<ArtifactManifestEntry>, StoreError> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    let bytes = metadata.len();
    // SHA-256 is omitted for files above the ceiling; hashing multi-MiB
    // tees on every iteration is not worth the stall.
    let sha256 = if bytes <= sha_max_bytes {
        let content = std::fs::read(path).map_err(|e| StoreError::io(path, e))?;
        Some(sha256_hex(&content))
    } else {
        None
    };
    Ok(Some(ArtifactManifestEntry { kind, key: local_uri(path), bytes, sha256 }))
}

fn walk_artifacts(
    dir: &Path,
    sha_max_bytes: u64,
    out: &mut Vec<ArtifactManifestEntry>,
) -> Result<(), StoreError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };
    let mut paths: Vec<_> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();
    for path in paths {
        if path.is_dir() {
            walk_artifacts(&path, sha_max_bytes, out)?;
        } else if let Some(entry) = manifest_entry(ManifestKind::Artifact, &path, sha_max_bytes)? {
            out.push(entry);
        }
    }
    Ok(())
}

/// Build the run index entry for a finalized sub-run.
pub fn build_run_index_entry(
    run: &RunHandle,
    sha_max_bytes: u64,
) -> Result<RunIndexEntry, StoreError> {
    let mut manifest = Vec::new();
    for (kind, name) in [
        (ManifestKind::Prompt, "prompt.md"),
        (ManifestKind::Output, "output.md"),
        (ManifestKind::Events, "events.ndjson"),
        (ManifestKind::Artifact, "decision.json"),
    ] {
        if let Some(entry) = manifest_entry(kind, &run.stage_dir().join(name), sha_max_bytes)? {
            manifest.push(entry);
        }
    }
    walk_artifacts(&run.artifacts_dir(), sha_max_bytes, &mut manifest)?;

    let meta = run.meta();
    Ok(RunIndexEntry {
        run_id: meta.run_id,
        stage: meta.stage,
        engine: meta.engine.clone(),
        model: meta.model.clone(),
        status: meta.status,
        created_at: meta.created_at.clone(),
        artifact_manifest: manifest,
    })
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
