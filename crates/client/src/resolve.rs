// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identifier resolution.
//!
//! Accepted forms: numeric index into the last cached listing, full uuid,
//! exact slug, unique slug prefix, unique id prefix.

use crate::{ClientError, TaskServiceClient};
use agx_core::Task;

const MAX_CANDIDATES: usize = 5;

fn is_uuid(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == 5
        && [8, 4, 4, 4, 12]
            .iter()
            .zip(&parts)
            .all(|(len, part)| part.len() == *len && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Resolve an identifier against a task listing (pure part of resolution).
///
/// Applied in order: exact slug match, unique slug prefix, unique id
/// prefix. Multiple prefix matches are ambiguous; none is not found.
pub fn resolve_from_listing(identifier: &str, tasks: &[Task]) -> Result<String, ClientError> {
    if let Some(task) = tasks.iter().find(|t| t.slug == identifier) {
        return Ok(task.id.clone());
    }

    let slug_matches: Vec<&Task> =
        tasks.iter().filter(|t| t.slug.starts_with(identifier)).collect();
    match slug_matches.len() {
        1 => return Ok(slug_matches[0].id.clone()),
        n if n > 1 => {
            return Err(ClientError::Ambiguous {
                identifier: identifier.to_string(),
                candidates: slug_matches
                    .iter()
                    .take(MAX_CANDIDATES)
                    .map(|t| t.slug.clone())
                    .collect(),
            })
        }
        _ => {}
    }

    let id_matches: Vec<&Task> = tasks.iter().filter(|t| t.id.starts_with(identifier)).collect();
    match id_matches.len() {
        1 => Ok(id_matches[0].id.clone()),
        0 => Err(ClientError::TaskNotFound(identifier.to_string())),
        _ => Err(ClientError::Ambiguous {
            identifier: identifier.to_string(),
            candidates: id_matches.iter().take(MAX_CANDIDATES).map(|t| t.id.clone()).collect(),
        }),
    }
}

impl TaskServiceClient {
    /// Resolve a task identifier to its canonical id.
    pub async fn resolve_task_id(&self, identifier: &str) -> Result<String, ClientError> {
        let identifier = identifier.trim();

        // Numeric: 1-indexed lookup into the last cached listing.
        if !identifier.is_empty() && identifier.chars().all(|c| c.is_ascii_digit()) {
            let cached = self
                .cache()
                .map(|c| c.load())
                .transpose()?
                .flatten()
                .ok_or(ClientError::NoCachedTask)?;
            let index: usize = identifier
                .parse()
                .map_err(|_| ClientError::TaskNotFound(identifier.to_string()))?;
            return index
                .checked_sub(1)
                .and_then(|i| cached.get(i))
                .map(|t| t.id.clone())
                .ok_or_else(|| ClientError::TaskNotFound(identifier.to_string()));
        }

        // UUIDs pass through unchanged.
        if is_uuid(identifier) {
            return Ok(identifier.to_string());
        }

        // Exact slug endpoint first; then the listing heuristics.
        if let Some(task) = self.get_task_by_slug(identifier).await? {
            return Ok(task.id);
        }
        let tasks = self.list_tasks().await?;
        resolve_from_listing(identifier, &tasks)
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
