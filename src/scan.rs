//! Repository discovery and the concurrent scanner.
//!
//! Every directory directly under the base path is a candidate; the scanner
//! snapshots all of them on a bounded rayon pool. One repository failing,
//! even by panicking, leaves its entry with `snapshot: None` and doesn't
//! affect the others.

use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use anyhow::Context;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::DashConfig;
use crate::git::GitRunner;
use crate::snapshot::{RepoSnapshot, snapshot};

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ProjectEntry {
    pub name: String,
    pub path: PathBuf,
    pub snapshot: Option<RepoSnapshot>,
    pub is_pinned: bool,
}

/// Candidate repository directories under `config.base_path`, sorted by name.
///
/// Excluded names and plain files are skipped. The directories need not be
/// repositories; the snapshot decides that.
pub fn discover_repos(config: &DashConfig) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(&config.base_path)
        .with_context(|| format!("cannot list {}", config.base_path.display()))?;

    let mut repos: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|entry| {
            let name = entry.file_name();
            !config.exclude.iter().any(|ex| name.as_os_str() == ex.as_str())
        })
        .map(|entry| entry.path())
        .collect();
    repos.sort();
    log::debug!("Discovered {} candidate repositories", repos.len());
    Ok(repos)
}

/// Contents of the repository's `README.md`, matched case-insensitively in
/// its top-level directory.
pub fn read_readme(repo_dir: &Path) -> anyhow::Result<Option<String>> {
    let entries =
        std::fs::read_dir(repo_dir).with_context(|| format!("cannot list {}", repo_dir.display()))?;
    let Some(path) = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .find(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case("readme.md"))
        .map(|entry| entry.path())
    else {
        return Ok(None);
    };
    let content =
        std::fs::read_to_string(&path).with_context(|| format!("cannot read {}", path.display()))?;
    Ok(Some(content))
}

/// Snapshot every path in parallel. One entry per input path, in input order.
pub fn scan_all(
    runner: &dyn GitRunner,
    paths: &[PathBuf],
    max_workers: usize,
    now: i64,
) -> anyhow::Result<Vec<ProjectEntry>> {
    let snapshots = fan_out(paths, max_workers, |path| snapshot(runner, path, now))?;
    Ok(paths
        .iter()
        .zip(snapshots)
        .map(|(path, snapshot)| ProjectEntry {
            name: dir_name(path),
            path: path.clone(),
            snapshot,
            is_pinned: false,
        })
        .collect())
}

/// Scan the base path and order the result for display: pinned first, then
/// by last commit, newest first. Entries without a snapshot trail their group.
pub fn list_projects(
    runner: &dyn GitRunner,
    config: &DashConfig,
    pinned: &BTreeSet<String>,
    now: i64,
) -> anyhow::Result<Vec<ProjectEntry>> {
    let repos = discover_repos(config)?;
    let mut projects = scan_all(runner, &repos, config.max_workers, now)?;
    for project in &mut projects {
        project.is_pinned = pinned.contains(&project.name);
    }
    sort_projects(&mut projects);
    Ok(projects)
}

pub fn sort_projects(projects: &mut [ProjectEntry]) {
    projects.sort_by_key(|p| {
        (
            !p.is_pinned,
            p.snapshot.is_none(),
            std::cmp::Reverse(p.snapshot.as_ref().map_or(0, |s| s.last_commit_epoch)),
        )
    });
}

/// Run `work` for every path on a pool of `min(paths, max_workers)` threads.
///
/// Results keep input order. A panicking work item yields `None`; only a
/// pool that can't be started is an error.
pub(crate) fn fan_out<R, F>(
    paths: &[PathBuf],
    max_workers: usize,
    work: F,
) -> anyhow::Result<Vec<Option<R>>>
where
    R: Send,
    F: Fn(&Path) -> Option<R> + Sync,
{
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let threads = paths.len().min(max_workers).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("repodeck-worker-{i}"))
        .build()
        .context("failed to start worker pool")?;

    Ok(pool.install(|| {
        paths
            .par_iter()
            .map(|path| match catch_unwind(AssertUnwindSafe(|| work(path))) {
                Ok(result) => result,
                Err(_) => {
                    log::warn!("Skipping {}: worker panicked", path.display());
                    None
                }
            })
            .collect()
    }))
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
