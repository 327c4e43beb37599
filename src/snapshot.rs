//! Per-repository snapshot.

use std::path::Path;

use serde::Serialize;

use crate::git::{GitRunner, Repository, WorktreeEntry, list_worktrees};

/// Everything the dashboard shows for one repository, computed in one pass.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RepoSnapshot {
    pub branch: String,
    pub is_dirty: bool,
    pub staged: usize,
    pub unstaged: usize,
    pub untracked: usize,
    pub ahead: usize,
    pub behind: usize,
    pub last_message: String,
    pub last_relative_time: String,
    pub last_short_hash: String,
    /// Committer timestamp of HEAD, 0 if unknown
    pub last_commit_epoch: i64,
    pub worktrees: Vec<WorktreeEntry>,
    pub stash_count: usize,
}

/// Snapshot the repository at `path`.
///
/// Returns `None` when `path` has no `.git` entry or HEAD doesn't resolve
/// (e.g. a freshly initialised repository without commits). Individual
/// fields degrade to empty/zero when their query fails.
pub fn snapshot(runner: &dyn GitRunner, path: &Path, now: i64) -> Option<RepoSnapshot> {
    let repo = Repository::at(runner, path);
    if !repo.has_git_metadata() {
        return None;
    }

    let branch = repo.head_ref()?;
    let status = repo.working_tree_status();
    let ahead_behind = repo.ahead_behind(&branch);
    let last = repo.last_commit();

    Some(RepoSnapshot {
        is_dirty: status.is_dirty,
        staged: status.staged,
        unstaged: status.unstaged,
        untracked: status.untracked,
        ahead: ahead_behind.ahead,
        behind: ahead_behind.behind,
        last_message: last.message,
        last_relative_time: last.relative_time,
        last_short_hash: last.short_hash,
        last_commit_epoch: repo.last_commit_epoch(),
        worktrees: list_worktrees(&repo, now),
        stash_count: repo.stash_count(),
        branch,
    })
}
