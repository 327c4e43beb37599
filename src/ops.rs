//! Mutating repository operations.
//!
//! Each operation is one git invocation (plus cleanup steps where noted),
//! never retried. Outcomes carry git's own output so callers can show it
//! verbatim.

use std::path::{Path, PathBuf};

use anyhow::bail;
use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::git::{
    MUTATE_TIMEOUT, READ_TIMEOUT, Repository, WORKTREE_ADD_TIMEOUT, WORKTREE_REMOVE_TIMEOUT,
    list_worktrees,
};

/// Named git actions that can be run against a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum GitAction {
    Pull,
    Fetch,
    Stash,
    StashPop,
    Reset,
    Clean,
    Log,
}

impl GitAction {
    pub fn args(self) -> &'static [&'static str] {
        match self {
            Self::Pull => &["pull"],
            Self::Fetch => &["fetch", "--all"],
            Self::Stash => &["stash"],
            Self::StashPop => &["stash", "pop"],
            Self::Reset => &["reset", "--hard", "HEAD"],
            Self::Clean => &["clean", "-fd"],
            Self::Log => &["log", "--oneline", "-10"],
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub output: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct WorktreeCreated {
    pub success: bool,
    pub output: String,
    pub path: PathBuf,
    pub branch: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct WorktreeRemoved {
    pub success: bool,
    pub output: String,
    pub branch_deleted: bool,
    pub branch_output: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct WorktreeMerged {
    pub success: bool,
    pub output: String,
    /// Branch the worktree was merged into; `None` if it couldn't be determined
    pub merged_into: Option<String>,
    pub cleanup_done: bool,
    pub cleanup_output: String,
}

pub fn run_action(repo: &Repository<'_>, action: GitAction) -> ActionOutcome {
    log::info!("Running {action} in {}", repo.name());
    let result = repo.run(action.args(), MUTATE_TIMEOUT);
    ActionOutcome {
        success: result.succeeded,
        output: result.text,
    }
}

/// Add a worktree at `<base_path>/<suffix>` on a new branch named `suffix`.
pub fn create_worktree(
    repo: &Repository<'_>,
    base_path: &Path,
    suffix: &str,
) -> anyhow::Result<WorktreeCreated> {
    let suffix = suffix.trim();
    if suffix.is_empty() {
        bail!("worktree suffix is required");
    }
    let path = base_path.join(suffix);
    let path_arg = path.to_string_lossy().into_owned();
    let result = repo.run(
        &["worktree", "add", path_arg.as_str(), "-b", suffix],
        WORKTREE_ADD_TIMEOUT,
    );
    Ok(WorktreeCreated {
        success: result.succeeded,
        output: result.text,
        branch: suffix.to_string(),
        path,
    })
}

/// Force-remove a worktree and prune. With `delete_branch`, also force-delete
/// `branch` once the worktree is gone.
pub fn remove_worktree(
    repo: &Repository<'_>,
    worktree_path: &str,
    branch: Option<&str>,
    delete_branch: bool,
) -> WorktreeRemoved {
    let removed = repo.run(
        &["worktree", "remove", "--force", worktree_path],
        WORKTREE_REMOVE_TIMEOUT,
    );
    if !removed.succeeded {
        return WorktreeRemoved {
            success: false,
            output: removed.text,
            branch_deleted: false,
            branch_output: String::new(),
        };
    }
    prune(repo);

    let (branch_deleted, branch_output) = match branch {
        Some(branch) if delete_branch && is_real_branch(branch) => delete(repo, branch),
        _ => (false, String::new()),
    };
    WorktreeRemoved {
        success: true,
        output: removed.text,
        branch_deleted,
        branch_output,
    }
}

/// Merge `branch` into the repository's current branch. With `cleanup`,
/// remove the worktree afterwards (and the branch, with `delete_branch`).
pub fn merge_worktree(
    repo: &Repository<'_>,
    branch: &str,
    worktree_path: &str,
    cleanup: bool,
    delete_branch: bool,
) -> WorktreeMerged {
    let failed = |output: String, merged_into: Option<String>| WorktreeMerged {
        success: false,
        output,
        merged_into,
        cleanup_done: false,
        cleanup_output: String::new(),
    };

    let current = repo.current_branch();
    if current.is_empty() {
        return failed("Cannot determine current branch".to_string(), None);
    }
    if branch == current {
        return failed(format!("Cannot merge '{branch}' into itself"), Some(current));
    }

    let merged = repo.run(&["merge", branch], MUTATE_TIMEOUT);
    if !merged.succeeded {
        return failed(merged.text, Some(current));
    }

    let mut cleanup_output = String::new();
    let mut cleanup_done = false;
    if cleanup {
        let removed = repo.run(
            &["worktree", "remove", "--force", worktree_path],
            WORKTREE_REMOVE_TIMEOUT,
        );
        if !removed.succeeded {
            log::warn!("Merged {branch} but could not remove {worktree_path}: {}", removed.text);
        }
        cleanup_done = removed.succeeded;
        prune(repo);
        if delete_branch {
            cleanup_output = delete(repo, branch).1;
        }
    }

    WorktreeMerged {
        success: true,
        output: merged.text,
        merged_into: Some(current),
        cleanup_done,
        cleanup_output,
    }
}

/// Default name for a new worktree branch: `fix-<Mon><DD>-<HHMM>-<n>`, where
/// `n` is the number of existing linked worktrees.
pub fn suggest_branch_name<Tz: TimeZone>(now: &DateTime<Tz>, worktree_count: usize) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let counter = worktree_count.saturating_sub(1);
    format!("fix-{}-{counter}", now.format("%b%d-%H%M"))
}

/// [`suggest_branch_name`] for `repo` at `now`.
pub fn suggested_branch<Tz: TimeZone>(repo: &Repository<'_>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let count = list_worktrees(repo, now.timestamp()).len();
    suggest_branch_name(now, count)
}

fn prune(repo: &Repository<'_>) {
    let result = repo.run(&["worktree", "prune"], READ_TIMEOUT);
    if !result.succeeded {
        log::debug!("worktree prune failed in {}: {}", repo.name(), result.text);
    }
}

fn delete(repo: &Repository<'_>, branch: &str) -> (bool, String) {
    let result = repo.run(&["branch", "-D", branch], READ_TIMEOUT);
    (result.succeeded, result.text)
}

/// Worktree rows use `N/A` as a placeholder branch; never pass it to git.
fn is_real_branch(branch: &str) -> bool {
    !branch.is_empty() && branch != "N/A"
}
