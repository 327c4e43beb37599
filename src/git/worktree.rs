//! Worktree inventory and merge-status classification.

use std::path::Path;

use serde::Serialize;

use super::Repository;

/// Whether a worktree's branch has been folded back into a reference branch.
///
/// | Variant    | Meaning |
/// |------------|---------|
/// | NotApplicable | no branch, no reference, or the branch *is* the reference |
/// | Fresh      | same tip as the reference (never diverged) |
/// | Merged     | diverged, and the tip is now reachable from the reference |
/// | NotMerged  | has commits the reference doesn't |
/// | Error      | one of the two branches didn't resolve |
/// | Detached   | worktree is not on a branch |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum MergeStatus {
    #[serde(rename = "N/A")]
    #[strum(serialize = "N/A")]
    NotApplicable,
    #[serde(rename = "FRESH")]
    #[strum(serialize = "FRESH")]
    Fresh,
    #[serde(rename = "MERGED")]
    #[strum(serialize = "MERGED")]
    Merged,
    #[serde(rename = "NOT MERGED")]
    #[strum(serialize = "NOT MERGED")]
    NotMerged,
    #[serde(rename = "ERROR")]
    #[strum(serialize = "ERROR")]
    Error,
    #[serde(rename = "DETACHED")]
    #[strum(serialize = "DETACHED")]
    Detached,
}

impl MergeStatus {
    /// Display color name for UIs.
    pub fn color(self) -> &'static str {
        match self {
            Self::NotApplicable => "dim",
            Self::Fresh => "cyan",
            Self::Merged => "green",
            Self::NotMerged => "yellow",
            Self::Error | Self::Detached => "red",
        }
    }
}

/// One row of the worktree inventory.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: String,
    /// `None` when the worktree is on a detached HEAD
    pub branch: Option<String>,
    /// Empty for detached worktrees
    pub short_sha: String,
    pub status: MergeStatus,
    pub status_color: &'static str,
    pub age: String,
    pub is_primary: bool,
    pub parent_branch: String,
    pub parent_sha: String,
}

/// Classify `branch` against `parent`. First matching rule wins:
/// N/A, then ERROR (unresolvable), FRESH (same tip), MERGED, NOT MERGED.
pub fn classify_merge(repo: &Repository<'_>, branch: &str, parent: &str) -> MergeStatus {
    if branch.is_empty() || parent.is_empty() || branch == parent {
        return MergeStatus::NotApplicable;
    }

    let branch_sha = repo.resolve_sha(branch, false);
    let parent_sha = repo.resolve_sha(parent, false);
    if branch_sha.is_empty() || parent_sha.is_empty() {
        return MergeStatus::Error;
    }
    if branch_sha == parent_sha {
        return MergeStatus::Fresh;
    }

    if repo.merged_branches(parent).iter().any(|b| b == branch) {
        MergeStatus::Merged
    } else {
        MergeStatus::NotMerged
    }
}

/// Split one `git worktree list` line into its path and bracketed branch.
///
/// ```text
/// /src/app          1a2b3c4 [main]
/// /src/app-detached 1a2b3c4 (detached HEAD)
/// ```
pub fn parse_worktree_line(line: &str) -> Option<(String, Option<String>)> {
    let mut tokens = line.split_whitespace();
    let path = tokens.next()?;
    let branch = tokens
        .find(|t| t.len() > 2 && t.starts_with('[') && t.ends_with(']'))
        .map(|t| t[1..t.len() - 1].to_string());
    Some((path.to_string(), branch))
}

/// Every worktree of `repo`, in git's listing order (primary first).
///
/// The parent branch for all rows is the repository's current branch,
/// resolved once.
pub fn list_worktrees(repo: &Repository<'_>, now: i64) -> Vec<WorktreeEntry> {
    let output = repo.read(&["worktree", "list"]);
    if output.is_empty() {
        return Vec::new();
    }

    let parent_branch = repo.current_branch();
    let parent_sha = repo.resolve_sha(&parent_branch, true);

    output
        .lines()
        .filter_map(parse_worktree_line)
        .enumerate()
        .map(|(idx, (path, branch))| {
            let age = path_age(Path::new(&path), now);
            let (short_sha, status) = match &branch {
                Some(name) => (
                    repo.resolve_sha(name, true),
                    classify_merge(repo, name, &parent_branch),
                ),
                None => (String::new(), MergeStatus::Detached),
            };
            WorktreeEntry {
                path,
                branch,
                short_sha,
                status,
                status_color: status.color(),
                age,
                is_primary: idx == 0,
                parent_branch: parent_branch.clone(),
                parent_sha: parent_sha.clone(),
            }
        })
        .collect()
}

/// Largest whole unit of `elapsed_secs`: `Nm` under an hour, `Nh` under a
/// day, `Nd` under a week, otherwise `Nw`.
pub fn format_age(elapsed_secs: i64) -> String {
    let secs = elapsed_secs.max(0);
    if secs < 3_600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3_600)
    } else if secs < 604_800 {
        format!("{}d", secs / 86_400)
    } else {
        format!("{}w", secs / 604_800)
    }
}

/// Age of `path` by modification time, or `?` if it can't be read.
pub fn path_age(path: &Path, now: i64) -> String {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok());
    match modified {
        Some(mtime) => format_age(now - mtime.as_secs() as i64),
        None => "?".to_string(),
    }
}
