//! Single-fact repository queries.
//!
//! Every method here degrades instead of failing: a query whose command
//! fails yields an empty string, zero, or an empty list. Higher layers
//! decide what "missing" means for them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use super::{CommandResult, GitRunner, READ_TIMEOUT};

/// Field separator for formatted log queries.
const FIELD_SEP: &str = "|||";

/// Hash of the empty tree, used to diff against "before the first commit".
const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Most files `recent_files` reports.
const RECENT_FILES_CAP: usize = 20;

/// Staged/unstaged/untracked counts from `git status --porcelain`.
///
/// A partially staged file counts as both staged and unstaged.
#[derive(Serialize, Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkingTreeCounts {
    pub is_dirty: bool,
    pub staged: usize,
    pub unstaged: usize,
    pub untracked: usize,
}

/// Commits ahead of / behind the upstream tracking branch.
#[derive(Serialize, Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AheadBehind {
    pub ahead: usize,
    pub behind: usize,
}

/// Metadata of the most recent commit.
#[derive(Serialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct LastCommit {
    pub message: String,
    pub relative_time: String,
    pub short_hash: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub hash: String,
    pub message: String,
    pub date: String,
    pub author: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct BranchEntry {
    pub name: String,
    pub is_current: bool,
}

/// A path touched by recent commits, with its first status letter (M/A/D/R/...).
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ChangedFile {
    pub status: char,
    pub path: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RepoDetails {
    pub branches: Vec<String>,
    pub commits: Vec<LogEntry>,
}

/// A repository directory plus the runner used to query it.
#[derive(Clone)]
pub struct Repository<'a> {
    runner: &'a dyn GitRunner,
    path: PathBuf,
}

impl std::fmt::Debug for Repository<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .finish()
    }
}

impl<'a> Repository<'a> {
    pub fn at(runner: &'a dyn GitRunner, path: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory name, used as the repository's display name.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Whether a `.git` entry (directory, or file for linked worktrees) exists.
    pub fn has_git_metadata(&self) -> bool {
        self.path.join(".git").exists()
    }

    /// Run a read-only query; empty on failure.
    pub fn read(&self, args: &[&str]) -> String {
        self.runner.run_text(args, &self.path, READ_TIMEOUT)
    }

    /// Run any command, keeping the success flag.
    pub fn run(&self, args: &[&str], timeout: Duration) -> CommandResult {
        self.runner.run(args, &self.path, timeout)
    }

    /// Abbreviated name of HEAD: a branch name, the literal `HEAD` when
    /// detached, or `None` when HEAD cannot be resolved (no commits yet).
    pub fn head_ref(&self) -> Option<String> {
        let head = self.read(&["rev-parse", "--abbrev-ref", "HEAD"]);
        (!head.is_empty()).then_some(head)
    }

    /// Current branch name; empty if detached or unresolvable.
    pub fn current_branch(&self) -> String {
        match self.head_ref() {
            Some(head) if head != "HEAD" => head,
            _ => String::new(),
        }
    }

    /// Resolve a ref to its commit hash; empty if it doesn't resolve.
    pub fn resolve_sha(&self, reference: &str, short: bool) -> String {
        if reference.is_empty() {
            return String::new();
        }
        if short {
            self.read(&["rev-parse", "--short", reference])
        } else {
            self.read(&["rev-parse", reference])
        }
    }

    pub fn working_tree_status(&self) -> WorkingTreeCounts {
        parse_status_counts(&self.read(&["status", "--porcelain"]))
    }

    /// Ahead/behind against the branch's upstream; `(0, 0)` without one.
    pub fn ahead_behind(&self, branch: &str) -> AheadBehind {
        let range = format!("{branch}...@{{u}}");
        parse_ahead_behind(&self.read(&["rev-list", "--left-right", "--count", &range]))
    }

    pub fn last_commit(&self) -> LastCommit {
        let format = format!("--pretty=format:%s{FIELD_SEP}%ar{FIELD_SEP}%H");
        parse_last_commit(&self.read(&["log", "-1", &format]))
    }

    /// Committer timestamp of HEAD; 0 when there is none.
    pub fn last_commit_epoch(&self) -> i64 {
        let out = self.read(&["log", "-1", "--pretty=format:%ct"]);
        if !out.is_empty() && out.bytes().all(|b| b.is_ascii_digit()) {
            out.parse().unwrap_or(0)
        } else {
            0
        }
    }

    pub fn stash_count(&self) -> usize {
        self.read(&["stash", "list"]).lines().count()
    }

    /// Local branches whose tips are reachable from `target`.
    pub fn merged_branches(&self, target: &str) -> Vec<String> {
        self.read(&["branch", "--merged", target, "--format=%(refname:short)"])
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Committer timestamps of every commit on HEAD since `since`
    /// (anything `git log --since` accepts, e.g. `2025-01-01` or `1 year ago`).
    pub fn commit_timestamps_since(&self, since: &str) -> Vec<i64> {
        let since = format!("--since={since}");
        parse_timestamps(&self.read(&["log", &since, "--pretty=format:%ct"]))
    }

    pub fn recent_log(&self, limit: usize) -> Vec<LogEntry> {
        let limit = format!("-{limit}");
        let format = format!("--pretty=format:%H{FIELD_SEP}%s{FIELD_SEP}%cr{FIELD_SEP}%an");
        parse_log_entries(&self.read(&["log", &limit, &format]))
    }

    /// The `limit` most recently committed-to local branches.
    pub fn recent_branches(&self, limit: usize) -> Vec<BranchEntry> {
        let count = format!("--count={limit}");
        let out = self.read(&[
            "for-each-ref",
            "--sort=-committerdate",
            &count,
            "--format=%(HEAD)%(refname:short)",
            "refs/heads",
        ]);
        out.lines()
            .filter_map(|line| {
                let is_current = line.starts_with('*');
                let name = line.trim_start_matches('*').trim();
                (!name.is_empty()).then(|| BranchEntry {
                    name: name.to_string(),
                    is_current,
                })
            })
            .collect()
    }

    /// Files changed in the last `depth` commits. When history is shorter
    /// than `depth`, everything reachable from HEAD counts as changed.
    pub fn recent_files(&self, depth: usize) -> Vec<ChangedFile> {
        let range = format!("HEAD~{depth}..HEAD");
        let mut out = self.read(&["diff", "--name-status", &range]);
        if out.is_empty() {
            out = self.read(&["diff", "--name-status", EMPTY_TREE, "HEAD"]);
        }
        parse_name_status(&out)
    }

    pub fn details(&self) -> RepoDetails {
        let branches = self
            .read(&["branch"])
            .lines()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        RepoDetails {
            branches,
            commits: self.recent_log(10),
        }
    }
}

/// Count porcelain status lines.
///
/// Staged: first column in `MADRC`. Unstaged: second column in `MD`.
/// Untracked: lines starting with `??`.
pub fn parse_status_counts(output: &str) -> WorkingTreeCounts {
    let mut counts = WorkingTreeCounts {
        is_dirty: !output.is_empty(),
        ..Default::default()
    };
    for line in output.lines() {
        let bytes = line.as_bytes();
        if line.starts_with("??") {
            counts.untracked += 1;
            continue;
        }
        if bytes.first().is_some_and(|c| b"MADRC".contains(c)) {
            counts.staged += 1;
        }
        if bytes.get(1).is_some_and(|c| b"MD".contains(c)) {
            counts.unstaged += 1;
        }
    }
    counts
}

fn parse_ahead_behind(output: &str) -> AheadBehind {
    let mut parts = output.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(ahead), Some(behind), None) => match (ahead.parse(), behind.parse()) {
            (Ok(ahead), Ok(behind)) => AheadBehind { ahead, behind },
            _ => AheadBehind::default(),
        },
        _ => AheadBehind::default(),
    }
}

fn parse_last_commit(output: &str) -> LastCommit {
    if !output.contains(FIELD_SEP) {
        return LastCommit::default();
    }
    let mut parts = output.split(FIELD_SEP);
    LastCommit {
        message: parts.next().unwrap_or_default().to_string(),
        relative_time: parts.next().unwrap_or_default().to_string(),
        short_hash: parts
            .next()
            .map(|h| h.chars().take(7).collect())
            .unwrap_or_default(),
    }
}

/// One timestamp per line; lines that aren't plain integers are skipped.
pub fn parse_timestamps(output: &str) -> Vec<i64> {
    output
        .lines()
        .map(str::trim)
        .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|t| t.parse().ok())
        .collect()
}

fn parse_log_entries(output: &str) -> Vec<LogEntry> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(FIELD_SEP).collect();
            let [hash, message, date, author] = parts.as_slice() else {
                return None;
            };
            Some(LogEntry {
                hash: hash.chars().take(7).collect(),
                message: message.to_string(),
                date: date.to_string(),
                author: author.to_string(),
            })
        })
        .collect()
}

fn parse_name_status(output: &str) -> Vec<ChangedFile> {
    let mut seen = HashSet::new();
    output
        .lines()
        .filter_map(|line| {
            let (status, rest) = line.split_once('\t')?;
            let status = status.chars().next()?;
            // Renames and copies list "old<TAB>new"; report the new path
            let path = rest.rsplit('\t').next().unwrap_or(rest);
            seen.insert(path.to_string()).then(|| ChangedFile {
                status,
                path: path.to_string(),
            })
        })
        .take(RECENT_FILES_CAP)
        .collect()
}
