//! Git access.
//!
//! All repository data comes from running `git` as a subprocess. The
//! [`GitRunner`] trait is the single seam for that: production code uses
//! [`SystemGit`], tests substitute canned output.

use std::path::Path;
use std::time::Duration;

use crate::shell_exec::Cmd;

mod error;
mod repository;
mod worktree;

pub use error::GitFailure;
pub use repository::{
    AheadBehind, BranchEntry, ChangedFile, LastCommit, LogEntry, RepoDetails, Repository,
    WorkingTreeCounts, parse_status_counts, parse_timestamps,
};
pub use worktree::{
    MergeStatus, WorktreeEntry, classify_merge, format_age, list_worktrees, parse_worktree_line,
    path_age,
};

/// Limit for read-only queries.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);
/// Limit for `git worktree add`.
pub const WORKTREE_ADD_TIMEOUT: Duration = Duration::from_secs(20);
/// Limit for `git worktree remove`.
pub const WORKTREE_REMOVE_TIMEOUT: Duration = Duration::from_secs(15);
/// Limit for merges and the named repository actions (pull, fetch, ...).
pub const MUTATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Decoded, trimmed output of one git invocation.
///
/// On failure `text` holds the error stream (or stdout when stderr was
/// empty), or nothing if no output could be captured.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommandResult {
    pub succeeded: bool,
    pub text: String,
}

/// Runs git subcommands against a working directory.
///
/// Implementations never panic on command failure; every failure is a
/// [`GitFailure`]. `Sync` is required because the scanner fans work out over
/// a thread pool that shares one runner.
pub trait GitRunner: Sync {
    /// Run `git <args>` in `dir`, returning raw stdout on a zero exit.
    fn execute(&self, args: &[&str], dir: &Path, timeout: Duration) -> Result<String, GitFailure>;

    /// Run and fold the outcome into a [`CommandResult`].
    fn run(&self, args: &[&str], dir: &Path, timeout: Duration) -> CommandResult {
        match self.execute(args, dir, timeout) {
            Ok(stdout) => CommandResult {
                succeeded: true,
                text: trim_output(&stdout),
            },
            Err(failure) => {
                if matches!(failure, GitFailure::TimedOut { .. }) {
                    log::warn!("git {} in {}: {failure}", args.join(" "), dir.display());
                } else {
                    log::debug!("git {} in {}: {failure}", args.join(" "), dir.display());
                }
                CommandResult {
                    succeeded: false,
                    text: failure.output().trim().to_string(),
                }
            }
        }
    }

    /// Run and return the output, or an empty string on any failure.
    ///
    /// For call sites where "no output" and "command failed" mean the same thing.
    fn run_text(&self, args: &[&str], dir: &Path, timeout: Duration) -> String {
        let result = self.run(args, dir, timeout);
        if result.succeeded {
            result.text
        } else {
            String::new()
        }
    }
}

/// [`GitRunner`] backed by the `git` binary on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl GitRunner for SystemGit {
    fn execute(&self, args: &[&str], dir: &Path, timeout: Duration) -> Result<String, GitFailure> {
        let context = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());

        let output = Cmd::new("git")
            .args(args.iter().copied())
            .current_dir(dir)
            .context(context)
            .timeout(timeout)
            .run()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::TimedOut => GitFailure::TimedOut { timeout },
                _ => GitFailure::Spawn(e.to_string()),
            })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            stderr.into_owned()
        };
        Err(GitFailure::Exited {
            code: output.status.code(),
            output: text,
        })
    }
}

/// Trim surrounding blank lines and trailing whitespace.
///
/// Leading spaces on the first line are kept: in `status --porcelain` output
/// they are the (empty) staged column.
pub fn trim_output(text: &str) -> String {
    text.trim_end().trim_start_matches(['\n', '\r']).to_string()
}
