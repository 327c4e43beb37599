//! Git invocation failures.
//!
//! None of these abort a scan; callers fold them into empty or zero values.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitFailure {
    /// The process could not be started (missing binary, bad working directory)
    Spawn(String),
    /// Non-zero exit; `output` is stderr, or stdout when stderr was empty
    Exited { code: Option<i32>, output: String },
    /// Killed after exceeding its time limit
    TimedOut { timeout: Duration },
}

impl GitFailure {
    /// Text captured from the failed command, empty when nothing was captured.
    pub fn output(&self) -> &str {
        match self {
            GitFailure::Exited { output, .. } => output,
            GitFailure::Spawn(_) | GitFailure::TimedOut { .. } => "",
        }
    }
}

impl std::fmt::Display for GitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitFailure::Spawn(msg) => write!(f, "failed to run git: {msg}"),
            GitFailure::Exited {
                code: Some(code),
                output,
            } => write!(f, "git exited with code {code}: {}", output.trim()),
            GitFailure::Exited { code: None, output } => {
                write!(f, "git terminated by signal: {}", output.trim())
            }
            GitFailure::TimedOut { timeout } => {
                write!(f, "git timed out after {}s", timeout.as_secs())
            }
        }
    }
}

impl std::error::Error for GitFailure {}
