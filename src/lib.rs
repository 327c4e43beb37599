//! Derived state for a directory of git repositories.
//!
//! Per-repository snapshots ([`snapshot`]), worktree inventories with merge
//! classification ([`git`]), a concurrent scanner over a base directory
//! ([`scan`]) and commit-activity statistics ([`activity`]). Everything is
//! recomputed from git on each call.

pub mod activity;
pub mod config;
pub mod git;
pub mod ops;
pub mod scan;
pub mod shell_exec;
pub mod snapshot;
pub mod store;
pub mod utils;
