use repodeck::git::{MergeStatus, SystemGit};
use repodeck::snapshot::snapshot;

use crate::common::{DEFAULT_EPOCH, TestBase};

#[test]
fn test_directory_without_git_is_none() {
    let base = TestBase::new();
    let dir = base.plain_dir("not-a-repo");
    assert_eq!(snapshot(&SystemGit, &dir, DEFAULT_EPOCH), None);
}

#[test]
fn test_repository_without_commits_is_none() {
    let base = TestBase::new();
    let repo = base.repo("empty");
    assert_eq!(snapshot(&SystemGit, repo.path(), DEFAULT_EPOCH), None);
}

#[test]
fn test_clean_repository() {
    let base = TestBase::new();
    let repo = base.repo_with_commit("app");

    let snap = snapshot(&SystemGit, repo.path(), DEFAULT_EPOCH).unwrap();
    assert_eq!(snap.branch, "main");
    assert!(!snap.is_dirty);
    assert_eq!((snap.staged, snap.unstaged, snap.untracked), (0, 0, 0));
    // No upstream configured
    assert_eq!((snap.ahead, snap.behind), (0, 0));
    assert_eq!(snap.last_message, "Initial commit");
    assert_eq!(snap.last_short_hash.len(), 7);
    assert_eq!(snap.last_commit_epoch, DEFAULT_EPOCH);
    assert_eq!(snap.stash_count, 0);

    assert_eq!(snap.worktrees.len(), 1);
    let primary = &snap.worktrees[0];
    assert!(primary.is_primary);
    assert_eq!(primary.branch.as_deref(), Some("main"));
    assert_eq!(primary.status, MergeStatus::NotApplicable);
    assert_eq!(primary.parent_branch, "main");
    assert_eq!(primary.parent_sha, snap.last_short_hash);
}

#[test]
fn test_dirty_counts() {
    let base = TestBase::new();
    let repo = base.repo_with_commit("app");
    std::fs::write(repo.path().join("file.txt"), "changed").unwrap();
    std::fs::write(repo.path().join("new.txt"), "staged").unwrap();
    repo.git(&["add", "new.txt"]);
    std::fs::write(repo.path().join("scratch.txt"), "untracked").unwrap();

    let snap = snapshot(&SystemGit, repo.path(), DEFAULT_EPOCH).unwrap();
    assert!(snap.is_dirty);
    assert_eq!((snap.staged, snap.unstaged, snap.untracked), (1, 1, 1));
}

#[test]
fn test_stash_count() {
    let base = TestBase::new();
    let repo = base.repo_with_commit("app");
    for content in ["one", "two"] {
        std::fs::write(repo.path().join("file.txt"), content).unwrap();
        repo.git(&["stash"]);
    }

    let snap = snapshot(&SystemGit, repo.path(), DEFAULT_EPOCH).unwrap();
    assert_eq!(snap.stash_count, 2);
    assert!(!snap.is_dirty);
}

#[test]
fn test_detached_head_still_snapshots() {
    let base = TestBase::new();
    let repo = base.repo_with_commit("app");
    repo.detach_head();

    let snap = snapshot(&SystemGit, repo.path(), DEFAULT_EPOCH).unwrap();
    assert_eq!(snap.branch, "HEAD");
    assert_eq!(snap.worktrees.len(), 1);
    let row = &snap.worktrees[0];
    assert_eq!(row.branch, None);
    assert_eq!(row.status, MergeStatus::Detached);
    assert_eq!(row.short_sha, "");
    assert_eq!(row.parent_branch, "");
}
