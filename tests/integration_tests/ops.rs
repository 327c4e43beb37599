use repodeck::git::{Repository, SystemGit, list_worktrees};
use repodeck::ops::{GitAction, create_worktree, merge_worktree, remove_worktree, run_action};

use crate::common::{DEFAULT_EPOCH, TestBase, commit_in};

#[test]
fn test_create_merge_and_clean_up() {
    let base = TestBase::new();
    let repo = base.repo_with_commit("app");
    let git = SystemGit;
    let repository = Repository::at(&git, repo.path());

    let created = create_worktree(&repository, base.path(), "fix-typo").unwrap();
    assert!(created.success, "{}", created.output);
    assert_eq!(created.path, base.path().join("fix-typo"));
    assert!(created.path.is_dir());

    commit_in(&created.path, "Fix typo", DEFAULT_EPOCH + 60);
    let path = created.path.to_str().unwrap();

    let merged = merge_worktree(&repository, "fix-typo", path, true, true);
    assert!(merged.success, "{}", merged.output);
    assert_eq!(merged.merged_into.as_deref(), Some("main"));
    assert!(merged.cleanup_done);

    assert!(!created.path.exists());
    assert_eq!(list_worktrees(&repository, DEFAULT_EPOCH).len(), 1);
    assert_eq!(repo.git(&["log", "-1", "--pretty=format:%s"]), "Fix typo");
    assert_eq!(repo.git(&["branch", "--list", "fix-typo"]), "");
}

#[test]
fn test_remove_dirty_worktree_is_forced() {
    let base = TestBase::new();
    let repo = base.repo_with_commit("app");
    let wt = repo.add_worktree(&base.path().join("app-scratch"), "scratch");
    std::fs::write(wt.join("wip.txt"), "unsaved").unwrap();

    let git = SystemGit;
    let repository = Repository::at(&git, repo.path());
    let removed = remove_worktree(&repository, wt.to_str().unwrap(), Some("scratch"), true);
    assert!(removed.success, "{}", removed.output);
    assert!(removed.branch_deleted);
    assert!(!wt.exists());
    assert_eq!(repo.git(&["branch", "--list", "scratch"]), "");
}

#[test]
fn test_action_output_is_returned() {
    let base = TestBase::new();
    let repo = base.repo_with_commit("app");
    let git = SystemGit;
    let repository = Repository::at(&git, repo.path());

    let log = run_action(&repository, GitAction::Log);
    assert!(log.success);
    assert!(log.output.ends_with("Initial commit"));

    // No remote configured
    let pull = run_action(&repository, GitAction::Pull);
    assert!(!pull.success);
    assert!(!pull.output.is_empty());
}
