use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Fixed commit date for commits that don't ask for one: 2025-01-01T00:00:00Z.
pub const DEFAULT_EPOCH: i64 = 1_735_689_600;

/// A `git` command isolated from the user's and system's configuration.
pub fn git_command(dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir)
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_CONFIG_SYSTEM", "/dev/null")
        .env("LC_ALL", "C")
        .env("LANG", "C");
    cmd
}

/// Run git in `dir`, panicking with its output on failure. Returns stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    run(git_command(dir).args(args), args)
}

fn run(cmd: &mut Command, args: &[&str]) -> String {
    let output = cmd.output().expect("Failed to execute git");
    if !output.status.success() {
        panic!(
            "git {} failed:\nstdout: {}\nstderr: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A temporary directory of repositories, like the dashboard's base path.
pub struct TestBase {
    _temp_dir: TempDir,
    root: PathBuf,
}

impl TestBase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        // Canonicalize to resolve symlinks (macOS /var -> /private/var), so
        // paths match what git reports
        let root = temp_dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp path");
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Initialise an empty repository `name` on branch `main`.
    pub fn repo(&self, name: &str) -> TestRepo {
        TestRepo::init(self.root.join(name))
    }

    /// Repository `name` with one commit.
    pub fn repo_with_commit(&self, name: &str) -> TestRepo {
        let repo = self.repo(name);
        repo.commit("Initial commit");
        repo
    }

    /// A directory that is not a repository.
    pub fn plain_dir(&self, name: &str) -> PathBuf {
        let path = self.root.join(name);
        std::fs::create_dir_all(&path).expect("Failed to create directory");
        path
    }
}

pub struct TestRepo {
    root: PathBuf,
}

impl TestRepo {
    pub fn init(root: PathBuf) -> Self {
        std::fs::create_dir_all(&root).expect("Failed to create repo directory");
        git(&root, &["init", "-b", "main"]);
        git(&root, &["config", "user.name", "Test User"]);
        git(&root, &["config", "user.email", "test@example.com"]);
        Self { root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn git(&self, args: &[&str]) -> String {
        git(&self.root, args)
    }

    /// Commit a change to `file.txt` at [`DEFAULT_EPOCH`].
    pub fn commit(&self, message: &str) {
        self.commit_at(message, DEFAULT_EPOCH);
    }

    /// Commit a change to `file.txt` with author and committer date `epoch`.
    pub fn commit_at(&self, message: &str, epoch: i64) {
        commit_in(&self.root, message, epoch);
    }

    /// Add a worktree at `path` on a new branch.
    pub fn add_worktree(&self, path: &Path, branch: &str) -> PathBuf {
        let path_arg = path.to_str().expect("non-UTF-8 temp path");
        self.git(&["worktree", "add", "-b", branch, path_arg]);
        path.canonicalize()
            .expect("Failed to canonicalize worktree path")
    }

    pub fn detach_head(&self) {
        let sha = self.git(&["rev-parse", "HEAD"]);
        self.git(&["checkout", "--detach", &sha]);
    }
}

/// Commit in any working directory (repository root or a linked worktree).
pub fn commit_in(dir: &Path, message: &str, epoch: i64) {
    std::fs::write(dir.join("file.txt"), message).expect("Failed to write file");
    git(dir, &["add", "."]);
    let date = format!("@{epoch} +0000");
    let args = ["commit", "-m", message];
    run(
        git_command(dir)
            .args(args)
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date),
        &args,
    );
}
