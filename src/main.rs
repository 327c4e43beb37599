use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use repodeck::activity;
use repodeck::config::DashConfig;
use repodeck::git::{Repository, SystemGit, list_worktrees};
use repodeck::ops::{self, GitAction};
use repodeck::scan;
use repodeck::store::{self, JsonFileStore, SavedCommand};
use repodeck::utils::{get_now, local_now};

const NO_README: &str = "No README.md found in this repo.";

#[derive(Parser, Debug)]
#[command(
    name = "repodeck",
    version,
    about,
    long_about = None,
    arg_required_else_help = true
)]
struct Cli {
    /// Path to config TOML (defaults to `~/.config/repodeck/config.toml`).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Directory containing the repositories (overrides config).
    #[arg(long, global = true, value_name = "PATH")]
    base: Option<PathBuf>,
    /// Log more (`-v` debug, `-vv` trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Snapshot every repository, pinned first, then most recently committed.
    Projects,
    /// Commit activity across all repositories.
    Stats {
        /// Short window in days (defaults to `stats_days`).
        #[arg(long)]
        days: Option<u32>,
    },
    /// Worktrees of a repository with merge status.
    Worktrees { repo: String },
    /// Suggest a branch name for a new worktree.
    SuggestBranch { repo: String },
    /// Recent commits.
    Log {
        repo: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Most recently committed-to branches.
    Branches {
        repo: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Files changed in the last N commits.
    RecentFiles {
        repo: String,
        #[arg(long, default_value_t = 1)]
        depth: usize,
    },
    /// All branches and the last 10 commits.
    Details { repo: String },
    /// The repository's README.md.
    Readme { repo: String },
    /// Run a git action: pull, fetch, stash, stash-pop, reset, clean, log.
    Action { repo: String, action: GitAction },
    /// Create a worktree next to the repositories on a new branch.
    WtCreate { repo: String, suffix: String },
    /// Force-remove a worktree.
    WtRemove {
        repo: String,
        path: String,
        /// Branch checked out in the worktree.
        #[arg(long)]
        branch: Option<String>,
        /// Also delete the branch.
        #[arg(long, requires = "branch")]
        delete_branch: bool,
    },
    /// Merge a worktree's branch into the repository's current branch.
    WtMerge {
        repo: String,
        branch: String,
        path: String,
        /// Remove the worktree after a successful merge.
        #[arg(long)]
        cleanup: bool,
        /// With --cleanup, also delete the branch.
        #[arg(long, requires = "cleanup")]
        delete_branch: bool,
    },
    /// Toggle whether a repository is pinned.
    Pin { repo: String },
    /// Show, or replace with --set, a repository's saved commands.
    Commands {
        repo: String,
        /// JSON array of `{"label": ..., "cmd": ...}` objects.
        #[arg(long, value_name = "JSON")]
        set: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = DashConfig::load(cli.config.as_deref())?;
    if let Some(base) = cli.base {
        // git reports canonical paths; keep worktree paths comparable
        config.base_path = dunce::canonicalize(&base)
            .with_context(|| format!("cannot open base directory {}", base.display()))?;
    }
    log::debug!("Using base path {}", config.base_path.display());

    let git = SystemGit;
    let state = JsonFileStore::new(config.state_path());

    match cli.command {
        Command::Projects => {
            let pinned = store::load_pinned(&state)?;
            let projects = scan::list_projects(&git, &config, &pinned, get_now())?;
            print_json(&json!({ "projects": projects }))
        }
        Command::Stats { days } => {
            let repos = scan::discover_repos(&config)?;
            let days = days.unwrap_or(config.stats_days).max(1);
            print_json(&activity::report(&git, &repos, days, config.max_workers)?)
        }
        Command::Worktrees { repo } => {
            let repo = open_repo(&git, &config, &repo)?;
            print_json(&json!({
                "worktrees": list_worktrees(&repo, get_now()),
                "current_branch": repo.head_ref().unwrap_or_default(),
            }))
        }
        Command::SuggestBranch { repo } => {
            let repo = open_repo(&git, &config, &repo)?;
            print_json(&json!({ "suffix": ops::suggested_branch(&repo, &local_now()) }))
        }
        Command::Log { repo, limit } => {
            let repo = open_repo(&git, &config, &repo)?;
            print_json(&json!({ "commits": repo.recent_log(limit) }))
        }
        Command::Branches { repo, limit } => {
            let repo = open_repo(&git, &config, &repo)?;
            print_json(&json!({ "branches": repo.recent_branches(limit) }))
        }
        Command::RecentFiles { repo, depth } => {
            let repo = open_repo(&git, &config, &repo)?;
            print_json(&json!({ "files": repo.recent_files(depth) }))
        }
        Command::Details { repo } => {
            let repo = open_repo(&git, &config, &repo)?;
            print_json(&repo.details())
        }
        Command::Readme { repo } => {
            let path = config.repo_path(&repo);
            if !path.is_dir() {
                bail!("repository not found: {}", path.display());
            }
            let content = scan::read_readme(&path)?.unwrap_or_else(|| NO_README.to_string());
            print_json(&json!({ "content": content }))
        }
        Command::Action { repo, action } => {
            let repo = open_repo(&git, &config, &repo)?;
            print_json(&ops::run_action(&repo, action))
        }
        Command::WtCreate { repo, suffix } => {
            let repo = open_repo(&git, &config, &repo)?;
            print_json(&ops::create_worktree(&repo, &config.base_path, &suffix)?)
        }
        Command::WtRemove {
            repo,
            path,
            branch,
            delete_branch,
        } => {
            let repo = open_repo(&git, &config, &repo)?;
            print_json(&ops::remove_worktree(
                &repo,
                &path,
                branch.as_deref(),
                delete_branch,
            ))
        }
        Command::WtMerge {
            repo,
            branch,
            path,
            cleanup,
            delete_branch,
        } => {
            let repo = open_repo(&git, &config, &repo)?;
            print_json(&ops::merge_worktree(
                &repo,
                &branch,
                &path,
                cleanup,
                delete_branch,
            ))
        }
        Command::Pin { repo } => {
            let is_pinned = store::toggle_pinned(&state, &repo)?;
            print_json(&json!({ "success": true, "is_pinned": is_pinned }))
        }
        Command::Commands { repo, set } => {
            let legacy = JsonFileStore::new(&config.base_path);
            store::migrate_legacy_commands(&state, &legacy)?;
            if let Some(raw) = set {
                let commands: Vec<SavedCommand> =
                    serde_json::from_str(&raw).context("--set expects a JSON array of commands")?;
                store::save_commands(&state, &repo, commands)?;
            }
            print_json(&json!({ "commands": store::load_commands(&state, &repo)? }))
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// A repository directory under the base path, which must exist.
fn open_repo<'a>(git: &'a SystemGit, config: &DashConfig, name: &str) -> anyhow::Result<Repository<'a>> {
    let path = config.repo_path(name);
    if !path.is_dir() {
        bail!("repository not found: {}", path.display());
    }
    Ok(Repository::at(git, path))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
