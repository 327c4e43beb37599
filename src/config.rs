//! Dashboard configuration.
//!
//! Built once at start-up and passed explicitly to the components that need
//! it. Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. TOML file (`~/.config/repodeck/config.toml` unless `--config` is given)
//! 3. `REPODECK_*` environment variables (`REPODECK_BASE_PATH`, `REPODECK_EXCLUDE=a,b`, ...)
//! 4. `REPO_BASE_PATH`, kept for existing setups

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Most worker threads any scan will use.
pub const DEFAULT_MAX_WORKERS: usize = 12;

/// Default recent-activity window in days.
pub const DEFAULT_STATS_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashConfig {
    /// Directory whose immediate children are scanned as repositories
    pub base_path: PathBuf,
    /// Child directory names that are never scanned
    pub exclude: Vec<String>,
    /// Upper bound on the scanner's worker pool
    pub max_workers: usize,
    /// Default short window for activity reports
    pub stats_days: u32,
    /// Where pinned repositories and saved commands live (relative to `base_path`)
    pub state_dir: PathBuf,
}

impl DashConfig {
    /// Defaults rooted at `base_path`.
    pub fn with_base(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            exclude: vec!["my-dashboard".to_string(), ".my_dashboard".to_string()],
            max_workers: DEFAULT_MAX_WORKERS,
            stats_days: DEFAULT_STATS_DAYS,
            state_dir: PathBuf::from(".my_dashboard"),
        }
    }

    /// Load from the given (or default) config file plus the process environment.
    pub fn load(config_file: Option<&Path>) -> anyhow::Result<Self> {
        let file = config_file.map(Path::to_path_buf).or_else(default_config_path);
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::load_from(file.as_deref(), &env)
    }

    /// Load from an optional file and an explicit environment map.
    ///
    /// A missing file is fine; a malformed one is an error.
    pub fn load_from(config_file: Option<&Path>, env: &HashMap<String, String>) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        let defaults = Self::with_base(cwd);

        let mut builder = Config::builder()
            .set_default("base_path", defaults.base_path.to_string_lossy().into_owned())?
            .set_default("exclude", defaults.exclude.clone())?
            .set_default("max_workers", defaults.max_workers as i64)?
            .set_default("stats_days", i64::from(defaults.stats_days))?
            .set_default("state_dir", defaults.state_dir.to_string_lossy().into_owned())?;

        if let Some(path) = config_file {
            log::debug!("Loading config from {}", path.display());
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let repodeck_env: HashMap<String, String> = env
            .iter()
            .filter(|(k, _)| k.starts_with("REPODECK_"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        builder = builder
            .add_source(
                Environment::with_prefix("REPODECK")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("exclude")
                    .source(Some(repodeck_env)),
            )
            .set_override_option("base_path", env.get("REPO_BASE_PATH").cloned())?;

        let mut config: DashConfig = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        if config.max_workers == 0 {
            log::warn!("max_workers = 0 is not usable; using 1");
            config.max_workers = 1;
        }
        if config.stats_days == 0 {
            log::warn!("stats_days = 0 is not usable; using {DEFAULT_STATS_DAYS}");
            config.stats_days = DEFAULT_STATS_DAYS;
        }
        Ok(config)
    }

    /// Absolute directory for persisted dashboard state.
    pub fn state_path(&self) -> PathBuf {
        self.base_path.join(&self.state_dir)
    }

    /// Path of a repository directory under the base path.
    pub fn repo_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }
}

/// `<config dir>/repodeck/config.toml`, if a config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("repodeck").join("config.toml"))
}
