//! Persisted dashboard state: pinned repositories and saved commands.
//!
//! The rest of the crate only sees the [`Store`] key-value seam. The file
//! layout is a detail of [`JsonFileStore`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which pinned repositories are stored.
pub const PINNED_KEY: &str = "pinned_repos";
/// Key under which saved commands are stored.
pub const COMMANDS_KEY: &str = "commands";

pub trait Store {
    /// The value saved under `name`, or `None` if nothing was saved yet.
    fn load(&self, name: &str) -> anyhow::Result<Option<Value>>;

    fn save(&self, name: &str, value: &Value) -> anyhow::Result<()>;
}

/// One JSON document per key, at `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl Store for JsonFileStore {
    fn load(&self, name: &str) -> anyhow::Result<Option<Value>> {
        let path = self.path_for(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        let value = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(value))
    }

    fn save(&self, name: &str, value: &Value) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path_for(name);
        write_atomic(&path, &serde_json::to_string_pretty(value)?)
    }
}

/// Write through a sibling temp file and rename over `path`.
fn write_atomic(path: &Path, content: &str) -> anyhow::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, content)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to replace {}", path.display()))
}

#[derive(Serialize, Deserialize, Default)]
struct PinnedDoc {
    #[serde(default)]
    pinned: BTreeSet<String>,
}

/// A shell command saved for a repository.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SavedCommand {
    pub label: String,
    pub cmd: String,
}

/// Pinned repository names. A malformed document counts as no pins.
pub fn load_pinned(store: &dyn Store) -> anyhow::Result<BTreeSet<String>> {
    let Some(value) = store.load(PINNED_KEY)? else {
        return Ok(BTreeSet::new());
    };
    match serde_json::from_value::<PinnedDoc>(value) {
        Ok(doc) => Ok(doc.pinned),
        Err(e) => {
            log::warn!("Ignoring malformed {PINNED_KEY}: {e}");
            Ok(BTreeSet::new())
        }
    }
}

/// Flip the pin on `name`; returns whether it is now pinned.
pub fn toggle_pinned(store: &dyn Store, name: &str) -> anyhow::Result<bool> {
    let mut pinned = load_pinned(store)?;
    let now_pinned = if pinned.remove(name) {
        false
    } else {
        pinned.insert(name.to_string());
        true
    };
    store.save(PINNED_KEY, &serde_json::to_value(PinnedDoc { pinned })?)?;
    Ok(now_pinned)
}

/// Copy saved commands from an older store (commands used to live directly
/// under the base path) into `store`, unless `store` already has some.
///
/// Returns whether anything was copied. The legacy file is left in place.
pub fn migrate_legacy_commands(store: &dyn Store, legacy: &dyn Store) -> anyhow::Result<bool> {
    if store.load(COMMANDS_KEY)?.is_some() {
        return Ok(false);
    }
    let value = match legacy.load(COMMANDS_KEY) {
        Ok(Some(value)) => value,
        Ok(None) => return Ok(false),
        Err(e) => {
            log::warn!("Ignoring legacy saved commands: {e:#}");
            return Ok(false);
        }
    };
    let commands: BTreeMap<String, Vec<SavedCommand>> = match serde_json::from_value(value) {
        Ok(commands) => commands,
        Err(e) => {
            log::warn!("Ignoring legacy saved commands: {e}");
            return Ok(false);
        }
    };
    log::info!("Migrating saved commands for {} repositories", commands.len());
    store.save(COMMANDS_KEY, &serde_json::to_value(commands)?)?;
    Ok(true)
}

fn load_all_commands(store: &dyn Store) -> anyhow::Result<BTreeMap<String, Vec<SavedCommand>>> {
    let Some(value) = store.load(COMMANDS_KEY)? else {
        return Ok(BTreeMap::new());
    };
    serde_json::from_value(value).context("malformed saved commands")
}

pub fn load_commands(store: &dyn Store, repo: &str) -> anyhow::Result<Vec<SavedCommand>> {
    Ok(load_all_commands(store)?.remove(repo).unwrap_or_default())
}

/// Replace the saved commands of `repo`, keeping other repositories' entries.
pub fn save_commands(store: &dyn Store, repo: &str, commands: Vec<SavedCommand>) -> anyhow::Result<()> {
    let mut all = load_all_commands(store)?;
    all.insert(repo.to_string(), commands);
    store.save(COMMANDS_KEY, &serde_json::to_value(all)?)
}
