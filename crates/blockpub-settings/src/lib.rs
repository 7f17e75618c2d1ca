//! Block settings persistence for blockpub.
//!
//! This crate stores the per-workspace [`BlockSettings`] record as JSON and
//! exposes it through the [`SettingsStore`] trait so the lifecycle engine
//! never touches the filesystem directly.
//!
//! Saves are whole-record upserts: a [`SettingsPatch`] is merged into the
//! existing record (or a fresh one) and the result is written to a temporary
//! file and renamed into place, so a concurrent reader never observes a torn
//! record.
//!
//! # Example
//!
//! ```
//! use blockpub_settings::{FileSettingsStore, SettingsStore};
//! use blockpub_types::SettingsPatch;
//!
//! let td = tempfile::tempdir().expect("tempdir");
//! let store = FileSettingsStore::new(td.path());
//!
//! store.save(&SettingsPatch::version(2)).expect("save");
//! let settings = store.load().expect("load").expect("present");
//! assert_eq!(settings.active_version, 2);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use blockpub_types::{BlockSettings, SettingsPatch};

/// Default settings file name inside the state directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// Get the settings file path for a state directory.
pub fn settings_path(state_dir: &Path) -> PathBuf {
    state_dir.join(SETTINGS_FILE)
}

/// Trait for settings storage backends.
///
/// `load` returns `Ok(None)` when no record has ever been persisted. `save`
/// merges the patch into the current record and returns the merged result.
pub trait SettingsStore: Send + Sync {
    /// Load the settings record, `None` if the workspace has none.
    fn load(&self) -> Result<Option<BlockSettings>>;

    /// Merge a patch into the record and persist it atomically.
    fn save(&self, patch: &SettingsPatch) -> Result<BlockSettings>;
}

/// Filesystem-based settings store.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// Create a store rooted at the given state directory.
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: settings_path(state_dir),
        }
    }

    /// Get the path to the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Option<BlockSettings>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read settings file {}", self.path.display()))?;

        let settings: BlockSettings = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse settings JSON from {}", self.path.display()))?;

        Ok(Some(settings))
    }

    fn save(&self, patch: &SettingsPatch) -> Result<BlockSettings> {
        let mut settings = self.load()?.unwrap_or_default();
        settings.apply(patch);
        settings.updated_at = Utc::now();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create state dir {}", parent.display()))?;
        }

        // Write to temp file first, then rename for atomicity
        let tmp_path = self.path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(&settings)
            .context("failed to serialize settings to JSON")?;

        fs::write(&tmp_path, json)
            .with_context(|| format!("failed to write settings file {}", tmp_path.display()))?;

        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to rename settings file to {}", self.path.display()))?;

        Ok(settings)
    }
}
