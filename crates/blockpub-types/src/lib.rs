//! Core domain types for blockpub.
//!
//! This crate provides the fundamental types used across the blockpub
//! ecosystem: the persisted block settings record, the partial-update patch
//! applied to it, the derived lifecycle state, and the outcome records each
//! lifecycle operation reports back to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version a fresh workspace targets before anything else is recorded.
///
/// Versions start at 1, never 0, so branch labels and version arithmetic
/// are always well-defined.
pub const FIRST_VERSION: u32 = 1;

fn default_version() -> u32 {
    FIRST_VERSION
}

/// Branch label for a major version, e.g. `v3`.
pub fn version_label(version: u32) -> String {
    format!("v{version}")
}

/// Persisted record of what this workspace believes about its block.
///
/// One record per workspace. Created by the publish operation, mutated by
/// every subsequent operation, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSettings {
    /// Remote registry identifier; absent until the first publish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-facing name shown in the registry catalog.
    #[serde(default)]
    pub display_name: String,
    /// Registry-facing slug derived from the display name at publish time.
    #[serde(default)]
    pub published_name: String,
    /// Catalog category, fixed at publish time.
    #[serde(default)]
    pub category: String,
    /// The major version staging operations currently target.
    ///
    /// Monotonically non-decreasing: only the major-version operation
    /// advances it, nothing ever lowers it.
    #[serde(default = "default_version")]
    pub active_version: u32,
    /// Whether the staged version is publicly visible.
    #[serde(default)]
    pub is_public: bool,
    /// Whether version-control branches track major versions.
    ///
    /// Declared once per workspace; no lifecycle operation changes it after
    /// the block record is first persisted.
    #[serde(default)]
    pub uses_version_control: bool,
    /// When this record was first persisted.
    pub created_at: DateTime<Utc>,
    /// When this record was last persisted.
    pub updated_at: DateTime<Utc>,
}

impl BlockSettings {
    /// Create a fresh, unpublished record.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: None,
            display_name: String::new(),
            published_name: String::new(),
            category: String::new(),
            active_version: FIRST_VERSION,
            is_public: false,
            uses_version_control: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the block has ever been published.
    pub fn is_published(&self) -> bool {
        self.id.is_some()
    }

    /// Merge a partial update into this record. Fields the patch leaves
    /// unset keep their current values.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(id) = &patch.id {
            self.id = Some(id.clone());
        }
        if let Some(display_name) = &patch.display_name {
            self.display_name = display_name.clone();
        }
        if let Some(published_name) = &patch.published_name {
            self.published_name = published_name.clone();
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(active_version) = patch.active_version {
            self.active_version = active_version;
        }
        if let Some(is_public) = patch.is_public {
            self.is_public = is_public;
        }
        if let Some(uses_version_control) = patch.uses_version_control {
            self.uses_version_control = uses_version_control;
        }
    }
}

impl Default for BlockSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial update merged into [`BlockSettings`] as a whole-record upsert.
///
/// `uses_version_control` is only ever set by the publish operation; the
/// flag is fixed for the lifetime of the block afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub published_name: Option<String>,
    pub category: Option<String>,
    pub active_version: Option<u32>,
    pub is_public: Option<bool>,
    pub uses_version_control: Option<bool>,
}

impl SettingsPatch {
    /// Patch that rewrites only the active version.
    pub fn version(version: u32) -> Self {
        Self {
            active_version: Some(version),
            ..Self::default()
        }
    }
}

/// Production state of a remote version, owned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionState {
    /// Staged but never promoted to production.
    #[default]
    Unreleased,
    /// Currently serving production traffic.
    Released,
    /// Reverted to the previously released state.
    RolledBack,
}

impl std::fmt::Display for ProductionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductionState::Unreleased => write!(f, "unreleased"),
            ProductionState::Released => write!(f, "released"),
            ProductionState::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// Lifecycle state of a block, derived from the settings record and the
/// last known remote production state. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// No registry identifier yet.
    Unpublished,
    /// Published, not yet released at this version.
    Staged(u32),
    /// Released to production at this version.
    Released(u32),
    /// Production rolled back while staging remains at this version.
    RolledBack(u32),
}

impl BlockState {
    /// Derive the lifecycle state. `production` is the remote production
    /// state when one has been observed; without it a published block is
    /// assumed staged.
    pub fn derive(settings: Option<&BlockSettings>, production: Option<ProductionState>) -> Self {
        let Some(settings) = settings else {
            return BlockState::Unpublished;
        };
        if !settings.is_published() {
            return BlockState::Unpublished;
        }
        let version = settings.active_version;
        match production.unwrap_or_default() {
            ProductionState::Unreleased => BlockState::Staged(version),
            ProductionState::Released => BlockState::Released(version),
            ProductionState::RolledBack => BlockState::RolledBack(version),
        }
    }

    /// The version this state is pinned to, if any.
    pub fn version(&self) -> Option<u32> {
        match self {
            BlockState::Unpublished => None,
            BlockState::Staged(v) | BlockState::Released(v) | BlockState::RolledBack(v) => Some(*v),
        }
    }
}

/// Result of a successful publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub id: String,
    pub display_name: String,
    pub published_name: String,
    pub version: u32,
}

/// Result of a successful major-version bump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MajorVersionOutcome {
    pub previous_version: u32,
    pub version: u32,
    /// Branch created for the new version, when version control is in use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Result of a successful update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub version: u32,
    pub is_public: bool,
    /// Whether the pushed code went through the minifier.
    pub minified: bool,
}

/// Result of a successful release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Result of a successful rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackOutcome {
    pub version: u32,
}

/// Pure read of the local record: the version staging targets and the
/// display name, when one has been recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDetails {
    pub active_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Local record compared against the version branches the registry knows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub active_version: u32,
    pub display_name: String,
    pub is_public: bool,
    /// Version branches claimed on the registry, e.g. `["v1", "v2"]`.
    pub remote_branches: Vec<String>,
}
