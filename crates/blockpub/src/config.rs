//! Configuration file support for blockpub (`.blockpub.toml`).
//!
//! This module provides project-specific configuration via a
//! `.blockpub.toml` file in the workspace root. Every field has a default;
//! CLI flags override whatever the file says.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Configuration file name, looked up in the workspace root.
pub const CONFIG_FILE: &str = ".blockpub.toml";

/// Registry connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// API base URL of the block registry.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Request timeout, in humantime notation (e.g. `30s`, `2m`).
    #[serde(
        default = "default_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout: default_timeout(),
        }
    }
}

/// Project configuration (`.blockpub.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Registry connection settings.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Build artifact pushed to the registry, relative to the workspace root.
    #[serde(default = "default_artifact")]
    pub artifact: PathBuf,

    /// Directory holding the persisted block settings.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Categories the registry catalog accepts.
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            artifact: default_artifact(),
            state_dir: default_state_dir(),
            categories: default_categories(),
        }
    }
}

fn default_api_base() -> String {
    "https://registry.blockpub.dev".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_artifact() -> PathBuf {
    PathBuf::from("build/block.js")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".blockpub")
}

fn default_categories() -> Vec<String> {
    ["layout", "content", "commerce", "media", "navigation"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Load configuration from `<root>/.blockpub.toml`, or defaults when the
/// file does not exist.
pub fn load_config(root: &Path) -> Result<Config> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Serialize a `Duration` as a humantime string (e.g. `30s`).
pub fn serialize_duration<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&humantime::format_duration(*d).to_string())
}

/// Deserialize a humantime string (e.g. `2m`) into a `Duration`.
pub fn deserialize_duration<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(d)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}
