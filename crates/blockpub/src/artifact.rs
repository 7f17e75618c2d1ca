//! Build artifact access.
//!
//! The lifecycle engine treats the built block code as an opaque string
//! behind the [`ArtifactSource`] trait; [`FileArtifact`] is the production
//! implementation reading the configured build output path.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// A readable build artifact.
pub trait ArtifactSource: Send + Sync {
    /// Where the artifact comes from, for error messages.
    fn describe(&self) -> String;

    /// Whether the artifact is present.
    fn exists(&self) -> bool;

    /// Read the artifact text.
    fn read(&self) -> Result<String>;
}

/// Build output on disk.
#[derive(Debug, Clone)]
pub struct FileArtifact {
    path: PathBuf,
}

impl FileArtifact {
    /// Create an artifact source for the given build output path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Get the artifact path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactSource for FileArtifact {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read build artifact {}", self.path.display()))
    }
}
