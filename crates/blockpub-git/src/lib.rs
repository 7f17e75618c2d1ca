//! Version-control branch operations for blockpub.
//!
//! Major versions are tracked as branches named `v<version>`. This crate
//! provides the [`BranchController`] trait the lifecycle engine drives and a
//! [`GitBranches`] implementation that shells out to the system `git`.
//!
//! The engine, not this crate, decides whether version control is in use:
//! when a workspace opts out, none of these operations are invoked.
//!
//! # Example
//!
//! ```no_run
//! use blockpub_git::{BranchController, GitBranches};
//! use std::path::Path;
//!
//! let branches = GitBranches::new(Path::new("."));
//! if !branches.exists("v2").unwrap_or(true) {
//!     branches.create("v2").expect("create branch");
//! }
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Branch primitives the lifecycle engine needs.
///
/// `create` fails when the branch already exists; `advance` fails when it is
/// missing. Both surface git's own diagnostics on failure.
pub trait BranchController: Send + Sync {
    /// Whether a branch with this label exists.
    fn exists(&self, label: &str) -> Result<bool>;

    /// Create a branch at the current HEAD.
    fn create(&self, label: &str) -> Result<()>;

    /// Move an existing branch to the current HEAD.
    fn advance(&self, label: &str) -> Result<()>;
}

/// Branch controller backed by the system `git` binary.
#[derive(Debug, Clone)]
pub struct GitBranches {
    repo_root: PathBuf,
}

impl GitBranches {
    /// Create a controller operating on the repository at `repo_root`.
    pub fn new(repo_root: &Path) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
        }
    }

    /// Get the repository root this controller operates on.
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn git(&self, args: &[&str]) -> Result<std::process::Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .with_context(|| format!("failed to run git {}", args.join(" ")))
    }
}

impl BranchController for GitBranches {
    fn exists(&self, label: &str) -> Result<bool> {
        let refname = format!("refs/heads/{label}");
        let output = self.git(&["rev-parse", "--verify", "--quiet", &refname])?;

        if output.status.success() {
            return Ok(true);
        }

        // --quiet exits 1 for a missing ref without complaining; anything
        // louder (not a repository, bad ref name) is a real failure.
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.trim().is_empty() {
            Ok(false)
        } else {
            bail!("git rev-parse failed for {label}: {}", stderr.trim());
        }
    }

    fn create(&self, label: &str) -> Result<()> {
        let output = self.git(&["branch", label])?;

        if !output.status.success() {
            bail!(
                "failed to create branch {label}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    fn advance(&self, label: &str) -> Result<()> {
        if !self.exists(label)? {
            bail!("cannot advance branch {label}: branch not found");
        }

        let output = self.git(&["branch", "-f", label, "HEAD"])?;

        if !output.status.success() {
            bail!(
                "failed to advance branch {label}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Check if a path is inside a git work tree.
pub fn is_git_repo(path: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(path)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
