//! Error taxonomy for lifecycle operations.
//!
//! Precondition and conflict failures are fail-fast: nothing was sent to the
//! registry and nothing was written locally. The persistence and branch
//! variants are different — they report a write that failed *after* the
//! registry accepted a mutation, which is the one place local, remote, and
//! branch state can skew. Callers repair skew by retrying the local side
//! only, never by re-running the remote mutation.

use blockpub_registry::RegistryError;
use thiserror::Error;

/// Terminal outcome of a failed lifecycle operation.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A local precondition failed; no network call was attempted.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The target major version's branch already exists, most likely
    /// claimed by another workspace. Nothing was mutated.
    #[error("version v{version} is already claimed by an existing branch")]
    VersionConflict { version: u32 },

    /// The registry refused or failed the remote call. The registry's own
    /// status and message ride along as the error source.
    #[error("registry rejected the operation")]
    Registry(#[from] RegistryError),

    /// The settings write failed after the registry accepted the change.
    /// Local and remote state now disagree; re-run the local write.
    #[error("settings were not persisted after the registry accepted the change: {cause:#}")]
    LocalPersistence { cause: anyhow::Error },

    /// A branch mutation failed after the registry accepted the change.
    /// Skew is confined to the version-control side channel.
    #[error("branch {label} was not updated after the registry accepted the change: {cause:#}")]
    Branch { label: String, cause: anyhow::Error },
}

impl LifecycleError {
    /// Shorthand for a precondition failure.
    pub fn precondition(message: impl Into<String>) -> Self {
        LifecycleError::Precondition(message.into())
    }

    /// Whether the failure happened after a successful remote mutation,
    /// i.e. whether local/remote skew is possible.
    pub fn is_skew(&self) -> bool {
        matches!(
            self,
            LifecycleError::LocalPersistence { .. } | LifecycleError::Branch { .. }
        )
    }
}
