//! # Blockpub
//!
//! A lifecycle manager for deployable code blocks.
//!
//! Blockpub keeps three independent stores mutually consistent while a block
//! moves through its publication lifecycle: the workspace's persisted
//! settings record, the remote block registry reached over HTTP, and an
//! optional set of version-control branches tracking major versions.
//!
//! ## Operations
//!
//! - **publish** — stage a brand-new block: create it on the registry,
//!   persist the full settings record, cut the `v1` branch.
//! - **update** — push the current build to the staged version, optionally
//!   flipping its visibility. Idempotent and safe to retry.
//! - **major** — claim the next major version, guarded by a branch
//!   existence pre-check so two workspaces racing for the same number fail
//!   fast instead of half-applying.
//! - **release** — promote the staged version to production.
//! - **rollback** — revert production toward the previously released state.
//! - **details** / **status** — pure reads of the local record, with
//!   `status` comparing it against the registry's branch list.
//!
//! ## Consistency model
//!
//! Preconditions and the major-version branch check run before any network
//! call, so those failures have zero side effects. Once the registry accepts
//! a mutation the local writes follow; if one of them fails the operation
//! surfaces a dedicated skew error ([`error::LifecycleError::LocalPersistence`],
//! [`error::LifecycleError::Branch`]) instead of attempting a compensating
//! remote rollback. Operators repair skew by retrying the local side.
//!
//! ## Modules
//!
//! - [`engine`] — the lifecycle state machine
//! - [`artifact`] — build output access
//! - [`minify`] — conservative artifact minification
//! - [`naming`] — display/published name derivation and category checks
//! - [`config`] — `.blockpub.toml` loading
//! - [`error`] — the lifecycle error taxonomy
//!
//! The persistence, registry, and branch seams live in their own crates and
//! are re-exported here for convenience.

/// Build output access.
pub mod artifact;

/// Configuration file (`.blockpub.toml`) loading.
pub mod config;

/// Core lifecycle operations.
pub mod engine;

/// Lifecycle error taxonomy.
pub mod error;

/// Conservative artifact minification.
pub mod minify;

/// Block identity derivation and validation.
pub mod naming;

/// Domain types.
/// Re-exported from the blockpub-types microcrate.
pub use blockpub_types as types;

/// Settings persistence.
/// Re-exported from the blockpub-settings microcrate.
pub use blockpub_settings as settings;

/// Version-control branch operations.
/// Re-exported from the blockpub-git microcrate.
pub use blockpub_git as git;

/// Registry API client.
/// Re-exported from the blockpub-registry microcrate.
pub use blockpub_registry as registry;
