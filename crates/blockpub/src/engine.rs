//! Core lifecycle operations for a block.
//!
//! [`LifecycleEngine`] is the state machine behind every command: it
//! validates preconditions against the settings store, drives the registry,
//! then reconciles the settings record and (when the workspace uses version
//! control) the branch set. Each operation is a single terminal outcome —
//! success with the new local state, or a [`LifecycleError`] describing
//! exactly how far the operation got.
//!
//! Ordering is load-bearing. Preconditions and the major-version branch
//! check run before any registry call, so a fail-fast error has zero side
//! effects. Once the registry accepts a mutation, local writes follow and a
//! failure there is surfaced as a distinct skew error instead of attempting
//! a compensating remote rollback.

use blockpub_git::BranchController;
use blockpub_registry::{BlockRegistry, BlockRevision, MajorVersion, NewBlock};
use blockpub_settings::SettingsStore;
use blockpub_types::{
    BlockDetails, BlockSettings, FIRST_VERSION, MajorVersionOutcome, PublishOutcome,
    ReleaseOutcome, RollbackOutcome, SettingsPatch, StatusReport, UpdateOutcome, version_label,
};

use crate::artifact::ArtifactSource;
use crate::error::LifecycleError;
use crate::minify::minify;
use crate::naming;

/// Progress sink implemented by the presentation layer.
pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Inputs for the publish operation.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Raw block name; display and published names are derived from it.
    pub name: String,
    /// Catalog category, validated against `category_set`.
    pub category: String,
    /// Categories the registry catalog accepts.
    pub category_set: Vec<String>,
    /// Track major versions as git branches. Only honored on the first
    /// publish of a workspace with no pre-declared settings record.
    pub use_version_control: bool,
}

/// Inputs for the update operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateRequest {
    /// Flip the stored visibility flag.
    pub toggle_public: bool,
    /// Push the raw build output instead of the minified form.
    pub unminified: bool,
}

/// The block lifecycle state machine.
pub struct LifecycleEngine<'a> {
    settings: &'a dyn SettingsStore,
    registry: &'a dyn BlockRegistry,
    branches: &'a dyn BranchController,
    artifact: &'a dyn ArtifactSource,
}

impl<'a> LifecycleEngine<'a> {
    pub fn new(
        settings: &'a dyn SettingsStore,
        registry: &'a dyn BlockRegistry,
        branches: &'a dyn BranchController,
        artifact: &'a dyn ArtifactSource,
    ) -> Self {
        Self {
            settings,
            registry,
            branches,
            artifact,
        }
    }

    /// Stage a new block: create it on the registry, persist the full
    /// settings record, and cut the `v1` branch when version control is on.
    pub fn publish(
        &self,
        request: &PublishRequest,
        reporter: &mut dyn Reporter,
    ) -> Result<PublishOutcome, LifecycleError> {
        let existing = self.load_settings()?;
        if let Some(settings) = &existing
            && settings.is_published()
        {
            return Err(LifecycleError::precondition(
                "block is already published; use update, release, or major instead",
            ));
        }

        let identity = naming::derive_identity(&request.name)
            .map_err(|e| LifecycleError::precondition(format!("{e:#}")))?;
        naming::validate_category(&request.category, &request.category_set)
            .map_err(|e| LifecycleError::precondition(format!("{e:#}")))?;

        let code = self.staged_code(false)?;

        // A pre-declared record (no id yet) wins over the request flag, so
        // the version-control decision is made once per workspace.
        let uses_version_control = existing
            .as_ref()
            .map(|s| s.uses_version_control)
            .unwrap_or(request.use_version_control);

        reporter.info(&format!(
            "creating block {} on the registry...",
            identity.published_name
        ));
        let created = self.registry.create_block(&NewBlock {
            display_name: identity.display_name.clone(),
            published_name: identity.published_name.clone(),
            category: request.category.clone(),
            code,
        })?;
        reporter.info(&format!("registry assigned id {}", created.id));

        self.settings
            .save(&SettingsPatch {
                id: Some(created.id.clone()),
                display_name: Some(identity.display_name.clone()),
                published_name: Some(identity.published_name.clone()),
                category: Some(request.category.clone()),
                active_version: Some(FIRST_VERSION),
                is_public: Some(false),
                uses_version_control: Some(uses_version_control),
            })
            .map_err(|cause| LifecycleError::LocalPersistence { cause })?;

        if uses_version_control {
            let label = version_label(FIRST_VERSION);
            reporter.info(&format!("creating branch {label}"));
            self.branches
                .create(&label)
                .map_err(|cause| LifecycleError::Branch { label, cause })?;
        }

        Ok(PublishOutcome {
            id: created.id,
            display_name: identity.display_name,
            published_name: identity.published_name,
            version: FIRST_VERSION,
        })
    }

    /// Claim the next major version. The branch existence check runs before
    /// any remote call: a hit means another workspace already claimed the
    /// version and nothing has been mutated anywhere.
    pub fn new_major_version(
        &self,
        reporter: &mut dyn Reporter,
    ) -> Result<MajorVersionOutcome, LifecycleError> {
        let settings = self.require_published()?;
        let id = settings.id.as_deref().unwrap_or_default();
        let next_version = settings.active_version + 1;
        let label = version_label(next_version);

        if settings.uses_version_control
            && self
                .branches
                .exists(&label)
                .map_err(|e| LifecycleError::precondition(format!("{e:#}")))?
        {
            return Err(LifecycleError::VersionConflict {
                version: next_version,
            });
        }

        let code = self.staged_code(false)?;

        reporter.info(&format!("claiming version {next_version} on the registry..."));
        self.registry.create_major_version(
            id,
            &MajorVersion {
                code,
                version: next_version,
            },
        )?;

        if settings.uses_version_control {
            reporter.info(&format!("creating branch {label}"));
            self.branches
                .create(&label)
                .map_err(|cause| LifecycleError::Branch {
                    label: label.clone(),
                    cause,
                })?;
        }

        self.settings
            .save(&SettingsPatch::version(next_version))
            .map_err(|cause| LifecycleError::LocalPersistence { cause })?;

        if settings.uses_version_control {
            self.branches
                .advance(&label)
                .map_err(|cause| LifecycleError::Branch {
                    label: label.clone(),
                    cause,
                })?;
        }

        Ok(MajorVersionOutcome {
            previous_version: settings.active_version,
            version: next_version,
            branch: settings.uses_version_control.then_some(label),
        })
    }

    /// Push the current build to the staged version, optionally flipping
    /// visibility. No version bump, no conflict detection: update is safe to
    /// replay.
    pub fn update(
        &self,
        request: &UpdateRequest,
        reporter: &mut dyn Reporter,
    ) -> Result<UpdateOutcome, LifecycleError> {
        let settings = self.require_published()?;
        let id = settings.id.as_deref().unwrap_or_default();
        let is_public = settings.is_public ^ request.toggle_public;
        let code = self.staged_code(request.unminified)?;

        reporter.info(&format!(
            "updating {} at version {}...",
            settings.published_name, settings.active_version
        ));
        self.registry.update_block(
            id,
            &BlockRevision {
                display_name: settings.display_name.clone(),
                published_name: settings.published_name.clone(),
                code,
                is_public,
                version: settings.active_version,
            },
        )?;

        self.settings
            .save(&SettingsPatch {
                is_public: Some(is_public),
                active_version: Some(settings.active_version),
                ..SettingsPatch::default()
            })
            .map_err(|cause| LifecycleError::LocalPersistence { cause })?;

        if settings.uses_version_control {
            let label = version_label(settings.active_version);
            self.branches
                .advance(&label)
                .map_err(|cause| LifecycleError::Branch { label, cause })?;
        }

        Ok(UpdateOutcome {
            version: settings.active_version,
            is_public,
            minified: !request.unminified,
        })
    }

    /// Promote the active version to production.
    pub fn release(
        &self,
        note: Option<&str>,
        reporter: &mut dyn Reporter,
    ) -> Result<ReleaseOutcome, LifecycleError> {
        let settings = self.require_published()?;
        let id = settings.id.as_deref().unwrap_or_default();

        reporter.info(&format!(
            "releasing version {} to production...",
            settings.active_version
        ));
        self.registry
            .release_block(id, settings.active_version, note)?;

        // Rewrite the version to itself: confirms the record is persistable,
        // changes nothing.
        self.settings
            .save(&SettingsPatch::version(settings.active_version))
            .map_err(|cause| LifecycleError::LocalPersistence { cause })?;

        Ok(ReleaseOutcome {
            version: settings.active_version,
            note: note.map(String::from),
        })
    }

    /// Revert production toward the previously released state. Purely a
    /// remote transition; local state is only reported, never touched.
    pub fn rollback(
        &self,
        reporter: &mut dyn Reporter,
    ) -> Result<RollbackOutcome, LifecycleError> {
        let settings = self.require_published()?;
        let id = settings.id.as_deref().unwrap_or_default();

        reporter.info(&format!(
            "rolling back production at version {}...",
            settings.active_version
        ));
        self.registry.rollback_block(id, settings.active_version)?;

        Ok(RollbackOutcome {
            version: settings.active_version,
        })
    }

    /// Pure read of the local record. Never touches the registry or the
    /// branch set; an absent record reads as version 1 with no name.
    pub fn block_details(&self) -> Result<BlockDetails, LifecycleError> {
        let settings = self.load_settings()?;
        Ok(BlockDetails {
            active_version: settings
                .as_ref()
                .map(|s| s.active_version)
                .unwrap_or(FIRST_VERSION),
            display_name: settings
                .filter(|s| !s.display_name.is_empty())
                .map(|s| s.display_name),
        })
    }

    /// Compare the local record against the version branches the registry
    /// has recorded. Read-only.
    pub fn status(&self, reporter: &mut dyn Reporter) -> Result<StatusReport, LifecycleError> {
        let settings = self.require_published()?;
        let id = settings.id.as_deref().unwrap_or_default();

        reporter.info("querying registry branches...");
        let remote_branches = self.registry.list_branches(id)?;

        Ok(StatusReport {
            active_version: settings.active_version,
            display_name: settings.display_name,
            is_public: settings.is_public,
            remote_branches,
        })
    }

    fn load_settings(&self) -> Result<Option<BlockSettings>, LifecycleError> {
        self.settings
            .load()
            .map_err(|e| LifecycleError::precondition(format!("settings could not be read: {e:#}")))
    }

    fn require_published(&self) -> Result<BlockSettings, LifecycleError> {
        match self.load_settings()? {
            Some(settings) if settings.is_published() => Ok(settings),
            _ => Err(LifecycleError::precondition(
                "block has not been published yet; run publish first",
            )),
        }
    }

    fn staged_code(&self, unminified: bool) -> Result<String, LifecycleError> {
        if !self.artifact.exists() {
            return Err(LifecycleError::precondition(format!(
                "build artifact not found: {} (run your build first)",
                self.artifact.describe()
            )));
        }
        let raw = self
            .artifact
            .read()
            .map_err(|e| LifecycleError::precondition(format!("{e:#}")))?;

        if unminified {
            return Ok(raw);
        }
        minify(&raw).map_err(|e| LifecycleError::precondition(format!("minification failed: {e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use anyhow::bail;
    use blockpub_registry::{CreatedBlock, RegistryError, RegistryErrorKind};

    const SAMPLE_CODE: &str = "export default {\n  // block entry\n  render: () => 1,\n};\n";

    struct SilentReporter;

    impl Reporter for SilentReporter {
        fn info(&mut self, _msg: &str) {}
        fn warn(&mut self, _msg: &str) {}
        fn error(&mut self, _msg: &str) {}
    }

    #[derive(Default)]
    struct MemorySettings {
        record: Mutex<Option<BlockSettings>>,
        fail_saves: AtomicBool,
    }

    impl MemorySettings {
        fn seeded(settings: BlockSettings) -> Self {
            Self {
                record: Mutex::new(Some(settings)),
                ..Self::default()
            }
        }

        fn current(&self) -> Option<BlockSettings> {
            self.record.lock().unwrap().clone()
        }
    }

    impl SettingsStore for MemorySettings {
        fn load(&self) -> anyhow::Result<Option<BlockSettings>> {
            Ok(self.current())
        }

        fn save(&self, patch: &SettingsPatch) -> anyhow::Result<BlockSettings> {
            if self.fail_saves.load(Ordering::SeqCst) {
                bail!("disk full");
            }
            let mut guard = self.record.lock().unwrap();
            let mut settings = guard.clone().unwrap_or_default();
            settings.apply(patch);
            *guard = Some(settings.clone());
            Ok(settings)
        }
    }

    #[derive(Default)]
    struct RecordingRegistry {
        calls: Mutex<Vec<String>>,
        fail_with: Mutex<Option<RegistryError>>,
    }

    impl RecordingRegistry {
        fn failing(err: RegistryError) -> Self {
            Self {
                fail_with: Mutex::new(Some(err)),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> Result<(), RegistryError> {
            if let Some(err) = self.fail_with.lock().unwrap().clone() {
                return Err(err);
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    impl BlockRegistry for RecordingRegistry {
        fn create_block(&self, block: &NewBlock) -> Result<CreatedBlock, RegistryError> {
            self.record(format!("create {}", block.published_name))?;
            Ok(CreatedBlock {
                id: "abc123".to_string(),
            })
        }

        fn update_block(&self, id: &str, revision: &BlockRevision) -> Result<(), RegistryError> {
            self.record(format!(
                "update {id} v{} public={} code=<{}>",
                revision.version, revision.is_public, revision.code
            ))
        }

        fn create_major_version(
            &self,
            id: &str,
            version: &MajorVersion,
        ) -> Result<(), RegistryError> {
            self.record(format!("major {id} v{}", version.version))
        }

        fn release_block(
            &self,
            id: &str,
            version: u32,
            note: Option<&str>,
        ) -> Result<(), RegistryError> {
            self.record(format!("release {id} v{version} note={note:?}"))
        }

        fn rollback_block(&self, id: &str, version: u32) -> Result<(), RegistryError> {
            self.record(format!("rollback {id} v{version}"))
        }

        fn list_branches(&self, id: &str) -> Result<Vec<String>, RegistryError> {
            self.record(format!("branches {id}"))?;
            Ok(vec!["v1".to_string(), "v2".to_string()])
        }
    }

    #[derive(Default)]
    struct FakeBranches {
        existing: Mutex<BTreeSet<String>>,
        ops: Mutex<Vec<String>>,
        fail_create: AtomicBool,
        fail_advance: AtomicBool,
    }

    impl FakeBranches {
        fn with_branch(label: &str) -> Self {
            let fake = Self::default();
            fake.existing.lock().unwrap().insert(label.to_string());
            fake
        }

        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }
    }

    impl BranchController for FakeBranches {
        fn exists(&self, label: &str) -> anyhow::Result<bool> {
            self.ops.lock().unwrap().push(format!("exists {label}"));
            Ok(self.existing.lock().unwrap().contains(label))
        }

        fn create(&self, label: &str) -> anyhow::Result<()> {
            self.ops.lock().unwrap().push(format!("create {label}"));
            if self.fail_create.load(Ordering::SeqCst) {
                bail!("cannot create {label}");
            }
            if !self.existing.lock().unwrap().insert(label.to_string()) {
                bail!("branch {label} already exists");
            }
            Ok(())
        }

        fn advance(&self, label: &str) -> anyhow::Result<()> {
            self.ops.lock().unwrap().push(format!("advance {label}"));
            if self.fail_advance.load(Ordering::SeqCst) {
                bail!("cannot advance {label}");
            }
            if !self.existing.lock().unwrap().contains(label) {
                bail!("branch {label} not found");
            }
            Ok(())
        }
    }

    struct StaticArtifact {
        code: Option<&'static str>,
    }

    impl ArtifactSource for StaticArtifact {
        fn describe(&self) -> String {
            "build/block.js".to_string()
        }

        fn exists(&self) -> bool {
            self.code.is_some()
        }

        fn read(&self) -> anyhow::Result<String> {
            match self.code {
                Some(code) => Ok(code.to_string()),
                None => bail!("no artifact"),
            }
        }
    }

    struct Harness {
        settings: MemorySettings,
        registry: RecordingRegistry,
        branches: FakeBranches,
        artifact: StaticArtifact,
    }

    impl Harness {
        fn fresh() -> Self {
            Self {
                settings: MemorySettings::default(),
                registry: RecordingRegistry::default(),
                branches: FakeBranches::default(),
                artifact: StaticArtifact {
                    code: Some(SAMPLE_CODE),
                },
            }
        }

        fn published(version: u32, uses_version_control: bool) -> Self {
            let mut settings = BlockSettings::new();
            settings.id = Some("abc123".to_string());
            settings.display_name = "Widget".to_string();
            settings.published_name = "widget".to_string();
            settings.category = "layout".to_string();
            settings.active_version = version;
            settings.uses_version_control = uses_version_control;

            Self {
                settings: MemorySettings::seeded(settings),
                ..Self::fresh()
            }
        }

        fn engine(&self) -> LifecycleEngine<'_> {
            LifecycleEngine::new(
                &self.settings,
                &self.registry,
                &self.branches,
                &self.artifact,
            )
        }
    }

    fn publish_request() -> PublishRequest {
        PublishRequest {
            name: "Widget".to_string(),
            category: "layout".to_string(),
            category_set: vec!["layout".to_string(), "content".to_string()],
            use_version_control: false,
        }
    }

    #[test]
    fn publish_fresh_workspace_persists_identity() {
        let h = Harness::fresh();
        let outcome = h
            .engine()
            .publish(&publish_request(), &mut SilentReporter)
            .expect("publish");

        assert_eq!(outcome.id, "abc123");
        assert_eq!(outcome.version, 1);
        assert_eq!(outcome.published_name, "widget");

        let saved = h.settings.current().expect("settings persisted");
        assert_eq!(saved.id.as_deref(), Some("abc123"));
        assert_eq!(saved.active_version, 1);
        assert!(!saved.is_public);

        // Version control off: the branch set is never touched.
        assert!(h.branches.ops().is_empty());
        assert_eq!(h.registry.calls(), vec!["create widget"]);
    }

    #[test]
    fn publish_refuses_already_published_block() {
        let h = Harness::published(1, false);
        let err = h
            .engine()
            .publish(&publish_request(), &mut SilentReporter)
            .expect_err("already published");

        assert!(matches!(err, LifecycleError::Precondition(_)));
        assert!(h.registry.calls().is_empty());
    }

    #[test]
    fn publish_remote_failure_leaves_workspace_unpublished() {
        let h = Harness {
            registry: RecordingRegistry::failing(RegistryError::from_status(400, "bad payload")),
            ..Harness::fresh()
        };

        let err = h
            .engine()
            .publish(&publish_request(), &mut SilentReporter)
            .expect_err("create fails");

        match err {
            LifecycleError::Registry(inner) => {
                assert_eq!(inner.kind, RegistryErrorKind::Validation)
            }
            other => panic!("expected Registry, got {other:?}"),
        }
        assert!(h.settings.current().is_none());
        assert!(h.branches.ops().is_empty());
    }

    #[test]
    fn publish_missing_artifact_fails_before_any_call() {
        let h = Harness {
            artifact: StaticArtifact { code: None },
            ..Harness::fresh()
        };

        let err = h
            .engine()
            .publish(&publish_request(), &mut SilentReporter)
            .expect_err("missing artifact");

        assert!(matches!(err, LifecycleError::Precondition(_)));
        assert!(h.registry.calls().is_empty());
        assert!(h.settings.current().is_none());
    }

    #[test]
    fn publish_rejects_unknown_category() {
        let h = Harness::fresh();
        let request = PublishRequest {
            category: "gadgets".to_string(),
            ..publish_request()
        };

        let err = h
            .engine()
            .publish(&request, &mut SilentReporter)
            .expect_err("unknown category");

        assert!(err.to_string().contains("gadgets"));
        assert!(h.registry.calls().is_empty());
    }

    #[test]
    fn publish_creates_v1_branch_when_version_control() {
        let h = Harness::fresh();
        let request = PublishRequest {
            use_version_control: true,
            ..publish_request()
        };

        h.engine()
            .publish(&request, &mut SilentReporter)
            .expect("publish");

        assert_eq!(h.branches.ops(), vec!["create v1"]);
        assert!(h.settings.current().expect("saved").uses_version_control);
    }

    #[test]
    fn publish_honors_predeclared_version_control_flag() {
        let mut declared = BlockSettings::new();
        declared.uses_version_control = true;
        let h = Harness {
            settings: MemorySettings::seeded(declared),
            ..Harness::fresh()
        };

        // The request says no, but the workspace already declared otherwise.
        h.engine()
            .publish(&publish_request(), &mut SilentReporter)
            .expect("publish");

        assert!(h.settings.current().expect("saved").uses_version_control);
        assert_eq!(h.branches.ops(), vec!["create v1"]);
    }

    #[test]
    fn publish_branch_failure_is_skew_after_persist() {
        let h = Harness::fresh();
        h.branches.fail_create.store(true, Ordering::SeqCst);
        let request = PublishRequest {
            use_version_control: true,
            ..publish_request()
        };

        let err = h
            .engine()
            .publish(&request, &mut SilentReporter)
            .expect_err("branch create fails");

        assert!(matches!(err, LifecycleError::Branch { .. }));
        assert!(err.is_skew());
        // The registry and settings already moved; only the branch lagged.
        assert_eq!(h.registry.calls(), vec!["create widget"]);
        assert!(h.settings.current().expect("saved").is_published());
    }

    #[test]
    fn major_version_conflict_short_circuits() {
        let h = Harness {
            branches: FakeBranches::with_branch("v3"),
            ..Harness::published(2, true)
        };

        let err = h
            .engine()
            .new_major_version(&mut SilentReporter)
            .expect_err("conflict");

        match err {
            LifecycleError::VersionConflict { version } => assert_eq!(version, 3),
            other => panic!("expected VersionConflict, got {other:?}"),
        }
        assert!(h.registry.calls().is_empty());
        assert_eq!(h.settings.current().expect("settings").active_version, 2);
        assert_eq!(h.branches.ops(), vec!["exists v3"]);
    }

    #[test]
    fn major_version_advances_in_order() {
        let h = Harness::published(1, true);

        let outcome = h
            .engine()
            .new_major_version(&mut SilentReporter)
            .expect("major");

        assert_eq!(outcome.previous_version, 1);
        assert_eq!(outcome.version, 2);
        assert_eq!(outcome.branch.as_deref(), Some("v2"));
        assert_eq!(h.settings.current().expect("settings").active_version, 2);
        // Pre-check, then claim, then track the persisted state.
        assert_eq!(h.branches.ops(), vec!["exists v2", "create v2", "advance v2"]);
        assert_eq!(h.registry.calls(), vec!["major abc123 v2"]);
    }

    #[test]
    fn major_version_without_version_control_skips_branches() {
        let h = Harness::published(4, false);

        let outcome = h
            .engine()
            .new_major_version(&mut SilentReporter)
            .expect("major");

        assert_eq!(outcome.version, 5);
        assert!(outcome.branch.is_none());
        assert!(h.branches.ops().is_empty());
    }

    #[test]
    fn major_version_requires_publish() {
        let h = Harness::fresh();
        let err = h
            .engine()
            .new_major_version(&mut SilentReporter)
            .expect_err("unpublished");

        assert!(matches!(err, LifecycleError::Precondition(_)));
        assert!(h.registry.calls().is_empty());
    }

    #[test]
    fn update_toggles_visibility() {
        let h = Harness::published(1, false);

        let outcome = h
            .engine()
            .update(
                &UpdateRequest {
                    toggle_public: true,
                    unminified: false,
                },
                &mut SilentReporter,
            )
            .expect("update");

        assert!(outcome.is_public);
        assert_eq!(outcome.version, 1);
        let saved = h.settings.current().expect("settings");
        assert!(saved.is_public);
        assert_eq!(saved.active_version, 1);
    }

    #[test]
    fn update_twice_restores_visibility() {
        let h = Harness::published(1, false);
        let request = UpdateRequest {
            toggle_public: true,
            unminified: false,
        };

        h.engine()
            .update(&request, &mut SilentReporter)
            .expect("first update");
        h.engine()
            .update(&request, &mut SilentReporter)
            .expect("second update");

        assert!(!h.settings.current().expect("settings").is_public);
    }

    #[test]
    fn update_replay_is_idempotent() {
        let h = Harness::published(2, false);
        let request = UpdateRequest::default();

        h.engine()
            .update(&request, &mut SilentReporter)
            .expect("first");
        let after_first = h.settings.current();
        h.engine()
            .update(&request, &mut SilentReporter)
            .expect("replay");

        let calls = h.registry.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
        assert_eq!(h.settings.current(), after_first);
    }

    #[test]
    fn update_minifies_by_default() {
        let h = Harness::published(1, false);

        h.engine()
            .update(&UpdateRequest::default(), &mut SilentReporter)
            .expect("update");

        let call = &h.registry.calls()[0];
        assert!(!call.contains("// block entry"));
        assert!(call.contains("render: () => 1,"));
    }

    #[test]
    fn update_sends_raw_code_when_asked() {
        let h = Harness::published(1, false);

        let outcome = h
            .engine()
            .update(
                &UpdateRequest {
                    toggle_public: false,
                    unminified: true,
                },
                &mut SilentReporter,
            )
            .expect("update");

        assert!(!outcome.minified);
        assert!(h.registry.calls()[0].contains("// block entry"));
    }

    #[test]
    fn update_advances_branch_when_version_control() {
        let h = Harness {
            branches: FakeBranches::with_branch("v3"),
            ..Harness::published(3, true)
        };

        h.engine()
            .update(&UpdateRequest::default(), &mut SilentReporter)
            .expect("update");

        assert_eq!(h.branches.ops(), vec!["advance v3"]);
    }

    #[test]
    fn update_settings_failure_is_skew() {
        let h = Harness::published(1, false);
        h.settings.fail_saves.store(true, Ordering::SeqCst);

        let err = h
            .engine()
            .update(&UpdateRequest::default(), &mut SilentReporter)
            .expect_err("save fails");

        assert!(matches!(err, LifecycleError::LocalPersistence { .. }));
        assert!(err.is_skew());
        // The remote call already happened; that is the documented skew.
        assert_eq!(h.registry.calls().len(), 1);
    }

    #[test]
    fn release_keeps_version() {
        let h = Harness::published(1, false);

        let outcome = h
            .engine()
            .release(Some("hotfix note"), &mut SilentReporter)
            .expect("release");

        assert_eq!(outcome.version, 1);
        assert_eq!(outcome.note.as_deref(), Some("hotfix note"));
        assert_eq!(
            h.registry.calls(),
            vec!["release abc123 v1 note=Some(\"hotfix note\")"]
        );
        assert_eq!(h.settings.current().expect("settings").active_version, 1);
        assert!(h.branches.ops().is_empty());
    }

    #[test]
    fn rollback_touches_nothing_locally() {
        let h = Harness::published(1, false);
        let before = h.settings.current();

        let outcome = h.engine().rollback(&mut SilentReporter).expect("rollback");

        assert_eq!(outcome.version, 1);
        assert_eq!(h.registry.calls(), vec!["rollback abc123 v1"]);
        assert_eq!(h.settings.current(), before);
        assert!(h.branches.ops().is_empty());
    }

    #[test]
    fn details_is_a_pure_read() {
        let h = Harness::published(2, true);

        let first = h.engine().block_details().expect("details");
        let second = h.engine().block_details().expect("details");
        let third = h.engine().block_details().expect("details");

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(first.active_version, 2);
        assert_eq!(first.display_name.as_deref(), Some("Widget"));
        assert!(h.registry.calls().is_empty());
        assert!(h.branches.ops().is_empty());
    }

    #[test]
    fn details_default_to_version_one() {
        let h = Harness::fresh();
        let details = h.engine().block_details().expect("details");

        assert_eq!(details.active_version, 1);
        assert!(details.display_name.is_none());
    }

    #[test]
    fn status_lists_remote_branches() {
        let h = Harness::published(2, true);

        let report = h.engine().status(&mut SilentReporter).expect("status");

        assert_eq!(report.active_version, 2);
        assert_eq!(report.remote_branches, vec!["v1", "v2"]);
        assert_eq!(h.registry.calls(), vec!["branches abc123"]);
    }

    #[test]
    fn status_requires_publish() {
        let h = Harness::fresh();
        assert!(matches!(
            h.engine().status(&mut SilentReporter),
            Err(LifecycleError::Precondition(_))
        ));
    }
}
