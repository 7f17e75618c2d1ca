use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use blockpub::artifact::FileArtifact;
use blockpub::config;
use blockpub::engine::{LifecycleEngine, PublishRequest, Reporter, UpdateRequest};
use blockpub::error::LifecycleError;
use blockpub::git::{GitBranches, is_git_repo};
use blockpub::registry::HttpRegistryClient;
use blockpub::settings::FileSettingsStore;

#[derive(Parser, Debug)]
#[command(name = "blockpub", version)]
#[command(about = "Stage, revise, release, and roll back blocks against a block registry")]
struct Cli {
    /// Workspace root containing .blockpub.toml and the build output.
    #[arg(long, default_value = ".")]
    manifest_dir: PathBuf,

    /// Registry API base URL (overrides .blockpub.toml).
    #[arg(long)]
    api_base: Option<String>,

    /// Build artifact path, relative to the workspace root (overrides .blockpub.toml).
    #[arg(long)]
    artifact: Option<PathBuf>,

    /// Directory for the persisted block settings (overrides .blockpub.toml).
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Registry request timeout (e.g. 30s, 2m; overrides .blockpub.toml).
    #[arg(long)]
    timeout: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish the block for the first time.
    Publish {
        /// Block name; the published slug is derived from it.
        #[arg(long)]
        name: String,

        /// Catalog category.
        #[arg(long)]
        category: String,

        /// Track major versions as git branches.
        #[arg(long)]
        git: bool,
    },
    /// Push the current build to the staged version.
    Update {
        /// Flip the stored visibility flag.
        #[arg(long)]
        toggle_public: bool,

        /// Push the raw build output instead of the minified form.
        #[arg(long)]
        unminified: bool,
    },
    /// Promote the staged version to production.
    Release {
        /// Release note recorded with the version.
        #[arg(long)]
        note: Option<String>,
    },
    /// Roll production back toward the previously released state.
    Rollback,
    /// Claim the next major version.
    Major,
    /// Print the locally recorded version and name.
    Details,
    /// Compare local state against the registry's version branches.
    Status,
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("[error] {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// Exit codes: 1 generic failure, 2 precondition, 3 version conflict,
/// 4 registry, 5 settings skew, 6 branch skew.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<LifecycleError>() {
        Some(LifecycleError::Precondition(_)) => 2,
        Some(LifecycleError::VersionConflict { .. }) => 3,
        Some(LifecycleError::Registry(_)) => 4,
        Some(LifecycleError::LocalPersistence { .. }) => 5,
        Some(LifecycleError::Branch { .. }) => 6,
        None => 1,
    }
}

fn run(cli: &Cli) -> Result<()> {
    let root = &cli.manifest_dir;
    let config = config::load_config(root)?;

    let api_base = cli
        .api_base
        .clone()
        .unwrap_or_else(|| config.registry.api_base.clone());
    let timeout = match &cli.timeout {
        Some(raw) => humantime::parse_duration(raw)
            .with_context(|| format!("invalid duration: {raw}"))?,
        None => config.registry.timeout,
    };
    let artifact_path = resolve_in(root, cli.artifact.as_ref().unwrap_or(&config.artifact));
    let state_dir = resolve_in(root, cli.state_dir.as_ref().unwrap_or(&config.state_dir));

    let settings = FileSettingsStore::new(&state_dir);
    let registry = HttpRegistryClient::with_timeout(&api_base, timeout)?;
    let branches = GitBranches::new(root);
    let artifact = FileArtifact::new(&artifact_path);

    let engine = LifecycleEngine::new(&settings, &registry, &branches, &artifact);
    let mut reporter = CliReporter;

    match &cli.cmd {
        Commands::Publish {
            name,
            category,
            git,
        } => {
            if *git && !is_git_repo(root) {
                reporter.warn("workspace is not a git repository; branch tracking will fail");
            }
            let outcome = engine.publish(
                &PublishRequest {
                    name: name.clone(),
                    category: category.clone(),
                    category_set: config.categories.clone(),
                    use_version_control: *git,
                },
                &mut reporter,
            )?;
            println!("id: {}", outcome.id);
            println!("name: {} ({})", outcome.display_name, outcome.published_name);
            println!("version: {}", outcome.version);
        }
        Commands::Update {
            toggle_public,
            unminified,
        } => {
            let outcome = engine.update(
                &UpdateRequest {
                    toggle_public: *toggle_public,
                    unminified: *unminified,
                },
                &mut reporter,
            )?;
            println!("version: {}", outcome.version);
            println!("public: {}", outcome.is_public);
            println!("minified: {}", outcome.minified);
        }
        Commands::Release { note } => {
            let outcome = engine.release(note.as_deref(), &mut reporter)?;
            println!("version: {}", outcome.version);
            if let Some(note) = &outcome.note {
                println!("note: {note}");
            }
        }
        Commands::Rollback => {
            let outcome = engine.rollback(&mut reporter)?;
            println!("version: {}", outcome.version);
        }
        Commands::Major => {
            let outcome = engine.new_major_version(&mut reporter)?;
            println!("version: {} (was {})", outcome.version, outcome.previous_version);
            if let Some(branch) = &outcome.branch {
                println!("branch: {branch}");
            }
        }
        Commands::Details => {
            let details = engine.block_details()?;
            println!("version: {}", details.active_version);
            match &details.display_name {
                Some(name) => println!("name: {name}"),
                None => println!("name: (unpublished)"),
            }
        }
        Commands::Status => {
            let report = engine.status(&mut reporter)?;
            println!("version: {}", report.active_version);
            println!("name: {}", report.display_name);
            println!("public: {}", report.is_public);
            println!("remote_branches: {}", report.remote_branches.join(", "));
        }
    }

    Ok(())
}

fn resolve_in(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
