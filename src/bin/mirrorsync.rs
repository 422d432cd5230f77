// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use mirrorsync::{
    mirror::{MirrorInfo, MirrorState},
    path::{default_manifest_path, default_settings_path},
    CloneOutcome, CloneQueue, MemoryStore, ProjectManifest, Reconciled, Settings, Synchronizer,
};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::{collections::HashSet, io::ErrorKind, path::PathBuf, process::exit, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  mirrorsync [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let workspace = Workspace::load(&self.global).await?;
        match self.command {
            Command::Sync(opts) => run_sync(workspace, opts).await,
            Command::Branches(opts) => run_branches(workspace, opts).await,
            Command::Status => run_status(workspace).await,
            Command::Remove(opts) => run_remove(workspace, opts).await,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Clone mirrors of projects that do not have one yet.
    #[command(override_usage = "mirrorsync sync [options] [<project_name>]...")]
    Sync(SyncOptions),

    /// List branches of a remote.
    #[command(override_usage = "mirrorsync branches [options] <url>")]
    Branches(BranchesOptions),

    /// Show mirror state of every project.
    #[command(override_usage = "mirrorsync status [options]")]
    Status,

    /// Delete mirror of project, leaving its record alone.
    #[command(override_usage = "mirrorsync remove [options] <project_name>")]
    Remove(RemoveOptions),
}

#[derive(Args, Clone, Debug)]
struct GlobalOptions {
    /// Path to settings file.
    #[arg(short, long, global = true, value_name = "path")]
    pub settings: Option<PathBuf>,

    /// Path to project manifest.
    #[arg(short, long, global = true, value_name = "path")]
    pub manifest: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SyncOptions {
    /// Names of projects to sync, every project if none given.
    #[arg(value_name = "project_name")]
    pub project_names: Vec<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct BranchesOptions {
    /// URL of remote to list branches of.
    #[arg(required = true, value_name = "url")]
    pub url: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RemoveOptions {
    /// Name of project to delete mirror of.
    #[arg(required = true, value_name = "project_name")]
    pub project_name: String,
}

/// Settings and project records shared by every command.
struct Workspace {
    settings: Settings,
    store: Arc<MemoryStore>,
}

impl Workspace {
    async fn load(opts: &GlobalOptions) -> Result<Self> {
        let settings_path = match &opts.settings {
            Some(path) => path.clone(),
            None => default_settings_path()?,
        };
        let settings = match tokio::fs::read_to_string(&settings_path).await {
            Ok(data) => data
                .parse::<Settings>()
                .with_context(|| format!("failed to parse settings {settings_path:?}"))?,
            Err(err) if err.kind() == ErrorKind::NotFound && opts.settings.is_none() => {
                Settings::default()
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read settings {settings_path:?}"))
            }
        };

        let manifest_path = match &opts.manifest {
            Some(path) => path.clone(),
            None => default_manifest_path()?,
        };
        let manifest = tokio::fs::read_to_string(&manifest_path)
            .await
            .with_context(|| format!("failed to read manifest {manifest_path:?}"))?
            .parse::<ProjectManifest>()
            .with_context(|| format!("failed to parse manifest {manifest_path:?}"))?;
        let store = Arc::new(MemoryStore::from_manifest(manifest)?);

        Ok(Self { settings, store })
    }

    fn synchronizer(&self) -> Synchronizer<MemoryStore> {
        Synchronizer::from_settings(&self.settings, Arc::clone(&self.store))
    }
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

async fn run_sync(workspace: Workspace, opts: SyncOptions) -> Result<()> {
    let projects = workspace.store.projects().await;
    let wanted = opts
        .project_names
        .iter()
        .map(String::as_str)
        .collect::<HashSet<_>>();
    for name in &wanted {
        if !projects.iter().any(|project| project.name() == *name) {
            return Err(anyhow!("project {name:?} is not in the manifest"));
        }
    }

    let sync = Arc::new(workspace.synchronizer());
    let queue = CloneQueue::spawn(Arc::clone(&sync), &workspace.settings.queue);
    let ids = projects
        .iter()
        .filter(|project| wanted.is_empty() || wanted.contains(project.name()))
        .map(|project| project.id);
    let reports = queue.submit_all(ids).await;
    queue.shutdown().await;

    let mut failed = 0usize;
    for report in reports? {
        match report.result {
            Ok(CloneOutcome::Cloned { .. }) | Ok(CloneOutcome::AlreadyPresent) => {}
            Ok(CloneOutcome::ProjectMissing) => {
                warn!(project_id = %report.project_id, "project vanished before clone")
            }
            Err(_) => failed += 1,
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed} project mirror(s) failed to sync"));
    }

    Ok(())
}

async fn run_branches(workspace: Workspace, opts: BranchesOptions) -> Result<()> {
    let branches = workspace.synchronizer().remote_branches(&opts.url).await?;
    for branch in branches {
        println!("{branch}");
    }

    Ok(())
}

async fn run_status(workspace: Workspace) -> Result<()> {
    let sync = workspace.synchronizer();
    for project in workspace.store.projects().await {
        let state = match sync.mirror_state(project.name()).await {
            Ok(state) => state,
            Err(err) => {
                println!("{}: {err}", project.name());
                continue;
            }
        };

        match state {
            MirrorState::Absent => println!("{}: absent", project.name()),
            MirrorState::Present => {
                let path = sync.mirror_path(project.name())?;
                match MirrorInfo::inspect(&path) {
                    Ok(info) => {
                        let branch = info.branch.as_deref().unwrap_or("(detached)");
                        let origin = info.origin.as_deref().unwrap_or("(no origin)");
                        let drift = if branch != project.branch() || origin != project.url() {
                            " [drifted]"
                        } else {
                            ""
                        };
                        println!("{}: {branch} {origin}{drift}", project.name());
                    }
                    Err(err) => println!("{}: present, {err}", project.name()),
                }
            }
        }
    }

    Ok(())
}

async fn run_remove(workspace: Workspace, opts: RemoveOptions) -> Result<()> {
    let project = workspace
        .store
        .projects()
        .await
        .into_iter()
        .find(|project| project.name() == opts.project_name)
        .ok_or_else(|| anyhow!("project {:?} is not in the manifest", opts.project_name))?;

    match workspace.synchronizer().remove(&project).await? {
        Reconciled::Applied => info!("removed mirror of {:?}", opts.project_name),
        Reconciled::NoMirror => info!("project {:?} has no mirror", opts.project_name),
    }

    Ok(())
}
