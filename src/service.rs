// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Synchronization triggers.
//!
//! The project service is the seam between configuration changes and mirror
//! reconciliation. It always commits to the configuration store first, then
//! asks the synchronizer to catch the mirror up:
//!
//! - Creating a project queues a background clone. The caller does not wait
//!   for it, and only learns about its outcome through logs or queue reports.
//! - Editing a project changes remote, branch, and directory name of its
//!   mirror in that order, while the caller waits.
//! - Removing a project deletes its mirror, while the caller waits.
//!
//! A failed reconciliation never rolls the committed record back. The caller
//! gets a plain sentence describing what to fix by hand instead.

use crate::{
    project::{Project, ProjectAttrs, ProjectId},
    queue::{CloneQueue, QueueError},
    shell::{ProcessRunner, ShellRunner},
    store::{ProjectStore, StoreError},
    sync::{SyncError, Synchronizer},
};

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Project configuration changes that keep mirrors in line.
#[derive(Debug)]
pub struct ProjectService<S, R = ProcessRunner>
where
    S: ProjectStore,
    R: ShellRunner,
{
    store: Arc<S>,
    sync: Arc<Synchronizer<S, R>>,
    queue: CloneQueue,
}

impl<S, R> ProjectService<S, R>
where
    S: ProjectStore,
    R: ShellRunner,
{
    /// Construct new project service.
    ///
    /// Uses the store the synchronizer reads from, such that both always see
    /// the same records.
    pub fn new(sync: Arc<Synchronizer<S, R>>, queue: CloneQueue) -> Self {
        Self {
            store: Arc::clone(sync.store()),
            sync,
            queue,
        }
    }

    pub fn synchronizer(&self) -> &Arc<Synchronizer<S, R>> {
        &self.sync
    }

    pub fn queue(&self) -> &CloneQueue {
        &self.queue
    }

    /// Create project and queue the clone of its mirror.
    ///
    /// # Errors
    ///
    /// - Return [`ServiceError::NameTaken`] if the name is already in use.
    /// - Return [`ServiceError::Store`] if the record cannot be stored.
    /// - Return [`ServiceError::Queue`] if the clone cannot be queued. The
    ///   record stays committed in that case.
    #[instrument(skip(self, attrs), fields(name = %attrs.name), level = "debug")]
    pub async fn add(&self, attrs: ProjectAttrs) -> Result<ProjectId> {
        if self.store.project_by_name(&attrs.name).await?.is_some() {
            return Err(ServiceError::NameTaken(attrs.name));
        }

        let id = self.store.insert(attrs).await.map_err(name_taken)?;
        info!(project_id = %id, "project created");
        self.queue.submit(id).await?;

        Ok(id)
    }

    /// Edit project, then re-target its mirror to match.
    ///
    /// The mirror is addressed by the name stored before the edit, because
    /// that is where it still lives until renamed.
    ///
    /// # Errors
    ///
    /// - Return [`ServiceError::NotFound`] if the project does not exist.
    /// - Return [`ServiceError::NameTaken`] if another project uses the name.
    /// - Return [`ServiceError::ChangeRemote`], [`ServiceError::ChangeBranch`],
    ///   or [`ServiceError::Rename`] for the first reconciliation step that
    ///   failed. The edited record stays committed.
    #[instrument(skip(self, edited), fields(project_id = %edited.id), level = "debug")]
    pub async fn edit(&self, edited: Project) -> Result<()> {
        let stored = self
            .store
            .project(edited.id)
            .await?
            .ok_or(ServiceError::NotFound(edited.id))?;
        if let Some(owner) = self.store.project_by_name(edited.name()).await? {
            if owner.id != edited.id {
                return Err(ServiceError::NameTaken(edited.name().to_owned()));
            }
        }

        let changes = stored.diff(&edited);
        self.store.update(edited).await.map_err(name_taken)?;
        info!(project_id = %stored.id, "project updated");
        if changes.is_empty() {
            debug!(project_id = %stored.id, "mirror unaffected by edit");
            return Ok(());
        }

        if let Some(url) = &changes.url {
            self.sync
                .change_remote(&stored, url)
                .await
                .map_err(ServiceError::ChangeRemote)?;
        }

        if let Some(branch) = &changes.branch {
            self.sync
                .change_branch(&stored, branch)
                .await
                .map_err(ServiceError::ChangeBranch)?;
        }

        if let Some(name) = &changes.name {
            self.sync
                .rename(&stored, name)
                .await
                .map_err(ServiceError::Rename)?;
        }

        Ok(())
    }

    /// Delete project, then its mirror.
    ///
    /// # Errors
    ///
    /// - Return [`ServiceError::NotFound`] if the project does not exist.
    /// - Return [`ServiceError::RemoveMirror`] if the mirror cannot be
    ///   deleted. The record stays deleted, leaving the mirror orphaned.
    #[instrument(skip(self), level = "debug")]
    pub async fn remove(&self, id: ProjectId) -> Result<()> {
        let stored = self
            .store
            .project(id)
            .await?
            .ok_or(ServiceError::NotFound(id))?;
        self.store.delete(id).await?;
        info!(project_id = %id, "project removed");

        self.sync.remove(&stored).await.map_err(|err| {
            warn!(project_id = %id, "mirror of removed project is orphaned: {err}");
            ServiceError::RemoveMirror(err)
        })?;

        Ok(())
    }

    /// List branches of a remote for picking a tracked branch.
    ///
    /// # Errors
    ///
    /// - Return [`ServiceError::RemoteBranches`] if the remote cannot be
    ///   listed.
    pub async fn remote_branches(&self, url: &str) -> Result<Vec<String>> {
        self.sync
            .remote_branches(url)
            .await
            .map_err(ServiceError::RemoteBranches)
    }

    /// Stop the clone queue after draining it.
    pub async fn shutdown(self) {
        self.queue.shutdown().await;
    }
}

fn name_taken(err: StoreError) -> ServiceError {
    match err {
        StoreError::NameTaken(name) => ServiceError::NameTaken(name),
        err => ServiceError::Store(err),
    }
}

/// Project service error types.
///
/// Messages are meant to be shown to whoever made the change as is.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No project exists with the given identifier.
    #[error("the project {0} does not exist")]
    NotFound(ProjectId),

    /// Project name is already used by another project.
    #[error("the project name {0:?} already exists")]
    NameTaken(String),

    /// Configuration store fails.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Clone of a new project cannot be queued.
    #[error("project saved, but its repository could not be queued for cloning: {0}")]
    Queue(#[from] QueueError),

    #[error("project remote change failed, you can do it manually, reason: {0}")]
    ChangeRemote(#[source] SyncError),

    #[error("project branch checkout failed, you can do it manually, reason: {0}")]
    ChangeBranch(#[source] SyncError),

    #[error("mirror folder rename failed, you can do it manually, reason: {0}")]
    Rename(#[source] SyncError),

    #[error("delete mirror folder failed, you can do it manually, reason: {0}")]
    RemoveMirror(#[source] SyncError),

    #[error("failed to list remote branches: {0}")]
    RemoteBranches(#[source] SyncError),
}

/// Friendly result alias :3
pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
