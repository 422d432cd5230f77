// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project configuration store.
//!
//! The configuration store is the authoritative home of every project record.
//! Mirrors on disk are derived from it, never the other way around. The
//! synchronizer only reads from the store, while the trigger layer in
//! [`service`](crate::service) commits changes to it before asking the
//! synchronizer to catch up.
//!
//! # Manifest Layout
//!
//! A store can be seeded from a TOML manifest listing projects as an array
//! of tables:
//!
//! ```toml
//! [[project]]
//! id = 1
//! name = "api"
//! url = "https://example.com/api.git"
//! branch = "main"
//! path = "/var/www/api"
//! ```

use crate::project::{Project, ProjectAttrs, ProjectId};

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    future::Future,
    str::FromStr,
};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Layer of indirection for project record access.
pub trait ProjectStore: Send + Sync + 'static {
    /// Fetch project by identifier.
    ///
    /// A missing project is `Ok(None)`, not an error.
    fn project(&self, id: ProjectId) -> impl Future<Output = Result<Option<Project>>> + Send;

    /// Fetch project by its unique name.
    fn project_by_name(&self, name: &str)
        -> impl Future<Output = Result<Option<Project>>> + Send;

    /// Insert new project, returning its assigned identifier.
    fn insert(&self, attrs: ProjectAttrs) -> impl Future<Output = Result<ProjectId>> + Send;

    /// Replace stored record of an existing project.
    fn update(&self, project: Project) -> impl Future<Output = Result<()>> + Send;

    /// Delete existing project.
    fn delete(&self, id: ProjectId) -> impl Future<Output = Result<()>> + Send;
}

/// Project store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: i64,
    projects: BTreeMap<ProjectId, Project>,
}

impl MemoryInner {
    fn name_owner(&self, name: &str) -> Option<ProjectId> {
        self.projects
            .values()
            .find(|project| project.name() == name)
            .map(|project| project.id)
    }
}

impl MemoryStore {
    /// Construct new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct store seeded with the projects of a manifest.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NameTaken`] if two projects share a name.
    /// - Return [`StoreError::DuplicateId`] if two projects share an id.
    pub fn from_manifest(manifest: ProjectManifest) -> Result<Self> {
        let mut inner = MemoryInner::default();
        let mut names = HashSet::new();
        for project in manifest.projects {
            if !names.insert(project.name().to_owned()) {
                return Err(StoreError::NameTaken(project.name().to_owned()));
            }

            let id = project.id;
            inner.next_id = inner.next_id.max(id.0);
            if inner.projects.insert(id, project).is_some() {
                return Err(StoreError::DuplicateId(id));
            }
        }

        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// List every stored project ordered by identifier.
    pub async fn projects(&self) -> Vec<Project> {
        self.inner.read().await.projects.values().cloned().collect()
    }
}

impl ProjectStore for MemoryStore {
    async fn project(&self, id: ProjectId) -> Result<Option<Project>> {
        Ok(self.inner.read().await.projects.get(&id).cloned())
    }

    async fn project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let inner = self.inner.read().await;
        Ok(inner
            .name_owner(name)
            .and_then(|id| inner.projects.get(&id).cloned()))
    }

    #[instrument(skip(self, attrs), fields(name = %attrs.name), level = "debug")]
    async fn insert(&self, attrs: ProjectAttrs) -> Result<ProjectId> {
        let mut inner = self.inner.write().await;
        if inner.name_owner(&attrs.name).is_some() {
            return Err(StoreError::NameTaken(attrs.name));
        }

        inner.next_id += 1;
        let id = ProjectId(inner.next_id);
        inner.projects.insert(id, Project::new(id, attrs));
        debug!("inserted project {id}");

        Ok(id)
    }

    #[instrument(skip(self, project), fields(project_id = %project.id), level = "debug")]
    async fn update(&self, project: Project) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.projects.contains_key(&project.id) {
            return Err(StoreError::NotFound(project.id));
        }

        // INVARIANT: Project names stay unique across the store.
        if let Some(owner) = inner.name_owner(project.name()) {
            if owner != project.id {
                return Err(StoreError::NameTaken(project.name().to_owned()));
            }
        }

        inner.projects.insert(project.id, project);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, id: ProjectId) -> Result<()> {
        self.inner
            .write()
            .await
            .projects
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

/// Project manifest layout.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProjectManifest {
    /// Listing of project records.
    #[serde(rename = "project", default)]
    pub projects: Vec<Project>,
}

impl FromStr for ProjectManifest {
    type Err = StoreError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data).map_err(StoreError::Manifest)
    }
}

/// All possible error types for project store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No project exists with the given identifier.
    #[error("project {0} does not exist")]
    NotFound(ProjectId),

    /// Project name is already used by another project.
    #[error("project name {0:?} already exists")]
    NameTaken(String),

    /// Two projects share the same identifier.
    #[error("project id {0} is used more than once")]
    DuplicateId(ProjectId),

    /// Project manifest cannot be parsed.
    #[error(transparent)]
    Manifest(#[from] toml::de::Error),
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
