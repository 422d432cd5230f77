// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project configuration records.
//!
//! A __project__ binds a remote repository and a tracked branch to a deploy
//! target. The record itself is owned by the configuration store. The
//! synchronizer only ever reads the id, name, URL, and branch of a project.
//! Everything else is carried through untouched.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Unique, immutable project identifier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

impl Display for ProjectId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}", self.0)
    }
}

/// Stored project record.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Project {
    /// Store assigned identifier.
    pub id: ProjectId,

    #[serde(flatten)]
    pub attrs: ProjectAttrs,
}

impl Project {
    /// Construct new project record from its identifier and attributes.
    pub fn new(id: ProjectId, attrs: ProjectAttrs) -> Self {
        Self { id, attrs }
    }

    /// Unique project name, also the name of its mirror directory.
    pub fn name(&self) -> &str {
        &self.attrs.name
    }

    /// Remote repository address.
    pub fn url(&self) -> &str {
        &self.attrs.url
    }

    /// Tracked branch.
    pub fn branch(&self) -> &str {
        &self.attrs.branch
    }

    /// Determine which mirror-relevant fields differ in an edited record.
    pub fn diff(&self, edited: &Project) -> ProjectChanges {
        ProjectChanges {
            url: (self.url() != edited.url()).then(|| edited.url().to_owned()),
            branch: (self.branch() != edited.branch()).then(|| edited.branch().to_owned()),
            name: (self.name() != edited.name()).then(|| edited.name().to_owned()),
        }
    }
}

/// Project attributes without the store assigned identifier.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectAttrs {
    pub name: String,
    pub url: String,
    pub branch: String,

    /// Deploy target path on remote servers.
    pub path: String,
    pub symlink_path: String,
    pub environment: String,
    pub after_pull_script_mode: String,
    pub after_pull_script: String,
    pub after_deploy_script_mode: String,
    pub after_deploy_script: String,
    pub rsync_option: String,
    pub server_ids: Vec<i64>,
    pub user_ids: Vec<i64>,
}

impl ProjectAttrs {
    /// Construct attributes with only the mirror-relevant fields filled in.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            branch: branch.into(),
            ..Default::default()
        }
    }
}

/// Mirror-relevant differences between a stored and an edited project.
///
/// Each field holds the new value when it changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProjectChanges {
    pub url: Option<String>,
    pub branch: Option<String>,
    pub name: Option<String>,
}

impl ProjectChanges {
    /// Nothing the mirror cares about changed.
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.branch.is_none() && self.name.is_none()
    }
}
