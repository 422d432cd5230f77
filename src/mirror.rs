// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Mirror state inspection.
//!
//! A __mirror__ is the local working copy of a project's remote repository,
//! living at `<repository root>/<project name>`. Mirror state is never
//! persisted anywhere. The directory itself is the state, so it gets derived
//! from the filesystem whenever an operation needs it.
//!
//! Stat errors other than "not found" are reported as errors rather than
//! being mistaken for an absent mirror. Otherwise a permission problem could
//! trigger a fresh clone over, or a deletion of, something that exists.

use git2::Repository;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Observed state of a mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    /// Nothing exists at the mirror path.
    Absent,

    /// A directory exists at the mirror path.
    Present,
}

/// Determine state of mirror at target path.
///
/// Follows symbolic links, such that a dangling link counts as absent.
///
/// # Errors
///
/// - Return [`MirrorError::Obstructed`] if something other than a directory
///   sits at the path.
/// - Return [`MirrorError::Probe`] if the path cannot be inspected.
pub async fn probe(path: impl AsRef<Path>) -> Result<MirrorState> {
    let path = path.as_ref();
    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(MirrorState::Present),
        Ok(_) => Err(MirrorError::Obstructed {
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(MirrorState::Absent),
        Err(err) => Err(MirrorError::Probe {
            source: err,
            path: path.to_path_buf(),
        }),
    }
}

/// Snapshot of what a present mirror is checked out to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorInfo {
    /// Short name of the checked out branch, `None` when HEAD is detached.
    pub branch: Option<String>,

    /// URL of the origin remote, `None` when there is no origin.
    pub origin: Option<String>,
}

impl MirrorInfo {
    /// Inspect mirror at target path through libgit2.
    ///
    /// # Errors
    ///
    /// - Return [`MirrorError::Git2`] if the path is not a readable
    ///   repository.
    pub fn inspect(path: impl AsRef<Path>) -> Result<Self> {
        let repository = Repository::open(path.as_ref())?;
        let branch = repository
            .head()
            .ok()
            .filter(|head| head.is_branch())
            .and_then(|head| head.shorthand().map(ToOwned::to_owned));
        let origin = repository
            .find_remote("origin")
            .ok()
            .and_then(|remote| remote.url().map(ToOwned::to_owned));

        Ok(Self { branch, origin })
    }
}

/// Mirror inspection error types.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// Mirror path cannot be inspected.
    #[error("failed to inspect mirror path {:?}", path.display())]
    Probe {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Mirror path holds something that is not a directory.
    #[error("mirror path {:?} exists but is not a directory", path.display())]
    Obstructed { path: PathBuf },

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = MirrorError> = std::result::Result<T, E>;
