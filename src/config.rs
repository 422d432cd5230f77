// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the settings file that mirrorsync uses to simplify
//! the process of serialization and deserialization. File I/O is left to the
//! caller to figure out.

use crate::path::default_repository_root;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Settings layout.
///
/// # General Layout
///
/// Settings are split into three sections. The repository section decides
/// where mirrors live, and which branch a fresh clone is assumed to already
/// sit on. The process section controls how external VCS processes get
/// spawned. The queue section sizes the background clone queue.
///
/// Every key is optional.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Mirror placement.
    pub repository: RepositorySettings,

    /// External process limits.
    pub process: ProcessSettings,

    /// Background clone queue sizing.
    pub queue: QueueSettings,
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on repository root field.
        settings.repository.root = RepositoryRoot::new(
            shellexpand::full(settings.repository.root.to_string().as_str())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned(),
        );

        settings.validate()?;

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

impl Settings {
    fn validate(&self) -> Result<()> {
        if self.repository.default_branch.trim().is_empty() {
            return Err(ConfigError::Invalid("repository.default_branch"));
        }

        if self.process.git.trim().is_empty() {
            return Err(ConfigError::Invalid("process.git"));
        }

        if self.process.max_concurrent == 0 {
            return Err(ConfigError::Invalid("process.max_concurrent"));
        }

        if self.queue.capacity == 0 {
            return Err(ConfigError::Invalid("queue.capacity"));
        }

        if self.queue.workers == 0 {
            return Err(ConfigError::Invalid("queue.workers"));
        }

        Ok(())
    }
}

/// Mirror placement settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// Directory holding one mirror per project.
    pub root: RepositoryRoot,

    /// Branch a fresh clone is expected to check out on its own.
    ///
    /// Projects tracking any other branch get an explicit tracking checkout
    /// right after their clone.
    pub default_branch: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            root: RepositoryRoot::default(),
            default_branch: "master".into(),
        }
    }
}

/// External process settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessSettings {
    /// Name or path of the git binary.
    pub git: String,

    /// Upper bound on external processes running at once.
    pub max_concurrent: usize,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            git: "git".into(),
            max_concurrent: 8,
        }
    }
}

/// Background clone queue settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Pending clone requests accepted before submitters must wait.
    pub capacity: usize,

    /// Clone requests processed at once.
    pub workers: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: 64,
            workers: 4,
        }
    }
}

/// Directory acting as the repository root.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct RepositoryRoot(PathBuf);

impl RepositoryRoot {
    /// Construct new repository root.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat repository root as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }

    /// Path of the mirror belonging to a project name.
    pub fn mirror_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.0.join(name)
    }
}

impl Default for RepositoryRoot {
    fn default() -> Self {
        Self(default_repository_root().unwrap_or_else(|_| PathBuf::from("repository")))
    }
}

impl Display for RepositoryRoot {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Setting holds a value mirrorsync cannot work with.
    #[error("invalid value for setting {0:?}")]
    Invalid(&'static str),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("MIRRORS", "/srv/mirrors")])]
    fn deserialize_settings() -> anyhow::Result<()> {
        let result: Settings = r#"
            [repository]
            root = "$MIRRORS/repository"
            default_branch = "main"

            [process]
            git = "/usr/bin/git"
            max_concurrent = 2

            [queue]
            capacity = 16
            workers = 1
        "#
        .parse()?;

        let expect = Settings {
            repository: RepositorySettings {
                root: RepositoryRoot::new("/srv/mirrors/repository"),
                default_branch: "main".into(),
            },
            process: ProcessSettings {
                git: "/usr/bin/git".into(),
                max_concurrent: 2,
            },
            queue: QueueSettings {
                capacity: 16,
                workers: 1,
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_partial_settings_uses_defaults() -> anyhow::Result<()> {
        let result: Settings = r#"
            [repository]
            root = "/srv/mirrors"
        "#
        .parse()?;

        assert_eq!(result.repository.default_branch, "master");
        assert_eq!(result.process, ProcessSettings::default());
        assert_eq!(result.queue, QueueSettings::default());

        Ok(())
    }

    #[test]
    fn reject_zero_workers() {
        let result = r#"
            [queue]
            workers = 0
        "#
        .parse::<Settings>();

        assert!(matches!(result, Err(ConfigError::Invalid("queue.workers"))));
    }

    #[test]
    fn serialize_settings() {
        let result = Settings {
            repository: RepositorySettings {
                root: RepositoryRoot::new("/srv/mirrors"),
                default_branch: "master".into(),
            },
            process: ProcessSettings::default(),
            queue: QueueSettings::default(),
        }
        .to_string();

        let expect = indoc! {r#"
            [repository]
            root = "/srv/mirrors"
            default_branch = "master"

            [process]
            git = "git"
            max_concurrent = 8

            [queue]
            capacity = 64
            workers = 4
        "#};

        assert_eq!(result, expect);
    }
}
