// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine default locations for the repository root and the settings file.
//! None of these functions check whether the returned path actually exists.

use std::path::PathBuf;

/// Determine default absolute path to the repository root.
///
/// Uses XDG Base Directory path `$XDG_DATA_HOME/mirrorsync/repository`. Every
/// project mirror lives directly beneath this directory under the project's
/// name.
///
/// # Errors
///
/// - Return [`NoWayHome`] if data directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_repository_root() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("mirrorsync").join("repository"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to the settings file.
///
/// Uses `$XDG_CONFIG_HOME/mirrorsync/settings.toml`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory path cannot be
///   determined.
pub fn default_settings_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("mirrorsync").join("settings.toml"))
        .ok_or(NoWayHome)
}

/// Default path to the project manifest, next to the settings file.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory path cannot be
///   determined.
pub fn default_manifest_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("mirrorsync").join("projects.toml"))
        .ok_or(NoWayHome)
}

/// No way to determine user's base directories.
///
/// # See Also
///
/// - [`dirs::data_dir`](https://docs.rs/dirs/latest/dirs/fn.data_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's data or configuration directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
