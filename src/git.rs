// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Git command vocabulary.
//!
//! Mirrors are driven through the git binary rather than libgit2, so clones
//! and fetches pick up whatever credential helpers and SSH configuration the
//! host already has. This module only knows how to spell each subcommand.

use crate::shell::ShellCommand;

use std::{ffi::OsString, path::Path};

/// Builder of git invocations for a given git binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Git {
    program: OsString,
}

impl Git {
    /// Construct builder for target git binary.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// List branch heads of a remote: `git ls-remote -h <url>`.
    pub fn ls_remote_heads(&self, url: &str) -> ShellCommand {
        ShellCommand::new(&self.program).args(["ls-remote", "-h", url])
    }

    /// Clone remote into destination: `git clone <url> <dest>`.
    pub fn clone_repo(&self, url: &str, dest: &Path) -> ShellCommand {
        ShellCommand::new(&self.program)
            .args(["clone", url])
            .arg(dest)
    }

    /// Point origin of a mirror somewhere else.
    pub fn set_remote_url(&self, dir: &Path, url: &str) -> ShellCommand {
        ShellCommand::new(&self.program)
            .args(["remote", "set-url", "origin", url])
            .current_dir(dir)
    }

    /// Create local branch tracking its origin counterpart.
    pub fn checkout_tracking(&self, dir: &Path, branch: &str) -> ShellCommand {
        ShellCommand::new(&self.program)
            .args(["checkout", "-b", branch])
            .arg(format!("origin/{branch}"))
            .current_dir(dir)
    }

    /// Create or reset local branch to its origin counterpart, discarding
    /// local modifications.
    pub fn force_checkout_tracking(&self, dir: &Path, branch: &str) -> ShellCommand {
        ShellCommand::new(&self.program)
            .args(["checkout", "-f", "-B", branch])
            .arg(format!("origin/{branch}"))
            .current_dir(dir)
    }
}

impl Default for Git {
    fn default() -> Self {
        Self::new("git")
    }
}

/// Extract branch names from `git ls-remote -h` output.
///
/// Each line looks like `<sha>\trefs/heads/<branch>`. The branch is the last
/// path component of the last field.
pub fn parse_remote_branches(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().last())
        .filter_map(|reference| reference.rsplit('/').next())
        .filter(|branch| !branch.is_empty())
        .map(str::to_owned)
        .collect()
}
