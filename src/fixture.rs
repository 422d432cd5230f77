// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Scripted process runner for unit tests.
//!
//! Pretends to be git. A successful clone creates the destination directory,
//! a failing clone leaves a partial one behind, everything else only gets
//! recorded.

use crate::shell::{Result, ShellCommand, ShellOutcome, ShellRunner};

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio::sync::Notify;

/// Hold clones in flight until released.
#[derive(Debug, Default)]
pub(crate) struct CloneGate {
    pub(crate) started: Notify,
    pub(crate) release: Notify,
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedRunner {
    calls: Mutex<Vec<ShellCommand>>,
    failures: HashMap<String, String>,
    remote_heads: String,
    gate: Option<Arc<CloneGate>>,
    lock_root_after_clone: bool,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make every call of a git subcommand fail with target stderr.
    pub(crate) fn failing(mut self, subcommand: &str, stderr: &str) -> Self {
        self.failures.insert(subcommand.into(), stderr.into());
        self
    }

    pub(crate) fn with_remote_heads(mut self, stdout: &str) -> Self {
        self.remote_heads = stdout.into();
        self
    }

    pub(crate) fn gated(mut self, gate: Arc<CloneGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Make the directory holding a fresh clone read-only right after it.
    pub(crate) fn lock_root_after_clone(mut self) -> Self {
        self.lock_root_after_clone = true;
        self
    }

    /// Command lines run so far.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Git subcommands run so far.
    pub(crate) fn subcommands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|command| command.arguments().first())
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

impl ShellRunner for ScriptedRunner {
    async fn run(&self, command: ShellCommand) -> Result<ShellOutcome> {
        self.calls.lock().unwrap().push(command.clone());

        let args = command
            .arguments()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        let subcommand = args.first().cloned().unwrap_or_default();

        if subcommand == "clone" {
            if let Some(gate) = &self.gate {
                gate.started.notify_one();
                gate.release.notified().await;
            }
        }

        if let Some(stderr) = self.failures.get(&subcommand) {
            if subcommand == "clone" {
                // Half-finished clone.
                std::fs::create_dir_all(PathBuf::from(&args[2]).join(".git")).unwrap();
            }

            return Ok(ShellOutcome::Failure {
                status: Some(128),
                stderr: format!("{stderr}\n").into_bytes(),
            });
        }

        match subcommand.as_str() {
            "clone" => {
                let dest = PathBuf::from(&args[2]);
                std::fs::create_dir_all(dest.join(".git")).unwrap();
                #[cfg(unix)]
                {
                    if self.lock_root_after_clone {
                        set_writable(dest.parent().unwrap(), false);
                    }
                }
                Ok(ShellOutcome::Success { stdout: Vec::new() })
            }
            "ls-remote" => Ok(ShellOutcome::Success {
                stdout: self.remote_heads.clone().into_bytes(),
            }),
            _ => Ok(ShellOutcome::Success { stdout: Vec::new() }),
        }
    }
}

#[cfg(unix)]
pub(crate) fn set_writable(dir: &Path, writable: bool) {
    use std::os::unix::fs::PermissionsExt;

    let mode = if writable { 0o755 } else { 0o555 };
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(mode)).unwrap();
}

/// Check that a read-only directory really refuses writes.
///
/// Privileged users bypass permission bits, in which case tests relying on
/// them have nothing to check.
#[cfg(unix)]
pub(crate) fn write_protected(dir: &Path) -> bool {
    let marker = dir.join(".write-check");
    match std::fs::write(&marker, "") {
        Ok(()) => {
            let _ = std::fs::remove_file(&marker);
            false
        }
        Err(_) => true,
    }
}
