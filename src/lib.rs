// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project repository synchronization.
//!
//! Every deployable __project__ keeps a local git __mirror__ of its remote
//! repository inside a fixed repository root, named after the project. The
//! configuration record of a project is authoritative, and the mirror is
//! derived from it. Whenever a record is created, edited, or deleted, the
//! record gets committed first, and the mirror is reconciled afterwards.
//!
//! Between the commit and the end of reconciliation the two may disagree.
//! Reconciliation failures are reported or logged for someone to fix by
//! hand, but they never undo the committed record.
//!
//! # Layout
//!
//! - [`store`]: authoritative project records.
//! - [`shell`]: external process runner.
//! - [`sync`]: mirror reconciliation proper.
//! - [`queue`]: background clones for newly created projects.
//! - [`service`]: commits records, then triggers reconciliation.

pub mod config;
pub mod git;
pub mod lock;
pub mod mirror;
pub mod path;
pub mod project;
pub mod queue;
pub mod service;
pub mod shell;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod fixture;

pub use config::Settings;
pub use mirror::{MirrorInfo, MirrorState};
pub use project::{Project, ProjectAttrs, ProjectId};
pub use queue::{CloneQueue, CloneReport};
pub use service::{ProjectService, ServiceError};
pub use shell::{ProcessRunner, ShellCommand, ShellOutcome, ShellRunner};
pub use store::{MemoryStore, ProjectManifest, ProjectStore};
pub use sync::{CloneOutcome, Reconciled, SyncError, Synchronizer};
