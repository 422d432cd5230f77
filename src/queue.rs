// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Background clone queue.
//!
//! Creating a project must not wait on a slow clone, but the outcome of that
//! clone still needs to be observable. Clone requests therefore go through a
//! bounded queue drained by a fixed amount of worker tasks. Submitters wait
//! when the queue is full, so bulk project creation cannot launch an
//! unbounded amount of clones at once.
//!
//! Every outcome gets logged, and is broadcast to anyone who subscribed to
//! the queue's reports. Broadcast receivers that fall behind lose reports, so
//! a caller that must see the outcome of its own requests gets a dedicated
//! completion handle per request instead.

use crate::{
    config::QueueSettings,
    project::ProjectId,
    shell::ShellRunner,
    store::ProjectStore,
    sync::{CloneOutcome, SyncError, Synchronizer},
};

use futures::future::join_all;
use std::sync::Arc;
use tokio::{
    sync::{
        broadcast,
        mpsc::{self, error::TrySendError},
        oneshot, Mutex,
    },
    task::JoinHandle,
};
use tracing::{debug, error, info, trace, warn};

/// Outcome of one background clone.
#[derive(Debug, Clone)]
pub struct CloneReport {
    pub project_id: ProjectId,
    pub result: Result<CloneOutcome, Arc<SyncError>>,
}

#[derive(Debug)]
struct CloneRequest {
    project_id: ProjectId,
    done: Option<oneshot::Sender<CloneReport>>,
}

/// Bounded queue of clone requests.
#[derive(Debug)]
pub struct CloneQueue {
    sender: mpsc::Sender<CloneRequest>,
    reports: broadcast::Sender<CloneReport>,
    workers: Vec<JoinHandle<()>>,
}

impl CloneQueue {
    /// Start workers draining a new queue.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<S, R>(sync: Arc<Synchronizer<S, R>>, settings: &QueueSettings) -> Self
    where
        S: ProjectStore,
        R: ShellRunner,
    {
        let (sender, receiver) = mpsc::channel(settings.capacity.max(1));
        let (reports, _) = broadcast::channel(settings.capacity.max(16));
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..settings.workers.max(1))
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let sync = Arc::clone(&sync);
                let reports = reports.clone();
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(CloneRequest { project_id, done }) = next else {
                            break;
                        };

                        let result = sync.ensure_cloned(project_id).await;
                        log_outcome(project_id, &result);

                        let report = CloneReport {
                            project_id,
                            result: result.map_err(Arc::new),
                        };
                        if let Some(done) = done {
                            // Requester may have stopped waiting.
                            let _ = done.send(report.clone());
                        }

                        // No subscribers is fine, the log has it.
                        let _ = reports.send(report);
                    }
                    debug!("clone worker {worker} stopped");
                })
            })
            .collect();

        Self {
            sender,
            reports,
            workers,
        }
    }

    /// Queue clone of project, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// - Return [`QueueError::Closed`] if no worker is left to take it.
    pub async fn submit(&self, id: ProjectId) -> Result<()> {
        self.enqueue(id, None).await
    }

    /// Queue clone of project, returning a handle resolving to its report.
    ///
    /// Waits while the queue is full, like [`CloneQueue::submit`].
    ///
    /// # Errors
    ///
    /// - Return [`QueueError::Closed`] if no worker is left to take it.
    pub async fn submit_tracked(&self, id: ProjectId) -> Result<oneshot::Receiver<CloneReport>> {
        let (done, receiver) = oneshot::channel();
        self.enqueue(id, Some(done)).await?;
        Ok(receiver)
    }

    /// Queue clones of every project and wait until all of them finished.
    ///
    /// Reports come back in submission order. Any amount of projects may be
    /// given, regardless of queue capacity.
    ///
    /// # Errors
    ///
    /// - Return [`QueueError::Closed`] if no worker is left to take a request.
    /// - Return [`QueueError::Abandoned`] if a worker stopped before
    ///   reporting.
    pub async fn submit_all(
        &self,
        ids: impl IntoIterator<Item = ProjectId>,
    ) -> Result<Vec<CloneReport>> {
        let mut handles = Vec::new();
        for id in ids {
            handles.push((id, self.submit_tracked(id).await?));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            reports.push(handle.await.map_err(|_| QueueError::Abandoned(id))?);
        }

        Ok(reports)
    }

    async fn enqueue(&self, id: ProjectId, done: Option<oneshot::Sender<CloneReport>>) -> Result<()> {
        trace!(project_id = %id, "queue clone");
        self.sender
            .send(CloneRequest {
                project_id: id,
                done,
            })
            .await
            .map_err(|_| QueueError::Closed(id))
    }

    /// Queue clone of project without waiting.
    ///
    /// # Errors
    ///
    /// - Return [`QueueError::Full`] if the queue is at capacity.
    /// - Return [`QueueError::Closed`] if no worker is left to take it.
    pub fn try_submit(&self, id: ProjectId) -> Result<()> {
        let request = CloneRequest {
            project_id: id,
            done: None,
        };
        self.sender.try_send(request).map_err(|err| match err {
            TrySendError::Full(request) => QueueError::Full(request.project_id),
            TrySendError::Closed(request) => QueueError::Closed(request.project_id),
        })
    }

    /// Receive reports of every clone finishing from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CloneReport> {
        self.reports.subscribe()
    }

    /// Stop accepting requests, drain what is queued, and wait for workers.
    pub async fn shutdown(self) {
        drop(self.sender);
        for result in join_all(self.workers).await {
            if let Err(err) = result {
                warn!("clone worker ended abnormally: {err}");
            }
        }
    }
}

fn log_outcome(id: ProjectId, result: &Result<CloneOutcome, SyncError>) {
    match result {
        Ok(CloneOutcome::Cloned { branch }) => {
            info!(project_id = %id, "project mirror initialized on {branch:?}")
        }
        Ok(CloneOutcome::AlreadyPresent) => {
            debug!(project_id = %id, "project mirror already present")
        }
        Ok(CloneOutcome::ProjectMissing) => {
            trace!(project_id = %id, "project does not exist")
        }
        Err(err) => error!(project_id = %id, "project mirror failed to initialize: {err}"),
    }
}

/// Clone queue error types.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Queue is at capacity.
    #[error("clone queue is full, project {0} was not queued")]
    Full(ProjectId),

    /// Queue no longer accepts requests.
    #[error("clone queue is closed, project {0} was not queued")]
    Closed(ProjectId),

    /// Worker dropped a request without reporting on it.
    #[error("clone of project {0} was abandoned")]
    Abandoned(ProjectId),
}

/// Friendly result alias :3
pub type Result<T, E = QueueError> = std::result::Result<T, E>;
