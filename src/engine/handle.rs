// src/engine/handle.rs

use tokio::sync::{mpsc, oneshot};

use crate::dag::{JobId, JobSpec, JobStatusReport};
use crate::errors::{JobdagError, Result};

use super::EngineEvent;

/// Cloneable producer-side handle to a running engine.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<EngineEvent>,
}

impl JobQueue {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }

    /// Admit a single job. Dependencies that are not admitted by the time
    /// the job is resolved fail it; use [`JobQueue::admit_batch`] to submit
    /// a job together with its dependencies.
    pub async fn admit(&self, spec: JobSpec) -> Result<JobId> {
        let mut ids = self.admit_batch(vec![spec]).await?;
        ids.pop()
            .ok_or_else(|| JobdagError::Other(anyhow::anyhow!("engine returned no id for admitted job")))
    }

    /// Admit a group of jobs atomically; returns their ids in input order.
    pub async fn admit_batch(&self, specs: Vec<JobSpec>) -> Result<Vec<JobId>> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineEvent::Admit { specs, reply }).await?;
        rx.await.map_err(|_| JobdagError::EngineClosed)?
    }

    /// Current status of a job, or `None` if it is unknown (never admitted,
    /// or collected long enough ago to have left the status board).
    pub async fn status(&self, id: &JobId) -> Result<Option<JobStatusReport>> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineEvent::Status { id: id.clone(), reply }).await?;
        rx.await.map_err(|_| JobdagError::EngineClosed)
    }

    /// Resolve once no job is queued, waiting or running.
    pub async fn wait_idle(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineEvent::WaitIdle { reply }).await?;
        rx.await.map_err(|_| JobdagError::EngineClosed)
    }

    /// Ask the engine to stop.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(EngineEvent::Shutdown).await
    }

    async fn send(&self, event: EngineEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| JobdagError::EngineClosed)
    }
}
