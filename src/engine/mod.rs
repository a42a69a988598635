// src/engine/mod.rs

//! Async shell around the scheduler.
//!
//! One Tokio task ([`Runtime`]) owns the [`Scheduler`](crate::dag::Scheduler)
//! and processes [`EngineEvent`]s one at a time. Every bookkeeping mutation
//! (admission, status transitions, queue and registry edits) happens on
//! that task, so concurrently finishing jobs can never interleave them, and
//! there is exactly one drain loop however often draining is requested.
//! Job bodies run elsewhere, on tasks spawned by the executor backend.
//!
//! Producers talk to the runtime through the cloneable [`JobQueue`] handle.
//! Job outcomes arrive on a separate completion channel owned by the
//! executor, so dropping every handle does not strand admitted jobs: the
//! runtime keeps going until it is idle, then stops.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::config::SchedulerConfig;
use crate::dag::{JobId, JobSpec, JobStatusReport, Scheduler};
use crate::errors::Result;
use crate::exec::{ExecutorBackend, TaskExecutor, TaskRegistry};
use crate::notify::Notifier;

pub mod handle;
pub mod runtime;

pub use handle::JobQueue;
pub use runtime::Runtime;

/// Capacity of the producer and completion channels.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events flowing into the runtime from producers and job runners.
#[derive(Debug)]
pub enum EngineEvent {
    /// Admit a group of jobs atomically.
    Admit {
        specs: Vec<JobSpec>,
        reply: oneshot::Sender<Result<Vec<JobId>>>,
    },
    /// A dispatched job body returned (or failed, timed out, panicked).
    JobFinished {
        id: JobId,
        outcome: std::result::Result<Value, String>,
    },
    /// Poll a job's status.
    Status {
        id: JobId,
        reply: oneshot::Sender<Option<JobStatusReport>>,
    },
    /// Reply once nothing is queued, waiting or running.
    WaitIdle { reply: oneshot::Sender<()> },
    /// Stop processing events now, even with jobs outstanding. In-flight
    /// job bodies keep running, but their outcomes are discarded.
    Shutdown,
}

/// Start an engine that runs jobs with the handlers in `tasks`.
///
/// Must be called from within a Tokio runtime.
pub fn spawn(config: SchedulerConfig, tasks: TaskRegistry, notifier: Arc<dyn Notifier>) -> JobQueue {
    let tasks = Arc::new(tasks);
    spawn_with_backend(config, notifier, |tx| {
        TaskExecutor::new(tasks, tx, config.job_timeout)
    })
}

/// Start an engine with a custom executor backend. `make_backend` receives
/// the engine's completion sender, for reporting `JobFinished`.
pub fn spawn_with_backend<E, F>(config: SchedulerConfig, notifier: Arc<dyn Notifier>, make_backend: F) -> JobQueue
where
    E: ExecutorBackend + 'static,
    F: FnOnce(&mpsc::Sender<EngineEvent>) -> E,
{
    let (tx, rx) = mpsc::channel::<EngineEvent>(EVENT_CHANNEL_CAPACITY);
    let (done_tx, done_rx) = mpsc::channel::<EngineEvent>(EVENT_CHANNEL_CAPACITY);
    let executor = make_backend(&done_tx);
    drop(done_tx);
    let runtime = Runtime::new(Scheduler::new(&config), rx, done_rx, executor, notifier);

    tokio::spawn(async move {
        if let Err(e) = runtime.run().await {
            tracing::error!(error = %e, "engine runtime stopped with error");
        }
    });

    JobQueue::new(tx)
}
