// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The engine talks to an `ExecutorBackend` instead of spawning job bodies
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production executor in [`TaskExecutor`].
//!
//! - `TaskExecutor` is the default implementation. It resolves each job's
//!   task name in a [`TaskRegistry`] and runs the body on its own Tokio
//!   task via [`run_job`].
//! - Tests can provide their own `ExecutorBackend` that, for example,
//!   records which jobs were dispatched and directly emits `JobFinished`
//!   events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::DispatchedJob;
use crate::engine::EngineEvent;
use crate::errors::Result;
use crate::exec::handler::TaskRegistry;
use crate::exec::task_runner::run_job;

/// Trait abstracting how dispatched jobs are executed.
pub trait ExecutorBackend: Send {
    /// Start executing the given jobs. Must not wait for them to finish;
    /// outcomes are reported back as [`EngineEvent::JobFinished`].
    fn spawn_jobs(
        &mut self,
        jobs: Vec<DispatchedJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production executor backend.
pub struct TaskExecutor {
    tasks: Arc<TaskRegistry>,
    engine_tx: mpsc::Sender<EngineEvent>,
    timeout: Option<Duration>,
}

impl TaskExecutor {
    /// `engine_tx` is the engine's completion channel; each job runner
    /// reports its outcome through a clone of it.
    pub fn new(
        tasks: Arc<TaskRegistry>,
        engine_tx: &mpsc::Sender<EngineEvent>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            tasks,
            engine_tx: engine_tx.clone(),
            timeout,
        }
    }
}

impl ExecutorBackend for TaskExecutor {
    fn spawn_jobs(
        &mut self,
        jobs: Vec<DispatchedJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for job in jobs {
                let handler = self.tasks.get(&job.task);
                debug!(job = %job.id, task = %job.task, found = handler.is_some(), "spawning job runner");
                tokio::spawn(run_job(job, handler, self.timeout, self.engine_tx.clone()));
            }
            Ok(())
        })
    }
}
