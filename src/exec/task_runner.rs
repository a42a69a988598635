// src/exec/task_runner.rs

//! Runs a single dispatched job body and reports the outcome.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dag::DispatchedJob;
use crate::engine::EngineEvent;
use crate::exec::handler::TaskHandler;

/// Execute `job` with `handler` and send `JobFinished` to the engine.
///
/// The body runs on its own Tokio task, so a panicking handler fails the
/// job instead of taking the runner down with it. With a `timeout`, a body
/// that overruns is aborted and the job fails once the body has actually
/// stopped.
///
/// If the engine is gone by the time the job finishes, the outcome is
/// discarded.
pub async fn run_job(
    job: DispatchedJob,
    handler: Option<Arc<dyn TaskHandler>>,
    timeout: Option<Duration>,
    engine_tx: mpsc::Sender<EngineEvent>,
) {
    let id = job.id.clone();
    let outcome = execute(job, handler, timeout).await;

    match &outcome {
        Ok(_) => debug!(job = %id, "job body returned"),
        Err(e) => warn!(job = %id, error = %e, "job body failed"),
    }

    if engine_tx
        .send(EngineEvent::JobFinished { id: id.clone(), outcome })
        .await
        .is_err()
    {
        debug!(job = %id, "engine closed before job outcome was delivered");
    }
}

async fn execute(
    job: DispatchedJob,
    handler: Option<Arc<dyn TaskHandler>>,
    timeout: Option<Duration>,
) -> Result<Value, String> {
    let Some(handler) = handler else {
        error!(job = %job.id, task = %job.task, "no handler registered for task");
        return Err(format!("unknown task '{}'", job.task));
    };

    info!(job = %job.id, task = %job.task, args = job.args.len(), "starting job");
    let mut body = tokio::spawn(handler.call(job.args));

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut body).await {
            Ok(joined) => joined,
            Err(_) => {
                body.abort();
                // Abort only lands at the body's next yield point; the job
                // keeps its slot until then.
                let _ = body.await;
                return Err(format!("job timed out after {limit:?}"));
            }
        },
        None => body.await,
    };

    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(task_err)) => Err(task_err.to_string()),
        Err(join_err) if join_err.is_panic() => Err("job panicked".to_string()),
        Err(join_err) => Err(format!("job aborted: {join_err}")),
    }
}
