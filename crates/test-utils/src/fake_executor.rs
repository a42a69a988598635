use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use jobdag::dag::{DispatchedJob, JobId};
use jobdag::engine::EngineEvent;
use jobdag::errors::Result;
use jobdag::exec::ExecutorBackend;
use serde_json::Value;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which jobs were dispatched, in dispatch order
/// - immediately reports `JobFinished` for each of them: tasks named in
///   `failing` fail with `"{task} failed"`, everything else completes with
///   its argument list as the result.
pub struct FakeExecutor {
    engine_tx: mpsc::Sender<EngineEvent>,
    dispatched: Arc<Mutex<Vec<DispatchedJob>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(engine_tx: &mpsc::Sender<EngineEvent>, dispatched: Arc<Mutex<Vec<DispatchedJob>>>) -> Self {
        Self {
            engine_tx: engine_tx.clone(),
            dispatched,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_jobs(
        &mut self,
        jobs: Vec<DispatchedJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for job in jobs {
                self.dispatched.lock().unwrap().push(job.clone());

                let outcome = if self.failing.contains(&job.task) {
                    Err(format!("{} failed", job.task))
                } else {
                    Ok(Value::Array(job.args.clone()))
                };

                // Report from a separate task: the engine is busy awaiting us.
                let tx = self.engine_tx.clone();
                let id: JobId = job.id;
                tokio::spawn(async move {
                    let _ = tx.send(EngineEvent::JobFinished { id, outcome }).await;
                });
            }
            Ok(())
        })
    }
}

/// An executor backend that rejects every dispatch.
pub struct RejectingExecutor;

impl ExecutorBackend for RejectingExecutor {
    fn spawn_jobs(
        &mut self,
        _jobs: Vec<DispatchedJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async { Err(anyhow::anyhow!("executor unavailable").into()) })
    }
}
