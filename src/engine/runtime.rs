// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::dag::{JobId, Scheduler, SchedulerStep};
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::notify::Notifier;

use super::EngineEvent;

/// Drives the scheduler in response to `EngineEvent`s, delegates job
/// execution to an `ExecutorBackend` and forwards every status transition
/// to the `Notifier`.
///
/// Producer requests arrive on `event_rx`; job outcomes arrive on
/// `done_rx`, whose senders belong to the executor and its job runners.
pub struct Runtime<E: ExecutorBackend> {
    scheduler: Scheduler,
    event_rx: mpsc::Receiver<EngineEvent>,
    done_rx: mpsc::Receiver<EngineEvent>,
    producers_gone: bool,
    executor: E,
    notifier: Arc<dyn Notifier>,
    idle_waiters: Vec<oneshot::Sender<()>>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("producers_gone", &self.producers_gone)
            .field("idle_waiters", &self.idle_waiters.len())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        scheduler: Scheduler,
        event_rx: mpsc::Receiver<EngineEvent>,
        done_rx: mpsc::Receiver<EngineEvent>,
        executor: E,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            scheduler,
            event_rx,
            done_rx,
            producers_gone: false,
            executor,
            notifier,
            idle_waiters: Vec::new(),
        }
    }

    /// Main event loop.
    ///
    /// Runs until a `Shutdown` event arrives, or until every `JobQueue`
    /// handle is dropped and all admitted jobs have reached a terminal
    /// state.
    pub async fn run(mut self) -> Result<()> {
        info!(max_concurrent = self.scheduler.max_concurrent(), "jobdag engine started");

        loop {
            let event = tokio::select! {
                Some(event) = self.done_rx.recv() => event,
                received = self.event_rx.recv(), if !self.producers_gone => match received {
                    Some(event) => event,
                    None => {
                        debug!(
                            queued = self.scheduler.queued_len(),
                            waiting = self.scheduler.waiting_len(),
                            active = self.scheduler.active_count(),
                            "all queue handles dropped; finishing admitted jobs"
                        );
                        self.producers_gone = true;
                        if self.scheduler.is_idle() {
                            break;
                        }
                        continue;
                    }
                },
                else => {
                    warn!(
                        active = self.scheduler.active_count(),
                        "no producers and no outstanding job reports; stopping"
                    );
                    break;
                }
            };

            match event {
                EngineEvent::Admit { specs, reply } => {
                    let ids: Vec<JobId> = specs.iter().map(|s| s.id.clone()).collect();
                    match self.scheduler.admit_batch(specs) {
                        Ok(step) => {
                            let _ = reply.send(Ok(ids));
                            self.apply(step).await;
                        }
                        Err(e) => {
                            debug!(error = %e, "admission rejected");
                            let _ = reply.send(Err(e));
                        }
                    }
                }
                EngineEvent::JobFinished { id, outcome } => {
                    let step = self.scheduler.finish(&id, outcome);
                    self.apply(step).await;
                }
                EngineEvent::Status { id, reply } => {
                    let _ = reply.send(self.scheduler.status(&id));
                }
                EngineEvent::WaitIdle { reply } => {
                    self.idle_waiters.push(reply);
                }
                EngineEvent::Shutdown => {
                    info!("shutdown requested; stopping engine");
                    break;
                }
            }

            if self.scheduler.is_idle() {
                for waiter in self.idle_waiters.drain(..) {
                    let _ = waiter.send(());
                }
                if self.producers_gone {
                    break;
                }
            }
        }

        info!(
            active = self.scheduler.active_count(),
            registered = self.scheduler.registry().len(),
            "engine exiting"
        );
        Ok(())
    }

    /// Publish a step's notifications and hand its jobs to the executor.
    ///
    /// If the backend cannot take the jobs, they are failed right away so
    /// their slots are released and dependents are not left waiting.
    async fn apply(&mut self, mut step: SchedulerStep) {
        loop {
            self.publish(&step);

            if step.dispatched.is_empty() {
                return;
            }

            let ids: Vec<JobId> = step.dispatched.iter().map(|j| j.id.clone()).collect();
            debug!(jobs = ?ids, "dispatching jobs to executor");

            match self.executor.spawn_jobs(std::mem::take(&mut step.dispatched)).await {
                Ok(()) => return,
                Err(e) => {
                    error!(error = %e, jobs = ?ids, "executor rejected jobs; failing them");
                    let mut next = SchedulerStep::default();
                    for id in &ids {
                        next.merge(self.scheduler.finish(id, Err(format!("failed to dispatch job: {e}"))));
                    }
                    step = next;
                }
            }
        }
    }

    fn publish(&self, step: &SchedulerStep) {
        for snapshot in &step.notifications {
            self.notifier.notify(snapshot.client_id.as_ref(), snapshot);
        }
    }
}
