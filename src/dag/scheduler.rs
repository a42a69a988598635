// src/dag/scheduler.rs

use std::collections::{HashSet, VecDeque};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::dag::gc;
use crate::dag::job::{Job, JobId, JobSpec, JobStatus, JobStatusReport};
use crate::dag::propagate::fail_dependents;
use crate::dag::registry::Registry;
use crate::dag::resolver::{Readiness, resolve};
use crate::dag::scheduler_step::{DispatchedJob, SchedulerStep};
use crate::dag::status_board::StatusBoard;
use crate::errors::Result;

/// Scheduler holds the job registry plus the queues that feed the executor.
///
/// It is responsible for:
/// - admitting jobs and queueing them in FIFO order
/// - handing out ready jobs while fewer than `max_concurrent` are active
/// - parking blocked jobs in the waiting set until a dependency completes
/// - recording outcomes and failing dependents when a job fails
/// - pruning finished jobs nobody depends on anymore
///
/// It performs no IO and runs no job bodies: every call returns a
/// [`SchedulerStep`] describing what the caller should do next. Callers
/// must serialize access (the engine does so by owning it in a single
/// task).
#[derive(Debug)]
pub struct Scheduler {
    registry: Registry,
    ready: VecDeque<JobId>,
    waiting: HashSet<JobId>,
    active: usize,
    max_concurrent: usize,
    board: StatusBoard,
}

impl Scheduler {
    /// `max_concurrent` is clamped to at least 1.
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            registry: Registry::new(),
            ready: VecDeque::new(),
            waiting: HashSet::new(),
            active: 0,
            max_concurrent: config.max_concurrent.max(1),
            board: StatusBoard::new(config.status_retention),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn queued_len(&self) -> usize {
        self.ready.len()
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Nothing queued, nothing waiting, nothing running.
    pub fn is_idle(&self) -> bool {
        self.ready.is_empty() && self.waiting.is_empty() && self.active == 0
    }

    /// Status of a job still in the registry, or of a recently collected one.
    pub fn status(&self, id: &JobId) -> Option<JobStatusReport> {
        match self.registry.get(id) {
            Some(job) => Some(JobStatusReport::from(&job.snapshot())),
            None => self.board.get(id).map(JobStatusReport::from),
        }
    }

    /// Admit one job and drain.
    pub fn admit(&mut self, spec: JobSpec) -> Result<SchedulerStep> {
        self.admit_batch(vec![spec])
    }

    /// Admit a group of jobs atomically, then drain.
    ///
    /// All jobs are registered before any is resolved, so members of the
    /// group may reference each other regardless of their order. If any
    /// spec is rejected, none is admitted.
    pub fn admit_batch(&mut self, specs: Vec<JobSpec>) -> Result<SchedulerStep> {
        self.registry.check_admissible(&specs)?;

        for spec in specs {
            let id = spec.id.clone();
            info!(job = %id, task = %spec.task, deps = spec.depends_on.len(), "admitted job");
            self.registry.insert(Job::from_spec(spec));
            self.ready.push_back(id);
        }

        Ok(self.drain())
    }

    /// Pull from the ready queue while capacity remains.
    ///
    /// Only jobs that actually start executing take a slot; jobs that turn
    /// out blocked or doomed are handled on the spot.
    pub fn drain(&mut self) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        while self.active < self.max_concurrent {
            let Some(id) = self.ready.pop_front() else {
                break;
            };

            match resolve(&self.registry, &id) {
                Readiness::Unknown => {
                    debug!(job = %id, "queued job no longer registered; skipping");
                }
                Readiness::AlreadyFailed => {
                    // Notified when the propagator failed it.
                    debug!(job = %id, "queued job already failed; skipping");
                    self.collect(&id, &mut step);
                }
                Readiness::MissingDependency(dep) => {
                    self.fail_job(&id, format!("dependency {dep} not found"), &mut step);
                }
                Readiness::DependencyFailed(dep) => {
                    self.fail_job(&id, format!("dependency {dep} failed"), &mut step);
                }
                Readiness::Blocked { waiting_on } => {
                    debug!(job = %id, ?waiting_on, "dependencies incomplete; parking job");
                    self.waiting.insert(id);
                }
                Readiness::Ready { dependency_results } => {
                    self.start_job(&id, dependency_results, &mut step);
                }
            }
        }

        step
    }

    /// Record the outcome of a dispatched job, then drain.
    pub fn finish(&mut self, id: &JobId, outcome: std::result::Result<Value, String>) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let processing = self
            .registry
            .get(id)
            .is_some_and(|job| job.status() == JobStatus::Processing);
        if !processing {
            warn!(job = %id, "completion for job that is not processing; ignoring");
            step.merge(self.drain());
            return step;
        }
        self.active -= 1;

        match outcome {
            Ok(value) => {
                if let Some(job) = self.registry.get_mut(id) {
                    job.complete(value);
                    info!(job = %id, active = self.active, "job completed");
                    step.notifications.push(job.snapshot());
                }
                self.collect(id, &mut step);
                self.wake_waiters(id);
            }
            Err(error) => {
                self.fail_job(id, error, &mut step);
            }
        }

        step.merge(self.drain());
        step
    }

    fn start_job(&mut self, id: &JobId, dependency_results: Vec<Value>, step: &mut SchedulerStep) {
        let Some(job) = self.registry.get_mut(id) else {
            return;
        };
        if !job.start() {
            return;
        }
        self.active += 1;

        let mut args = job.parameters.clone();
        args.extend(dependency_results);

        debug!(
            job = %id,
            task = %job.task,
            active = self.active,
            max = self.max_concurrent,
            "dispatching job"
        );
        step.notifications.push(job.snapshot());
        step.dispatched.push(DispatchedJob {
            id: id.clone(),
            task: job.task.clone(),
            args,
            client_id: job.client_id.clone(),
        });
    }

    /// Fail `id`, cascade to its dependents, and collect what became
    /// unreferenced.
    fn fail_job(&mut self, id: &JobId, error: String, step: &mut SchedulerStep) {
        let Some(job) = self.registry.get_mut(id) else {
            return;
        };
        warn!(job = %id, error = %error, "job failed");
        if !job.fail(error) {
            return;
        }
        step.notifications.push(job.snapshot());

        let cascaded = fail_dependents(&mut self.registry, id);
        for dep_id in &cascaded {
            self.waiting.remove(dep_id);
            if let Some(dep) = self.registry.get(dep_id) {
                step.notifications.push(dep.snapshot());
            }
        }
        if !cascaded.is_empty() {
            info!(job = %id, failed_dependents = cascaded.len(), "failure cascaded to dependents");
        }

        self.collect(id, step);
        for dep_id in cascaded.iter().rev() {
            self.collect(dep_id, step);
        }
    }

    /// Move waiters of a freshly completed job back to the ready queue, in
    /// admission order.
    fn wake_waiters(&mut self, completed: &JobId) {
        for dependent in self.registry.dependents_of(completed) {
            if self.waiting.remove(dependent) {
                debug!(job = %dependent, dependency = %completed, "dependency completed; re-queueing");
                self.ready.push_back(dependent.clone());
            }
        }
    }

    fn collect(&mut self, id: &JobId, step: &mut SchedulerStep) {
        for job in gc::collect(&mut self.registry, id) {
            step.collected.push(job.id.clone());
            self.board.record(job.snapshot());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scheduler(max: usize) -> Scheduler {
        Scheduler::new(&SchedulerConfig::default().with_max_concurrent(max))
    }

    fn ids(step: &SchedulerStep) -> Vec<&str> {
        step.dispatched.iter().map(|d| d.id.as_str()).collect()
    }

    fn statuses(step: &SchedulerStep, id: &str) -> Vec<JobStatus> {
        step.notifications
            .iter()
            .filter(|s| s.id.as_str() == id)
            .map(|s| s.status)
            .collect()
    }

    #[test]
    fn independent_job_runs_and_is_collected() {
        let mut s = scheduler(2);
        let step = s.admit(JobSpec::new("a", "echo").param("x")).unwrap();
        assert_eq!(ids(&step), vec!["a"]);
        assert_eq!(step.dispatched[0].args, vec![json!("x")]);
        assert_eq!(statuses(&step, "a"), vec![JobStatus::Processing]);

        let step = s.finish(&"a".into(), Ok(json!("x!")));
        assert_eq!(statuses(&step, "a"), vec![JobStatus::Completed]);
        assert_eq!(step.collected, vec![JobId::from("a")]);
        assert!(s.registry().is_empty());
        assert!(s.is_idle());

        let report = s.status(&"a".into()).unwrap();
        assert_eq!(report.status, JobStatus::Completed);
        assert_eq!(report.result, Some(json!("x!")));
    }

    #[test]
    fn dependent_waits_then_receives_results() {
        let mut s = scheduler(4);
        let step = s
            .admit_batch(vec![
                JobSpec::new("upload", "store").param("meta").after("img"),
                JobSpec::new("img", "resize"),
            ])
            .unwrap();
        assert_eq!(ids(&step), vec!["img"]);
        assert_eq!(s.waiting_len(), 1);

        let step = s.finish(&"img".into(), Ok(json!("resized")));
        assert_eq!(ids(&step), vec!["upload"]);
        assert_eq!(step.dispatched[0].args, vec![json!("meta"), json!("resized")]);
        assert!(step.collected.is_empty(), "img is still referenced");

        let step = s.finish(&"upload".into(), Ok(json!("hash123")));
        assert_eq!(step.collected, vec![JobId::from("upload"), JobId::from("img")]);
        assert_eq!(
            s.status(&"upload".into()).unwrap().result,
            Some(json!("hash123"))
        );
    }

    #[test]
    fn capacity_limits_dispatch_and_preserves_fifo() {
        let mut s = scheduler(2);
        let step = s
            .admit_batch(vec![
                JobSpec::new("j1", "echo"),
                JobSpec::new("j2", "echo"),
                JobSpec::new("j3", "echo"),
            ])
            .unwrap();
        assert_eq!(ids(&step), vec!["j1", "j2"]);
        assert_eq!(s.queued_len(), 1);
        assert_eq!(s.active_count(), 2);

        let step = s.finish(&"j2".into(), Ok(json!(null)));
        assert_eq!(ids(&step), vec!["j3"]);
        assert_eq!(s.active_count(), 2);
    }

    #[test]
    fn failure_cascades_without_dispatching_dependents() {
        let mut s = scheduler(4);
        s.admit_batch(vec![
            JobSpec::new("a", "echo"),
            JobSpec::new("b", "echo").after("a"),
            JobSpec::new("c", "echo").after("b"),
        ])
        .unwrap();
        assert_eq!(s.waiting_len(), 2);

        let step = s.finish(&"a".into(), Err("boom".to_string()));
        assert!(step.dispatched.is_empty());
        assert_eq!(statuses(&step, "a"), vec![JobStatus::Failed]);
        assert_eq!(statuses(&step, "b"), vec![JobStatus::Failed]);
        assert_eq!(statuses(&step, "c"), vec![JobStatus::Failed]);
        assert!(s.is_idle());
        assert!(s.registry().is_empty());

        assert_eq!(s.status(&"a".into()).unwrap().error.as_deref(), Some("boom"));
        assert_eq!(
            s.status(&"c".into()).unwrap().error.as_deref(),
            Some("dependency b failed")
        );
    }

    #[test]
    fn cascaded_job_still_in_ready_queue_is_skipped_silently() {
        let mut s = scheduler(1);
        s.admit_batch(vec![
            JobSpec::new("a", "echo"),
            JobSpec::new("b", "echo").after("a"),
        ])
        .unwrap();
        // `b` has not been resolved yet: capacity 1 is taken by `a`.
        assert_eq!(s.queued_len(), 1);

        let step = s.finish(&"a".into(), Err("boom".to_string()));
        assert_eq!(statuses(&step, "b"), vec![JobStatus::Failed]);
        assert!(step.dispatched.is_empty());
        assert!(s.is_idle());
    }

    #[test]
    fn missing_dependency_fails_only_that_job() {
        let mut s = scheduler(2);
        let step = s.admit(JobSpec::new("b", "echo").after("ghost")).unwrap();
        assert!(step.dispatched.is_empty());
        assert_eq!(
            s.status(&"b".into()).unwrap().error.as_deref(),
            Some("dependency ghost not found")
        );

        let step = s.admit(JobSpec::new("other", "echo")).unwrap();
        assert_eq!(ids(&step), vec!["other"]);
    }

    #[test]
    fn shared_dependency_is_kept_for_remaining_dependent() {
        let mut s = scheduler(4);
        s.admit_batch(vec![
            JobSpec::new("a", "echo"),
            JobSpec::new("b", "echo").after("a"),
            JobSpec::new("c", "echo").after("a"),
        ])
        .unwrap();
        s.finish(&"a".into(), Ok(json!(1)));
        s.finish(&"b".into(), Ok(json!(2)));
        assert!(s.registry().contains(&"a".into()));

        let step = s.finish(&"c".into(), Ok(json!(3)));
        assert_eq!(step.collected, vec![JobId::from("c"), JobId::from("a")]);
        assert!(s.registry().is_empty());
    }

    #[test]
    fn rejected_batch_admits_nothing() {
        let mut s = scheduler(4);
        s.admit(JobSpec::new("a", "echo")).unwrap();
        let err = s
            .admit_batch(vec![JobSpec::new("fresh", "echo"), JobSpec::new("a", "echo")])
            .unwrap_err();
        assert!(matches!(err, crate::errors::JobdagError::DuplicateJob(_)));
        assert!(!s.registry().contains(&"fresh".into()));
        assert_eq!(s.queued_len(), 0);
    }

    #[test]
    fn stray_completion_does_not_free_a_slot() {
        let mut s = scheduler(1);
        s.admit(JobSpec::new("a", "echo")).unwrap();
        s.finish(&"nope".into(), Ok(json!(null)));
        assert_eq!(s.active_count(), 1);
    }
}
