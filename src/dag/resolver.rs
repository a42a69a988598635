// src/dag/resolver.rs

//! Readiness decisions for a job popped from the ready queue.

use serde_json::Value;

use crate::dag::job::{JobId, JobStatus};
use crate::dag::registry::Registry;

/// Outcome of evaluating a job's dependencies against the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    /// The id is not (or no longer) in the registry.
    Unknown,
    /// Already failed while queued (by the failure propagator).
    AlreadyFailed,
    /// A declared dependency is not in the registry.
    MissingDependency(JobId),
    /// A declared dependency has failed.
    DependencyFailed(JobId),
    /// At least one dependency has not completed yet.
    Blocked { waiting_on: Vec<JobId> },
    /// Every dependency completed; results in `depends_on` order.
    Ready { dependency_results: Vec<Value> },
}

/// Decide what to do with `id`. Rules are applied in order: an earlier
/// match wins, so a missing dependency is reported even if another one
/// already failed.
pub fn resolve(registry: &Registry, id: &JobId) -> Readiness {
    let Some(job) = registry.get(id) else {
        return Readiness::Unknown;
    };

    if job.status() == JobStatus::Failed {
        return Readiness::AlreadyFailed;
    }

    let mut deps = Vec::with_capacity(job.depends_on().len());
    for dep_id in job.depends_on() {
        match registry.get(dep_id) {
            Some(dep) => deps.push(dep),
            None => return Readiness::MissingDependency(dep_id.clone()),
        }
    }

    if let Some(failed) = deps.iter().find(|d| d.status() == JobStatus::Failed) {
        return Readiness::DependencyFailed(failed.id.clone());
    }

    let waiting_on: Vec<JobId> = deps
        .iter()
        .filter(|d| d.status() != JobStatus::Completed)
        .map(|d| d.id.clone())
        .collect();
    if !waiting_on.is_empty() {
        return Readiness::Blocked { waiting_on };
    }

    Readiness::Ready {
        dependency_results: deps
            .iter()
            .map(|d| d.result().cloned().unwrap_or(Value::Null))
            .collect(),
    }
}
