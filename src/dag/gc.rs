// src/dag/gc.rs

//! Pruning of finished, unreferenced jobs.

use tracing::trace;

use crate::dag::job::{Job, JobId};
use crate::dag::registry::Registry;

/// Remove `id` if it is terminal and no admitted job depends on it, then
/// apply the same test to each of its own dependencies, walking up the
/// graph as far as eligibility allows.
///
/// Returns the removed records in removal order.
pub fn collect(registry: &mut Registry, id: &JobId) -> Vec<Job> {
    let mut removed = Vec::new();
    let mut stack = vec![id.clone()];

    while let Some(candidate) = stack.pop() {
        let eligible = registry
            .get(&candidate)
            .is_some_and(|job| job.status().is_terminal())
            && !registry.has_dependents(&candidate);
        if !eligible {
            continue;
        }

        let deps = registry.dependencies_of(&candidate).to_vec();
        if let Some(job) = registry.remove(&candidate) {
            trace!(job = %candidate, "garbage collected job");
            removed.push(job);
        }

        stack.extend(deps.into_iter().rev());
    }

    removed
}
