// src/dag/propagate.rs

//! Failure cascade through the dependent subgraph.

use std::collections::HashSet;

use tracing::debug;

use crate::dag::job::JobId;
use crate::dag::registry::Registry;

/// Mark every job that directly or transitively depends on `failed` as
/// failed, without running it.
///
/// Each job's error names its *direct* upstream failure
/// (`"dependency {id} failed"`). The walk is depth-first and visits each
/// job at most once. Jobs that are already terminal are left untouched and
/// not descended into.
///
/// Returns the newly failed ids in the order they were marked (excluding
/// `failed` itself).
pub fn fail_dependents(registry: &mut Registry, failed: &JobId) -> Vec<JobId> {
    let mut stack: Vec<(JobId, JobId)> = registry
        .dependents_of(failed)
        .iter()
        .rev()
        .map(|d| (d.clone(), failed.clone()))
        .collect();
    let mut visited: HashSet<JobId> = HashSet::new();
    let mut newly_failed = Vec::new();

    while let Some((id, upstream)) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }

        let Some(job) = registry.get_mut(&id) else {
            continue;
        };
        if job.status().is_terminal() {
            continue;
        }

        job.fail(format!("dependency {upstream} failed"));
        debug!(job = %id, upstream = %upstream, "marking dependent failed due to upstream failure");
        newly_failed.push(id.clone());

        stack.extend(
            registry
                .dependents_of(&id)
                .iter()
                .rev()
                .map(|d| (d.clone(), id.clone())),
        );
    }

    newly_failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::job::{JobSpec, JobStatus};

    #[test]
    fn cascade_reaches_whole_chain() {
        let mut reg = Registry::new();
        reg.admit(JobSpec::new("a", "echo")).unwrap();
        reg.admit(JobSpec::new("b", "echo").after("a")).unwrap();
        reg.admit(JobSpec::new("c", "echo").after("b")).unwrap();
        reg.get_mut(&"a".into()).unwrap().fail("boom");

        let failed = fail_dependents(&mut reg, &"a".into());
        assert_eq!(failed, vec![JobId::from("b"), JobId::from("c")]);

        let c = reg.get(&"c".into()).unwrap();
        assert_eq!(c.status(), JobStatus::Failed);
        assert_eq!(c.error(), Some("dependency b failed"));
        assert_eq!(
            reg.get(&"b".into()).unwrap().error(),
            Some("dependency a failed")
        );
    }

    #[test]
    fn diamond_dependent_fails_once() {
        let mut reg = Registry::new();
        reg.admit(JobSpec::new("a", "echo")).unwrap();
        reg.admit(JobSpec::new("b", "echo").after("a")).unwrap();
        reg.admit(JobSpec::new("c", "echo").after("a")).unwrap();
        reg.admit(JobSpec::new("d", "echo").after("b").after("c")).unwrap();
        reg.get_mut(&"a".into()).unwrap().fail("boom");

        let failed = fail_dependents(&mut reg, &"a".into());
        assert_eq!(failed.len(), 3);
        assert_eq!(failed.iter().filter(|id| id.as_str() == "d").count(), 1);
    }

    #[test]
    fn unrelated_jobs_are_untouched() {
        let mut reg = Registry::new();
        reg.admit(JobSpec::new("a", "echo")).unwrap();
        reg.admit(JobSpec::new("x", "echo")).unwrap();
        reg.get_mut(&"a".into()).unwrap().fail("boom");

        assert!(fail_dependents(&mut reg, &"a".into()).is_empty());
        assert_eq!(reg.get(&"x".into()).unwrap().status(), JobStatus::Pending);
    }
}
