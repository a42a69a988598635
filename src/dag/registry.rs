// src/dag/registry.rs

//! Authoritative store of admitted jobs and their dependency edges.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::job::{Job, JobId, JobSpec};
use crate::errors::{JobdagError, Result};

/// Owns every job between admission and garbage collection.
///
/// Besides the jobs themselves it keeps two adjacency maps:
/// - `edges`: job -> the ids it depends on (its `depends_on`, immutable)
/// - `dependents`: job -> the admitted jobs that list it in `depends_on`
///
/// `dependents` may have entries for ids that are not admitted (yet), so a
/// late-arriving dependency immediately sees who is waiting on it.
#[derive(Debug, Default)]
pub struct Registry {
    jobs: HashMap<JobId, Job>,
    edges: HashMap<JobId, Vec<JobId>>,
    dependents: HashMap<JobId, Vec<JobId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.contains_key(id)
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn get_mut(&mut self, id: &JobId) -> Option<&mut Job> {
        self.jobs.get_mut(id)
    }

    /// Ids this job depends on, in declaration order.
    pub fn dependencies_of(&self, id: &JobId) -> &[JobId] {
        self.edges.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Admitted jobs that list `id` in their `depends_on`.
    pub fn dependents_of(&self, id: &JobId) -> &[JobId] {
        self.dependents.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn has_dependents(&self, id: &JobId) -> bool {
        !self.dependents_of(id).is_empty()
    }

    /// Validate and insert a single job.
    pub fn admit(&mut self, spec: JobSpec) -> Result<()> {
        self.check_admissible(std::slice::from_ref(&spec))?;
        self.insert(Job::from_spec(spec));
        Ok(())
    }

    /// Check that a group of specs can be admitted together: no id is
    /// already present (or repeated within the group), and the resulting
    /// dependency graph stays acyclic.
    pub fn check_admissible(&self, specs: &[JobSpec]) -> Result<()> {
        let mut seen: HashSet<&JobId> = HashSet::new();
        for spec in specs {
            if self.contains(&spec.id) || !seen.insert(&spec.id) {
                return Err(JobdagError::DuplicateJob(spec.id.clone()));
            }
            if spec.depends_on.contains(&spec.id) {
                return Err(JobdagError::DependencyCycle(format!(
                    "job '{}' cannot depend on itself",
                    spec.id
                )));
            }
        }

        // Edge direction: job -> dependency. Dangling edges (to ids nobody
        // admitted yet) are included; they are what a later admission can
        // close a cycle through.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for (id, deps) in self.edges.iter() {
            graph.add_node(id.as_str());
            for dep in deps {
                graph.add_edge(id.as_str(), dep.as_str(), ());
            }
        }
        for spec in specs {
            graph.add_node(spec.id.as_str());
            for dep in &spec.depends_on {
                graph.add_edge(spec.id.as_str(), dep.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(JobdagError::DependencyCycle(format!(
                "cycle detected in job dependencies involving '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// Insert a job that has already passed [`Registry::check_admissible`].
    pub(crate) fn insert(&mut self, job: Job) {
        let id = job.id.clone();
        let deps = job.depends_on().to_vec();

        for dep in &deps {
            self.dependents.entry(dep.clone()).or_default().push(id.clone());
        }
        debug!(job = %id, deps = ?deps, "registered job");
        self.edges.insert(id.clone(), deps);
        self.jobs.insert(id, job);
    }

    /// Delete a job and its edge record.
    ///
    /// Jobs that still list `id` keep their edges; they will see the
    /// dependency as missing.
    pub fn remove(&mut self, id: &JobId) -> Option<Job> {
        let job = self.jobs.remove(id)?;

        for dep in self.edges.remove(id).unwrap_or_default() {
            if let Some(waiters) = self.dependents.get_mut(&dep) {
                waiters.retain(|w| w != id);
                if waiters.is_empty() {
                    self.dependents.remove(&dep);
                }
            }
        }

        debug!(job = %id, "removed job from registry");
        Some(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admit_records_edges_both_ways() {
        let mut reg = Registry::new();
        reg.admit(JobSpec::new("a", "echo")).unwrap();
        reg.admit(JobSpec::new("b", "echo").after("a")).unwrap();

        assert_eq!(reg.dependencies_of(&"b".into()), &[JobId::from("a")]);
        assert_eq!(reg.dependents_of(&"a".into()), &[JobId::from("b")]);
        assert!(reg.dependents_of(&"b".into()).is_empty());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut reg = Registry::new();
        reg.admit(JobSpec::new("a", "echo")).unwrap();
        let err = reg.admit(JobSpec::new("a", "fail")).unwrap_err();
        assert!(matches!(err, JobdagError::DuplicateJob(id) if id.as_str() == "a"));
        assert_eq!(reg.get(&"a".into()).unwrap().task, "echo");
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut reg = Registry::new();
        let err = reg.admit(JobSpec::new("a", "echo").after("a")).unwrap_err();
        assert!(matches!(err, JobdagError::DependencyCycle(_)));
        assert!(reg.is_empty());
    }

    #[test]
    fn cycle_through_forward_reference_is_rejected() {
        let mut reg = Registry::new();
        // `a` waits on `b` before `b` exists; `b` then tries to wait on `a`.
        reg.admit(JobSpec::new("a", "echo").after("b")).unwrap();
        let err = reg.admit(JobSpec::new("b", "echo").after("a")).unwrap_err();
        assert!(matches!(err, JobdagError::DependencyCycle(_)));
        assert!(!reg.contains(&"b".into()));
    }

    #[test]
    fn batch_with_repeated_id_is_rejected() {
        let reg = Registry::new();
        let specs = vec![JobSpec::new("x", "echo"), JobSpec::new("x", "echo")];
        assert!(matches!(
            reg.check_admissible(&specs),
            Err(JobdagError::DuplicateJob(_))
        ));
    }

    #[test]
    fn remove_cleans_reverse_index() {
        let mut reg = Registry::new();
        reg.admit(JobSpec::new("a", "echo")).unwrap();
        reg.admit(JobSpec::new("b", "echo").after("a")).unwrap();

        assert!(reg.remove(&"b".into()).is_some());
        assert!(!reg.has_dependents(&"a".into()));
        assert!(reg.dependencies_of(&"b".into()).is_empty());
        assert!(reg.remove(&"b".into()).is_none());
    }
}
