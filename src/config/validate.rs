// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{PlanFile, RawPlanFile, parse_duration};
use crate::errors::{JobdagError, Result};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = JobdagError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw.config, raw.job))
    }
}

fn validate_raw_plan(plan: &RawPlanFile) -> Result<()> {
    ensure_has_jobs(plan)?;
    validate_global_config(plan)?;
    validate_job_dependencies(plan)?;
    validate_dag(plan)?;
    Ok(())
}

fn ensure_has_jobs(plan: &RawPlanFile) -> Result<()> {
    if plan.job.is_empty() {
        return Err(JobdagError::ConfigError(
            "plan must contain at least one [job.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(plan: &RawPlanFile) -> Result<()> {
    if plan.config.max_concurrent == 0 {
        return Err(JobdagError::ConfigError(
            "[config].max_concurrent must be >= 1 (got 0)".to_string(),
        ));
    }

    if plan.config.status_retention == 0 {
        return Err(JobdagError::ConfigError(
            "[config].status_retention must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(ref timeout) = plan.config.job_timeout {
        parse_duration(timeout).map_err(|e| {
            JobdagError::ConfigError(format!("[config].job_timeout: {e}"))
        })?;
    }

    Ok(())
}

fn validate_job_dependencies(plan: &RawPlanFile) -> Result<()> {
    for (id, job) in plan.job.iter() {
        if job.task.trim().is_empty() {
            return Err(JobdagError::ConfigError(format!(
                "job '{}' has an empty `task`",
                id
            )));
        }
        for dep in job.after.iter() {
            if dep == id {
                return Err(JobdagError::ConfigError(format!(
                    "job '{}' cannot depend on itself in `after`",
                    id
                )));
            }
            if !plan.job.contains_key(dep) {
                return Err(JobdagError::ConfigError(format!(
                    "job '{}' has unknown dependency '{}' in `after`",
                    id, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(plan: &RawPlanFile) -> Result<()> {
    // Edge direction: dep -> job. For `[job.B] after = ["A"]` we add A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in plan.job.keys() {
        graph.add_node(id.as_str());
    }

    for (id, job) in plan.job.iter() {
        for dep in job.after.iter() {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(JobdagError::DependencyCycle(format!(
            "cycle detected in job plan involving job '{}'",
            cycle.node_id()
        ))),
    }
}
