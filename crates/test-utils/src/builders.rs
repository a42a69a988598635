#![allow(dead_code)]

use jobdag::config::{JobConfig, PlanFile, RawPlanFile};
use jobdag::errors::Result;
use serde_json::Value;

/// Builder for `PlanFile` to simplify test setup.
pub struct PlanBuilder {
    plan: RawPlanFile,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlanFile::default(),
        }
    }

    pub fn with_job(mut self, id: &str, job: JobConfig) -> Self {
        self.plan.job.insert(id.to_string(), job);
        self
    }

    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.plan.config.max_concurrent = max;
        self
    }

    pub fn job_timeout(mut self, timeout: &str) -> Self {
        self.plan.config.job_timeout = Some(timeout.to_string());
        self
    }

    /// Validate without panicking, for tests that expect rejection.
    pub fn try_build(self) -> Result<PlanFile> {
        PlanFile::try_from(self.plan)
    }

    pub fn build(self) -> PlanFile {
        self.try_build()
            .expect("Failed to build valid plan from builder")
    }
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a single `[job.<id>]` entry.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(task: &str) -> Self {
        Self {
            job: JobConfig {
                task: task.to_string(),
                params: Vec::new(),
                after: Vec::new(),
                client: None,
            },
        }
    }

    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.job.params.push(value.into());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.job.after.push(dep.to_string());
        self
    }

    pub fn client(mut self, client: &str) -> Self {
        self.job.client = Some(client.to_string());
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}
