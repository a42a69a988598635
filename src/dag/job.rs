// src/dag/job.rs

//! Job model: identities, status, the canonical job record and the
//! sanitized snapshot handed to notifiers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Opaque job identity, assigned by the producer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identity for producers that don't have one.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Routing key used by notifiers to reach the producer's client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Final outcome of a job. Only one of result / error can ever exist.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(Value),
    Failed(String),
}

/// What a producer hands to the scheduler.
///
/// The job body is referenced by task name and resolved through the
/// executor's handler registry at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub id: JobId,
    pub task: String,
    pub parameters: Vec<Value>,
    pub depends_on: Vec<JobId>,
    pub client_id: Option<ClientId>,
}

impl JobSpec {
    pub fn new(id: impl Into<JobId>, task: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task: task.into(),
            parameters: Vec::new(),
            depends_on: Vec::new(),
            client_id: None,
        }
    }

    /// Same as [`JobSpec::new`] with a generated id.
    pub fn anonymous(task: impl Into<String>) -> Self {
        Self::new(JobId::generate(), task)
    }

    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.parameters.push(value.into());
        self
    }

    pub fn params(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.parameters.extend(values);
        self
    }

    pub fn after(mut self, dep: impl Into<JobId>) -> Self {
        self.depends_on.push(dep.into());
        self
    }

    pub fn for_client(mut self, client: impl Into<ClientId>) -> Self {
        self.client_id = Some(client.into());
        self
    }
}

/// Canonical job record, owned by the [`Registry`](crate::dag::Registry).
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub task: String,
    pub parameters: Vec<Value>,
    depends_on: Vec<JobId>,
    pub client_id: Option<ClientId>,
    status: JobStatus,
    outcome: Option<JobOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn from_spec(spec: JobSpec) -> Self {
        let now = Utc::now();
        Self {
            id: spec.id,
            task: spec.task,
            parameters: spec.parameters,
            depends_on: spec.depends_on,
            client_id: spec.client_id,
            status: JobStatus::Pending,
            outcome: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn depends_on(&self) -> &[JobId] {
        &self.depends_on
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Some(JobOutcome::Completed(v)) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Some(JobOutcome::Failed(e)) => Some(e),
            _ => None,
        }
    }

    /// `Pending -> Processing`.
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            warn!(job = %self.id, status = ?self.status, "refusing to start job that is not pending");
            return false;
        }
        self.transition(JobStatus::Processing, None);
        true
    }

    /// `Processing -> Completed`.
    pub fn complete(&mut self, value: Value) -> bool {
        if self.status != JobStatus::Processing {
            warn!(job = %self.id, status = ?self.status, "refusing to complete job that is not processing");
            return false;
        }
        self.transition(JobStatus::Completed, Some(JobOutcome::Completed(value)));
        true
    }

    /// `Pending | Processing -> Failed`.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            warn!(job = %self.id, status = ?self.status, "refusing to fail job that is already terminal");
            return false;
        }
        self.transition(JobStatus::Failed, Some(JobOutcome::Failed(error.into())));
        true
    }

    fn transition(&mut self, status: JobStatus, outcome: Option<JobOutcome>) {
        self.status = status;
        if outcome.is_some() {
            self.outcome = outcome;
        }
        self.updated_at = Utc::now();
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            task: self.task.clone(),
            status: self.status,
            client_id: self.client_id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            result: self.result().cloned(),
            error: self.error().map(str::to_string),
        }
    }
}

/// Sanitized view of a job, as delivered to notifiers and status pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub task: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Answer to a status poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusReport {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&JobSnapshot> for JobStatusReport {
    fn from(s: &JobSnapshot) -> Self {
        Self {
            status: s.status,
            result: s.result.clone(),
            error: s.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lifecycle_runs_forward_only() {
        let mut job = Job::from_spec(JobSpec::new("a", "echo"));
        assert_eq!(job.status(), JobStatus::Pending);

        assert!(!job.complete(json!(1)), "cannot complete a pending job");
        assert!(job.start());
        assert!(!job.start());
        assert!(job.complete(json!("done")));
        assert!(!job.fail("late"));

        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.result(), Some(&json!("done")));
        assert_eq!(job.error(), None);
    }

    #[test]
    fn pending_job_can_fail_without_running() {
        let mut job = Job::from_spec(JobSpec::new("b", "echo").after("a"));
        let created = job.created_at;
        assert!(job.fail("dependency a failed"));
        assert_eq!(job.error(), Some("dependency a failed"));
        assert!(job.result().is_none());
        assert!(job.updated_at >= created);
    }

    #[test]
    fn snapshot_skips_absent_fields() {
        let mut job = Job::from_spec(JobSpec::new("c", "echo").for_client("alice"));
        job.start();
        job.complete(json!({"hash": "abc"}));

        let value = serde_json::to_value(job.snapshot()).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["client_id"], "alice");
        assert_eq!(value["result"]["hash"], "abc");
        assert!(value.get("error").is_none());
    }
}
