// src/dag/scheduler_step.rs

//! Step-by-step result types for the scheduler.

use serde_json::Value;

use crate::dag::job::{ClientId, JobId, JobSnapshot};

/// A job the scheduler wants executed now.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedJob {
    pub id: JobId,
    /// Handler name to invoke.
    pub task: String,
    /// Job parameters followed by dependency results in `depends_on` order.
    pub args: Vec<Value>,
    pub client_id: Option<ClientId>,
}

/// Structured result of a single scheduler "step" (admission, drain or
/// completion).
///
/// The async shell acts on it: dispatch jobs to the executor, forward
/// notifications. Tests use it to step the scheduler by hand.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Jobs that moved to `Processing` in this step.
    pub dispatched: Vec<DispatchedJob>,
    /// One snapshot per status transition, in the order they happened.
    pub notifications: Vec<JobSnapshot>,
    /// Jobs removed from the registry by garbage collection.
    pub collected: Vec<JobId>,
}

impl SchedulerStep {
    pub fn is_empty(&self) -> bool {
        self.dispatched.is_empty() && self.notifications.is_empty() && self.collected.is_empty()
    }

    pub fn merge(&mut self, other: SchedulerStep) {
        self.dispatched.extend(other.dispatched);
        self.notifications.extend(other.notifications);
        self.collected.extend(other.collected);
    }
}
