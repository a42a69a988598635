// src/dag/mod.rs

//! Job graph and scheduling core. Pure and synchronous: no Tokio, no IO.
//!
//! - [`job`] defines job identities, status and the canonical job record.
//! - [`registry`] owns admitted jobs and their dependency edges.
//! - [`resolver`] decides whether a queued job can run.
//! - [`propagate`] cascades a failure to every dependent.
//! - [`gc`] prunes finished jobs nobody depends on.
//! - [`scheduler`] ties these together with the ready queue, the waiting
//!   set and the concurrency limit.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`status_board`] keeps final statuses of collected jobs for polling.

pub mod gc;
pub mod job;
pub mod propagate;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod scheduler_step;
pub mod status_board;

pub use job::{ClientId, Job, JobId, JobOutcome, JobSnapshot, JobSpec, JobStatus, JobStatusReport};
pub use registry::Registry;
pub use resolver::Readiness;
pub use scheduler::Scheduler;
pub use scheduler_step::{DispatchedJob, SchedulerStep};
pub use status_board::StatusBoard;
