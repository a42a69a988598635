// src/exec/mod.rs

//! Job execution layer.
//!
//! - [`handler`] defines the `TaskHandler` trait and the name -> handler
//!   registry jobs are resolved against.
//! - [`builtins`] contains the handlers available to plan files
//!   (`echo`, `fail`, `sleep`, `shell`).
//! - [`task_runner`] runs one job body (with optional deadline) and
//!   reports its outcome to the engine.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `TaskExecutor` used in production, which tests can replace with a fake
//!   implementation.

pub mod backend;
pub mod builtins;
pub mod handler;
pub mod task_runner;

pub use backend::{ExecutorBackend, TaskExecutor};
pub use handler::{FnHandler, TaskFuture, TaskHandler, TaskRegistry, handler_fn};
