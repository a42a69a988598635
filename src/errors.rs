// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! These cover failures of the scheduler *itself* (bad plan files, rejected
//! admissions, a closed engine). A job whose body fails is not an error at
//! this level: the failure is recorded on the job and reported through
//! status polling and notifications.

use thiserror::Error;

use crate::dag::JobId;

#[derive(Error, Debug)]
pub enum JobdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Job already admitted: {0}")]
    DuplicateJob(JobId),

    #[error("Dependency cycle: {0}")]
    DependencyCycle(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Engine is no longer running")]
    EngineClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure raised by a job body. Its `Display` text becomes the job's
/// recorded `error`.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskError {
    pub fn failed(msg: impl Into<String>) -> Self {
        TaskError::Failed(msg.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobdagError>;
