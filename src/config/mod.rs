// src/config/mod.rs

//! Configuration for jobdag.
//!
//! Responsibilities:
//! - Define the TOML-backed plan file model and the programmatic
//!   [`SchedulerConfig`] (`model.rs`).
//! - Load a plan file from disk (`loader.rs`).
//! - Validate basic invariants like dependency correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigSection, JobConfig, PlanFile, RawPlanFile, SchedulerConfig, parse_duration};
