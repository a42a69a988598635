// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod notify;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{PlanFile, load_and_validate};
use crate::errors::JobdagError;
use crate::exec::TaskRegistry;
use crate::notify::{FanoutNotifier, JsonLinesNotifier, LogNotifier};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading and validation
/// - the task registry with the built-in handlers
/// - the engine and its notifiers
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let plan_path = PathBuf::from(&args.plan);
    let plan = load_and_validate(&plan_path)?;

    let tasks = TaskRegistry::with_builtins();
    check_tasks_known(&plan, &tasks)?;

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(());
    }

    let mut cfg = plan.scheduler_config();
    if let Some(max) = args.max_concurrent {
        if max == 0 {
            return Err(JobdagError::ConfigError("--max-concurrent must be at least 1".to_string()).into());
        }
        cfg = cfg.with_max_concurrent(max);
    }

    let notifier = FanoutNotifier::new()
        .with(Arc::new(JsonLinesNotifier))
        .with(Arc::new(LogNotifier));

    let queue = engine::spawn(cfg, tasks, Arc::new(notifier));

    let specs = plan.job_specs();
    info!(jobs = specs.len(), max_concurrent = cfg.max_concurrent, "admitting plan");
    queue.admit_batch(specs).await?;

    tokio::select! {
        res = queue.wait_idle() => {
            res?;
            info!("all jobs finished");
        }
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => warn!("interrupted; abandoning unfinished jobs"),
                Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
            }
        }
    }

    queue.shutdown().await?;
    Ok(())
}

/// Every job in the plan must name a registered task.
fn check_tasks_known(plan: &PlanFile, tasks: &TaskRegistry) -> Result<(), JobdagError> {
    for (name, job) in &plan.job {
        if !tasks.contains(&job.task) {
            let mut known: Vec<&str> = tasks.names().collect();
            known.sort_unstable();
            return Err(JobdagError::UnknownTask(format!(
                "job '{name}' uses task '{}' (known tasks: {})",
                job.task,
                known.join(", ")
            )));
        }
    }
    Ok(())
}

/// Simple dry-run output: print config, jobs and their dependencies.
fn print_dry_run(plan: &PlanFile) {
    let cfg = plan.scheduler_config();

    println!("jobdag dry-run");
    println!("  config.max_concurrent = {}", cfg.max_concurrent);
    if let Some(timeout) = cfg.job_timeout {
        println!("  config.job_timeout = {timeout:?}");
    }
    println!("  config.status_retention = {}", cfg.status_retention);
    println!();

    println!("jobs ({}):", plan.job.len());
    for (name, job) in &plan.job {
        println!("  - {name}");
        println!("      task: {}", job.task);
        if !job.params.is_empty() {
            let params: Vec<String> = job.params.iter().map(|p| p.to_string()).collect();
            println!("      params: [{}]", params.join(", "));
        }
        if !job.after.is_empty() {
            println!("      after: {:?}", job.after);
        }
        if let Some(ref client) = job.client {
            println!("      client: {client}");
        }
    }

    debug!("dry-run complete (no execution)");
}
