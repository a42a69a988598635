// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::dag::{JobId, JobSpec};

/// Runtime knobs for the scheduler and executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of job bodies executing at once.
    pub max_concurrent: usize,
    /// Optional per-job deadline. An overrunning body is aborted and its
    /// job fails, but the slot is only released once the body actually
    /// stops, which for a body that never yields is when it returns on its
    /// own. `None` means a hung body holds its slot forever.
    pub job_timeout: Option<Duration>,
    /// How many collected jobs keep answering status polls.
    pub status_retention: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            job_timeout: None,
            status_retention: default_status_retention(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    pub fn with_status_retention(mut self, retention: usize) -> Self {
        self.status_retention = retention;
        self
    }
}

/// Job plan as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// max_concurrent = 4
/// job_timeout = "30s"
///
/// [job.resize]
/// task = "shell"
/// params = ["echo resized"]
///
/// [job.upload]
/// task = "echo"
/// after = ["resize"]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPlanFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All jobs from `[job.<id>]`; keys are the job ids.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// A plan that passed validation. Build it with `PlanFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub config: ConfigSection,
    pub job: BTreeMap<String, JobConfig>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(config: ConfigSection, job: BTreeMap<String, JobConfig>) -> Self {
        Self { config, job }
    }

    /// Scheduler settings; the duration string was checked during
    /// validation.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrent: self.config.max_concurrent,
            job_timeout: self
                .config
                .job_timeout
                .as_deref()
                .and_then(|s| parse_duration(s).ok()),
            status_retention: self.config.status_retention,
        }
    }

    /// One [`JobSpec`] per `[job.<id>]` table, in id order.
    pub fn job_specs(&self) -> Vec<JobSpec> {
        self.job
            .iter()
            .map(|(id, jc)| {
                let mut spec = JobSpec::new(id.as_str(), jc.task.as_str())
                    .params(jc.params.iter().cloned());
                spec.depends_on = jc.after.iter().map(|d| JobId::from(d.as_str())).collect();
                if let Some(client) = &jc.client {
                    spec = spec.for_client(client.as_str());
                }
                spec
            })
            .collect()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Duration string such as `"500ms"`, `"30s"`, `"2m"`.
    #[serde(default)]
    pub job_timeout: Option<String>,

    #[serde(default = "default_status_retention")]
    pub status_retention: usize,
}

fn default_max_concurrent() -> usize {
    10
}

fn default_status_retention() -> usize {
    1024
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            job_timeout: None,
            status_retention: default_status_retention(),
        }
    }
}

/// `[job.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Name of the registered task handler that runs this job.
    pub task: String,

    /// Positional parameters, passed before dependency results.
    #[serde(default)]
    pub params: Vec<Value>,

    /// Ids of the jobs whose results this job consumes.
    #[serde(default)]
    pub after: Vec<String>,

    /// Notification routing key.
    #[serde(default)]
    pub client: Option<String>,
}

/// Parse a duration such as `"250ms"`, `"3s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
