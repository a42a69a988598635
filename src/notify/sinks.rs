// src/notify/sinks.rs

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::{ClientId, JobSnapshot, JobStatus};
use crate::notify::Notifier;

/// Logs every transition through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, client: Option<&ClientId>, snapshot: &JobSnapshot) {
        let client = client.map(ClientId::as_str).unwrap_or("-");
        match snapshot.status {
            JobStatus::Failed => warn!(
                job = %snapshot.id,
                client,
                error = snapshot.error.as_deref().unwrap_or(""),
                "job update: failed"
            ),
            status => info!(job = %snapshot.id, client, ?status, "job update"),
        }
    }
}

/// Writes each snapshot as one JSON object per line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesNotifier;

impl Notifier for JsonLinesNotifier {
    fn notify(&self, _client: Option<&ClientId>, snapshot: &JobSnapshot) {
        let line = match serde_json::to_string(snapshot) {
            Ok(line) => line,
            Err(e) => {
                debug!(job = %snapshot.id, error = %e, "failed to serialise job update");
                return;
            }
        };

        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}") {
            debug!(job = %snapshot.id, error = %e, "failed to write job update");
        }
    }
}

/// Forwards every update to each inner notifier in order.
#[derive(Default, Clone)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, client: Option<&ClientId>, snapshot: &JobSnapshot) {
        for sink in &self.sinks {
            sink.notify(client, snapshot);
        }
    }
}
