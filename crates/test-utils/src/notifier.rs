use std::sync::Mutex;

use jobdag::dag::{ClientId, JobId, JobSnapshot, JobStatus};
use jobdag::notify::Notifier;

/// Notifier that keeps every snapshot it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<(Option<ClientId>, JobSnapshot)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        self.seen.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
    }

    /// Statuses reported for `id`, in order.
    pub fn statuses_of(&self, id: &str) -> Vec<JobStatus> {
        let id = JobId::from(id);
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| s.id == id)
            .map(|(_, s)| s.status)
            .collect()
    }

    /// Client ids the notifier was called with for `id`.
    pub fn clients_of(&self, id: &str) -> Vec<Option<ClientId>> {
        let id = JobId::from(id);
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| s.id == id)
            .map(|(c, _)| c.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, client: Option<&ClientId>, snapshot: &JobSnapshot) {
        self.seen
            .lock()
            .unwrap()
            .push((client.cloned(), snapshot.clone()));
    }
}
