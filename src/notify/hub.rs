// src/notify/hub.rs

//! Per-client delivery channels, keyed by [`ClientId`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use crate::dag::{ClientId, JobSnapshot};
use crate::notify::Notifier;

/// Routes each snapshot to the channel registered for its client.
///
/// Clients register to obtain a receiver; a client that registers again
/// replaces its previous channel. Snapshots for clients without a channel,
/// or whose channel is full or closed, are dropped.
#[derive(Debug)]
pub struct ClientHub {
    capacity: usize,
    clients: Mutex<HashMap<ClientId, mpsc::Sender<JobSnapshot>>>,
}

impl ClientHub {
    /// `capacity` bounds each client's backlog (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, client: ClientId) -> mpsc::Receiver<JobSnapshot> {
        let (tx, rx) = mpsc::channel(self.capacity);
        debug!(client = %client, "client registered for job updates");
        self.lock().insert(client, tx);
        rx
    }

    pub fn unregister(&self, client: &ClientId) -> bool {
        let removed = self.lock().remove(client).is_some();
        if removed {
            debug!(client = %client, "client unregistered");
        }
        removed
    }

    pub fn is_connected(&self, client: &ClientId) -> bool {
        self.lock()
            .get(client)
            .is_some_and(|tx| !tx.is_closed())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClientId, mpsc::Sender<JobSnapshot>>> {
        self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ClientHub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Notifier for ClientHub {
    fn notify(&self, client: Option<&ClientId>, snapshot: &JobSnapshot) {
        let Some(client) = client else {
            return;
        };

        let mut clients = self.lock();
        let Some(tx) = clients.get(client) else {
            debug!(client = %client, job = %snapshot.id, "client not connected; dropping update");
            return;
        };

        match tx.try_send(snapshot.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!(client = %client, job = %snapshot.id, "client backlog full; dropping update");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(client = %client, "client channel closed; unregistering");
                clients.remove(client);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{Job, JobSpec};

    fn snapshot(id: &str, client: &str) -> JobSnapshot {
        Job::from_spec(JobSpec::new(id, "echo").for_client(client)).snapshot()
    }

    #[test]
    fn delivers_to_registered_client_only() {
        let hub = ClientHub::new(4);
        let alice = ClientId::from("alice");
        let bob = ClientId::from("bob");
        let mut rx = hub.register(alice.clone());

        hub.notify(Some(&alice), &snapshot("a", "alice"));
        hub.notify(Some(&bob), &snapshot("b", "bob"));
        hub.notify(None, &snapshot("c", "alice"));

        assert_eq!(rx.try_recv().unwrap().id.as_str(), "a");
        assert!(rx.try_recv().is_err());
        assert!(!hub.is_connected(&bob));
    }

    #[test]
    fn full_backlog_drops_instead_of_blocking() {
        let hub = ClientHub::new(1);
        let alice = ClientId::from("alice");
        let mut rx = hub.register(alice.clone());

        hub.notify(Some(&alice), &snapshot("first", "alice"));
        hub.notify(Some(&alice), &snapshot("second", "alice"));

        assert_eq!(rx.try_recv().unwrap().id.as_str(), "first");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_receiver_unregisters_client() {
        let hub = ClientHub::new(1);
        let alice = ClientId::from("alice");
        drop(hub.register(alice.clone()));

        assert!(!hub.is_connected(&alice));
        hub.notify(Some(&alice), &snapshot("a", "alice"));
        assert!(!hub.unregister(&alice), "closed channel was already removed");
    }
}
