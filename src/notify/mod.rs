// src/notify/mod.rs

//! Job lifecycle notifications.
//!
//! The scheduler hands a [`JobSnapshot`] to a [`Notifier`] after every
//! status transition (`processing`, `completed`, `failed`). Delivery is
//! best effort: a notifier must return promptly, may drop updates it
//! cannot deliver, and has no way to report failure back to the scheduler.
//!
//! - [`hub`] routes snapshots to per-client channels.
//! - [`sinks`] contains the log, JSON-lines and fan-out notifiers.

pub mod hub;
pub mod sinks;

use std::sync::Arc;

use crate::dag::{ClientId, JobSnapshot};

pub use hub::ClientHub;
pub use sinks::{FanoutNotifier, JsonLinesNotifier, LogNotifier};

/// Receives lifecycle updates. Fire-and-forget: implementations must not
/// block.
pub trait Notifier: Send + Sync {
    fn notify(&self, client: Option<&ClientId>, snapshot: &JobSnapshot);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, client: Option<&ClientId>, snapshot: &JobSnapshot) {
        (**self).notify(client, snapshot)
    }
}
