// src/dag/status_board.rs

//! Bounded memory of jobs that have already been garbage collected, so that
//! status polls keep working after a job leaves the registry.

use std::collections::{HashMap, VecDeque};

use crate::dag::job::{JobId, JobSnapshot};

#[derive(Debug)]
pub struct StatusBoard {
    capacity: usize,
    order: VecDeque<JobId>,
    snapshots: HashMap<JobId, JobSnapshot>,
}

impl StatusBoard {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            snapshots: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, id: &JobId) -> Option<&JobSnapshot> {
        self.snapshots.get(id)
    }

    /// Remember the final snapshot of a job, evicting the oldest entries
    /// beyond capacity.
    pub fn record(&mut self, snapshot: JobSnapshot) {
        let id = snapshot.id.clone();
        if self.snapshots.insert(id.clone(), snapshot).is_none() {
            self.order.push_back(id);
        }

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.snapshots.remove(&oldest);
            }
        }
    }
}
