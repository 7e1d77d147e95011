pub mod directory;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard, broadcast};
use tracing::debug;
use uuid::Uuid;

use crate::models::metric::FreelancerAssignmentMetric;
use crate::models::opportunity::TargetType;
use crate::models::queue_entry::{QueueEntry, QueueEvent, QueueStatus};

/// Assignment metrics and queue entries, keyed by primary id.
#[derive(Debug, Default)]
pub struct Tables {
    metrics: HashMap<Uuid, FreelancerAssignmentMetric>,
    entries: HashMap<Uuid, QueueEntry>,
}

impl Tables {
    pub fn metric(&self, freelancer_id: &Uuid) -> Option<&FreelancerAssignmentMetric> {
        self.metrics.get(freelancer_id)
    }

    pub fn entry(&self, entry_id: &Uuid) -> Option<&QueueEntry> {
        self.entries.get(entry_id)
    }

    pub fn entries_for_target(&self, target_type: TargetType, target_id: Uuid) -> Vec<&QueueEntry> {
        self.entries
            .values()
            .filter(|entry| entry.is_for(target_type, target_id))
            .collect()
    }

    pub fn entries_for_freelancer(&self, freelancer_id: Uuid) -> Vec<&QueueEntry> {
        self.entries
            .values()
            .filter(|entry| entry.freelancer_id == freelancer_id)
            .collect()
    }

    pub fn notified_count(&self, target_type: TargetType, target_id: Uuid) -> usize {
        self.entries
            .values()
            .filter(|entry| {
                entry.is_for(target_type, target_id) && entry.status == QueueStatus::Notified
            })
            .count()
    }

    /// The pending entry that should be notified next: bucket ascending, score
    /// descending, oldest first, then the slot it was generated into.
    pub fn next_pending(&self, target_type: TargetType, target_id: Uuid) -> Option<&QueueEntry> {
        self.entries
            .values()
            .filter(|entry| {
                entry.is_for(target_type, target_id) && entry.status == QueueStatus::Pending
            })
            .min_by(|a, b| promotion_order(a, b))
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }
}

fn promotion_order(a: &QueueEntry, b: &QueueEntry) -> Ordering {
    a.priority_bucket
        .cmp(&b.priority_bucket)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.rank.cmp(&b.rank))
        .then_with(|| a.id.cmp(&b.id))
}

enum Undo {
    Metric(Uuid, Option<FreelancerAssignmentMetric>),
    Entry(Uuid, Option<QueueEntry>),
}

pub struct Store {
    tables: Mutex<Tables>,
    events_tx: broadcast::Sender<QueueEvent>,
}

impl Store {
    pub fn new(event_buffer_size: usize) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size.max(1));
        Self {
            tables: Mutex::new(Tables::default()),
            events_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events_tx.subscribe()
    }

    /// Opens a transaction. The store stays locked until it is committed or dropped, so
    /// transactions never interleave.
    pub async fn begin(&self) -> Transaction<'_> {
        Transaction {
            tables: self.tables.lock().await,
            events_tx: &self.events_tx,
            undo: Vec::new(),
            outbox: Vec::new(),
            committed: false,
        }
    }

    pub async fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let tables = self.tables.lock().await;
        f(&tables)
    }
}

/// A unit of work over [`Tables`]. Dropping it without [`Transaction::commit`] restores
/// every row it touched and discards staged events.
pub struct Transaction<'a> {
    tables: MutexGuard<'a, Tables>,
    events_tx: &'a broadcast::Sender<QueueEvent>,
    undo: Vec<Undo>,
    outbox: Vec<QueueEvent>,
    committed: bool,
}

impl Deref for Transaction<'_> {
    type Target = Tables;

    fn deref(&self) -> &Self::Target {
        &self.tables
    }
}

impl Transaction<'_> {
    /// Returns the freelancer's metric row, creating the baseline row on first use.
    pub fn ensure_metric(
        &mut self,
        freelancer_id: Uuid,
        now: DateTime<Utc>,
    ) -> &mut FreelancerAssignmentMetric {
        let previous = self.tables.metrics.get(&freelancer_id).cloned();
        if previous.is_none() {
            debug!(freelancer_id = %freelancer_id, "creating baseline assignment metric");
        }
        self.undo.push(Undo::Metric(freelancer_id, previous));

        self.tables
            .metrics
            .entry(freelancer_id)
            .or_insert_with(|| FreelancerAssignmentMetric::baseline(freelancer_id, now))
    }

    pub fn entry_mut(&mut self, entry_id: &Uuid) -> Option<&mut QueueEntry> {
        let previous = self.tables.entries.get(entry_id)?.clone();
        self.undo.push(Undo::Entry(*entry_id, Some(previous)));
        self.tables.entries.get_mut(entry_id)
    }

    pub fn insert_entry(&mut self, entry: QueueEntry) {
        let previous = self.tables.entries.insert(entry.id, entry.clone());
        self.undo.push(Undo::Entry(entry.id, previous));
    }

    /// Expires every open entry for the opportunity and returns their ids.
    pub fn expire_open_entries(
        &mut self,
        target_type: TargetType,
        target_id: Uuid,
        now: DateTime<Utc>,
        reason: &str,
    ) -> Vec<Uuid> {
        let open: Vec<Uuid> = self
            .tables
            .entries
            .values()
            .filter(|entry| entry.is_for(target_type, target_id) && entry.status.is_open())
            .map(|entry| entry.id)
            .collect();

        for entry_id in &open {
            if let Some(entry) = self.entry_mut(entry_id) {
                entry.status = QueueStatus::Expired;
                entry.resolved_at = Some(now);
                entry.updated_at = now;
                entry.metadata.expired_reason = Some(reason.to_string());
            }
        }

        open
    }

    /// Queues an event for delivery once the transaction commits.
    pub fn stage_event(&mut self, event: QueueEvent) {
        self.outbox.push(event);
    }

    pub fn commit(mut self) {
        self.committed = true;
        self.undo.clear();

        for event in std::mem::take(&mut self.outbox) {
            // No subscribers is not an error.
            let _ = self.events_tx.send(event);
        }
    }

    pub fn rollback(self) {}
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.committed || self.undo.is_empty() {
            return;
        }

        debug!(rows = self.undo.len(), "rolling back transaction");
        while let Some(undo) = self.undo.pop() {
            match undo {
                Undo::Metric(id, Some(previous)) => {
                    self.tables.metrics.insert(id, previous);
                }
                Undo::Metric(id, None) => {
                    self.tables.metrics.remove(&id);
                }
                Undo::Entry(id, Some(previous)) => {
                    self.tables.entries.insert(id, previous);
                }
                Undo::Entry(id, None) => {
                    self.tables.entries.remove(&id);
                }
            }
        }
    }
}
