//! # Mutation Observer
//!
//! Watches the content container for mutations the view did not make.
//!
//! ## Lifecycle
//!
//! ```text
//! start() ──► records queue in the tree ──► flush() ──► change log
//!    ▲                                                     │
//!    └──────────── stop() (takes queue, disconnects) ◄─────┘
//! ```
//!
//! Nothing that happens between `stop()` and the following `start()` is ever
//! reported: the registration does not exist during that window. Records
//! taken while the view holds its ignore guard are parked and only
//! considered once the guard is released, at which point self-caused ones
//! (by tree sequence number) are dropped.

use crate::tracker::UpdateTracker;
use std::rc::Rc;
use tracing::{debug, trace};
use weft_dom::{Dom, DomError, MutationKind, MutationRecord, NodeId, ObserveOptions, ObserverId};

/// Externally caused mutation surfaced to the input path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomChange {
    pub seq: u64,
    pub kind: MutationKind,
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

impl From<MutationRecord> for DomChange {
    fn from(record: MutationRecord) -> Self {
        Self {
            seq: record.seq,
            kind: record.kind,
            target: record.target,
            added: record.added,
            removed: record.removed,
        }
    }
}

#[derive(Debug)]
pub struct DomObserver {
    content: NodeId,
    options: ObserveOptions,
    registration: Option<ObserverId>,
    tracker: Rc<UpdateTracker>,
    parked: Vec<MutationRecord>,
    changes: Vec<DomChange>,
    notifications: u64,
    suppressed: u64,
}

impl DomObserver {
    pub fn new(content: NodeId, options: ObserveOptions, tracker: Rc<UpdateTracker>) -> Self {
        Self {
            content,
            options,
            registration: None,
            tracker,
            parked: Vec::new(),
            changes: Vec::new(),
            notifications: 0,
            suppressed: 0,
        }
    }

    /// Begin observing the content subtree; a no-op when already observing
    pub fn start(&mut self, dom: &mut Dom) -> Result<(), DomError> {
        if self.registration.is_some() {
            return Ok(());
        }
        let id = dom.observe(self.content, self.options)?;
        self.registration = Some(id);
        trace!(content = %self.content, "Observer started");
        Ok(())
    }

    /// Stop observing
    ///
    /// Records already queued predate the stop and are kept for the next
    /// flush; nothing produced after this returns will be seen.
    pub fn stop(&mut self, dom: &mut Dom) {
        let Some(id) = self.registration.take() else {
            return;
        };
        let records = dom.take_records(id);
        dom.disconnect(id);
        trace!(pending = records.len(), "Observer stopped");
        self.receive(records);
    }

    pub fn is_observing(&self) -> bool {
        self.registration.is_some()
    }

    /// Deliver everything queued since the last flush as one batch
    pub fn flush(&mut self, dom: &mut Dom) -> Vec<DomChange> {
        let records = match self.registration {
            Some(id) => dom.take_records(id),
            None => Vec::new(),
        };
        self.receive(records)
    }

    /// Changes delivered but not yet drained
    pub fn logged_changes(&self) -> &[DomChange] {
        &self.changes
    }

    /// Drain the change log
    pub fn take_changes(&mut self) -> Vec<DomChange> {
        std::mem::take(&mut self.changes)
    }

    /// Total number of changes ever reported
    pub fn notification_count(&self) -> u64 {
        self.notifications
    }

    /// Total number of records dropped as self-caused
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed
    }

    fn receive(&mut self, records: Vec<MutationRecord>) -> Vec<DomChange> {
        if self.tracker.is_held() {
            self.parked.extend(records);
            return Vec::new();
        }

        let mut batch: Vec<DomChange> = Vec::new();
        let parked = std::mem::take(&mut self.parked);
        for record in parked.into_iter().chain(records) {
            if self.tracker.is_self_caused(record.seq) {
                self.suppressed += 1;
                continue;
            }
            // Consecutive text edits on one node collapse into the latest
            if let Some(last) = batch.last_mut() {
                if last.kind == MutationKind::CharacterData
                    && record.kind == MutationKind::CharacterData
                    && last.target == record.target
                {
                    last.seq = record.seq;
                    continue;
                }
            }
            batch.push(DomChange::from(record));
        }

        if !batch.is_empty() {
            debug!(changes = batch.len(), "External mutations observed");
            self.notifications += batch.len() as u64;
            self.changes.extend(batch.iter().cloned());
        }
        batch
    }
}
