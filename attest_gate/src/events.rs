// src/events.rs
// Notifications emitted after successful state changes (observability only)

use crate::identity::Identity;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateEvent {
    Authorized {
        identity: Identity,
    },
    Deauthorized {
        identity: Identity,
    },
    BatchSubmitted {
        submitter: Identity,
        recipient: Option<Identity>,
        count: usize,
    },
    BatchRevoked {
        revoker: Identity,
        count: usize,
    },
    FeesWithdrawn {
        to: Identity,
        amount: u128,
    },
    OwnershipTransferred {
        previous: Identity,
        new_owner: Identity,
    },
    MinimumFeeUpdated {
        previous: u128,
        current: u128,
    },
}

impl GateEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GateEvent::Authorized { .. } => "authorized",
            GateEvent::Deauthorized { .. } => "deauthorized",
            GateEvent::BatchSubmitted { .. } => "batch_submitted",
            GateEvent::BatchRevoked { .. } => "batch_revoked",
            GateEvent::FeesWithdrawn { .. } => "fees_withdrawn",
            GateEvent::OwnershipTransferred { .. } => "ownership_transferred",
            GateEvent::MinimumFeeUpdated { .. } => "minimum_fee_updated",
        }
    }
}

/// An event with the time it was recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub emitted_at: DateTime<Utc>,
    pub event: GateEvent,
}

/// Events kept by [`EventLog::new`]
pub const DEFAULT_RETENTION: usize = 10_000;

/// In-process event log shared by all gateway components.
///
/// Keeps at most `retention` records; the oldest are dropped first. Sequence
/// numbers keep counting across drops, so `since` still works for a reader
/// that has fallen behind (it just sees fewer records).
#[derive(Debug)]
pub struct EventLog {
    retention: usize,
    inner: RwLock<Records>,
}

#[derive(Debug, Default)]
struct Records {
    next_sequence: u64,
    records: VecDeque<EventRecord>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            retention: retention.max(1),
            inner: RwLock::new(Records::default()),
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn emit(&self, event: GateEvent) {
        tracing::debug!(event = event.name(), payload = ?event, "gate event");
        let mut inner = self.inner.write();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        if inner.records.len() == self.retention {
            inner.records.pop_front();
        }
        inner.records.push_back(EventRecord {
            sequence,
            emitted_at: Utc::now(),
            event,
        });
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Snapshot of the retained events in emission order
    pub fn events(&self) -> Vec<GateEvent> {
        self.inner
            .read()
            .records
            .iter()
            .map(|r| r.event.clone())
            .collect()
    }

    /// Records with sequence number >= `from`
    pub fn since(&self, from: u64) -> Vec<EventRecord> {
        self.inner
            .read()
            .records
            .iter()
            .filter(|r| r.sequence >= from)
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<GateEvent> {
        self.inner.read().records.back().map(|r| r.event.clone())
    }
}
