// SPDX-License-Identifier: Apache-2.0

//! The per-VM System Event Log, surfaced over both IPMI (SEL commands) and Redfish
//! (`LogServices/SEL`) from the same backing store.

use std::collections::VecDeque;

use crate::ids::EventId;

/// Maximum entries retained per VM before the oldest is evicted.
pub const SEL_CAPACITY: usize = 512;

/// Severity, shared by both the IPMI SEL event-type byte mapping and Redfish's `Severity` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum EventSeverity {
    /// Informational, no action required.
    Ok,
    /// Degraded condition.
    Warning,
    /// Failure condition.
    Critical,
}

/// A single log entry, sourced from a lifecycle transition the bridge observed (power changes,
/// boot overrides, virtual media mutations).
#[derive(Debug, Clone, serde::Serialize)]
pub struct EventLogEntry {
    /// Entry id, stable for the lifetime of the entry within the ring buffer.
    pub id: EventId,
    /// Severity of the event.
    pub severity: EventSeverity,
    /// Human-readable message, e.g. "Host power state changed to On".
    pub message: String,
}

impl EventLogEntry {
    /// Builds a new entry with a freshly generated id.
    pub fn new(severity: EventSeverity, message: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            severity,
            message: message.into(),
        }
    }
}

/// A bounded, append-only ring buffer of [`EventLogEntry`] for one VM.
///
/// Backs both the IPMI `Get SEL Entry` / `Reserve SEL` commands and the Redfish
/// `LogServices/SEL/Entries` collection — one store, two protocol views.
#[derive(Debug, Default)]
pub struct EventStore {
    entries: VecDeque<EventLogEntry>,
    /// Bumped whenever the store is mutated; IPMI's "Reserve SEL" + "Get SEL Info" use this to
    /// detect a log that changed out from under a reservation.
    reservation_id: u16,
}

impl EventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, evicting the oldest if the store is at [`SEL_CAPACITY`].
    pub fn push(&mut self, entry: EventLogEntry) {
        if self.entries.len() >= SEL_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.reservation_id = self.reservation_id.wrapping_add(1);
    }

    /// Returns all entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &EventLogEntry> {
        self.entries.iter()
    }

    /// Returns the number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry at `index` counting from the oldest, if present. Used by IPMI's
    /// `Get SEL Entry` command, which addresses records by a record-id cursor.
    pub fn get(&self, index: usize) -> Option<&EventLogEntry> {
        self.entries.get(index)
    }

    /// Current reservation/change id, opaque to callers beyond equality comparison.
    pub fn reservation_id(&self) -> u16 {
        self.reservation_id
    }

    /// Clears the log. IPMI's "Clear SEL" command and Redfish's `ClearLog` action both route
    /// here.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.reservation_id = self.reservation_id.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_evicts_oldest_past_capacity() {
        let mut store = EventStore::new();
        for i in 0..SEL_CAPACITY + 10 {
            store.push(EventLogEntry::new(EventSeverity::Ok, format!("event {i}")));
        }
        assert_eq!(store.len(), SEL_CAPACITY);
        let first = store.get(0).unwrap();
        assert_eq!(first.message, "event 10");
    }

    #[test]
    fn clear_empties_the_log_and_bumps_reservation() {
        let mut store = EventStore::new();
        store.push(EventLogEntry::new(EventSeverity::Warning, "boot override set"));
        let before = store.reservation_id();
        store.clear();
        assert!(store.is_empty());
        assert_ne!(store.reservation_id(), before);
    }

    #[test]
    fn push_bumps_reservation_id() {
        let mut store = EventStore::new();
        let before = store.reservation_id();
        store.push(EventLogEntry::new(EventSeverity::Ok, "power on"));
        assert_ne!(store.reservation_id(), before);
    }
}
