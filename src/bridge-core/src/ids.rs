// SPDX-License-Identifier: Apache-2.0

//! Stable identifiers used in Redfish resource URIs.

use std::fmt;

/// A `TaskService` task id, rendered into `/redfish/v1/TaskService/Tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct TaskId(String);

impl TaskId {
    /// Generates a new random task id.
    pub fn new() -> Self {
        Self(utils::ids::random_hex_id(8))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A System Event Log entry id, rendered into `/redfish/v1/.../LogServices/SEL/Entries/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct EventId(String);

impl EventId {
    /// Generates a new random event id.
    pub fn new() -> Self {
        Self(utils::ids::random_hex_id(8))
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_are_distinct() {
        assert_ne!(TaskId::new(), TaskId::new());
    }

    #[test]
    fn event_ids_are_distinct() {
        assert_ne!(EventId::new(), EventId::new());
    }
}
