//! Per-bridge memo of the color last applied to each group.
//!
//! An absent entry means "unknown or off". Entries are only written after the
//! bridge accepted a `group-set`, so a failed write is retried next time.

use std::collections::HashMap;

use crate::config::StatusColor;

#[derive(Debug, Default)]
pub struct GroupStateCache {
    applied: HashMap<String, StatusColor>,
}

impl GroupStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, group: &str) -> Option<&StatusColor> {
        self.applied.get(group)
    }

    /// Whether `color` is already showing on `group`.
    pub fn is_applied(&self, group: &str, color: &StatusColor) -> bool {
        self.applied.get(group) == Some(color)
    }

    pub fn set(&mut self, group: &str, color: StatusColor) {
        self.applied.insert(group.to_string(), color);
    }

    pub fn clear(&mut self, group: &str) -> Option<StatusColor> {
        self.applied.remove(group)
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}
