//! Patterns waiting for their activation frame

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::pattern::MovePattern;

/// Future frame -> patterns to activate on that frame, in submission order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternSchedule {
    slots: BTreeMap<u32, Vec<MovePattern>>,
}

impl PatternSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `pattern` to the list for `frame`
    pub fn push(&mut self, frame: u32, pattern: MovePattern) {
        self.slots.entry(frame).or_default().push(pattern);
    }

    /// Remove and return every pattern due at or before `frame`, earliest
    /// frame first, submission order within a frame.
    pub fn take_due(&mut self, frame: u32) -> Vec<MovePattern> {
        let later = match frame.checked_add(1) {
            Some(next) => self.slots.split_off(&next),
            None => BTreeMap::new(),
        };
        let due = std::mem::replace(&mut self.slots, later);
        due.into_values().flatten().collect()
    }

    /// Total number of queued patterns
    pub fn len(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Earliest frame that has something queued
    pub fn next_frame(&self) -> Option<u32> {
        self.slots.keys().next().copied()
    }
}
