//! Rolling window of admitted evidence.

use crate::models::ChatEvidence;
use std::collections::VecDeque;

/// Ordered, bounded FIFO of [`ChatEvidence`].
///
/// Never holds more than `capacity` entries; pushing into a full window
/// evicts the oldest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceWindow {
    entries: VecDeque<ChatEvidence>,
    capacity: usize,
}

impl EvidenceWindow {
    /// Creates an empty window.
    ///
    /// A capacity of 0 is treated as 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an entry, returning the evicted one if the window was full.
    pub fn push(&mut self, evidence: ChatEvidence) -> Option<ChatEvidence> {
        self.entries.push_back(evidence);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    /// Keeps only the newest `tail` entries.
    pub fn retain_tail(&mut self, tail: usize) {
        let excess = self.entries.len().saturating_sub(tail);
        self.entries.drain(..excess);
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copies the entries out, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<ChatEvidence> {
        self.entries.iter().cloned().collect()
    }

    /// Iterates the entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ChatEvidence> {
        self.entries.iter()
    }
}
