//! Capped FIFO log shared by every ledger.

use std::collections::VecDeque;

/// Append-only log holding at most `cap` entries. Pushing past the cap
/// evicts the oldest entry; the newest is always kept.
///
/// Not synchronized on its own; owners wrap it in a lock.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    cap: usize,
}

impl<T> BoundedLog<T> {
    /// Create a log holding at most `cap` entries (a cap of zero is raised to one).
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            entries: VecDeque::with_capacity(cap.min(1024)),
            cap,
        }
    }

    /// Append an entry, returning the evicted oldest entry if the cap was hit.
    pub fn push(&mut self, entry: T) -> Option<T> {
        let evicted = if self.entries.len() >= self.cap {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Oldest → newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.iter()
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> BoundedLog<T> {
    /// Copy of all entries, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }

    /// Copy of all entries, newest first.
    pub fn newest_first(&self) -> Vec<T> {
        self.entries.iter().rev().cloned().collect()
    }
}
