//! Round-Robin Cursor
//!
//! One counter per logical name, advanced on every split routing decision.
//! Counters live in memory for the life of the owning router; balance is
//! per process, not across a fleet of dispatchers.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

/// Per-name round-robin positions
#[derive(Debug, Default)]
pub struct RoundRobinCursor {
    positions: DashMap<String, AtomicUsize>,
}

impl RoundRobinCursor {
    /// Create an empty cursor table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the current index for `name` in `[0, in_use)` and advance it
    ///
    /// The first call for a name returns 0. Concurrent callers each observe a
    /// distinct step of the rotation.
    pub fn next_index(&self, name: &str, in_use: usize) -> usize {
        let in_use = in_use.max(1);

        if let Some(slot) = self.positions.get(name) {
            return advance(&slot, in_use);
        }

        let slot = self
            .positions
            .entry(name.to_owned())
            .or_insert_with(|| AtomicUsize::new(0));
        advance(&slot, in_use)
    }

    /// Index the next call for `name` would start from, if it was ever routed
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions
            .get(name)
            .map(|slot| slot.load(Ordering::Acquire))
    }

    /// Number of names with a cursor
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no name has been routed yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Forget every cursor
    pub fn reset(&self) {
        self.positions.clear();
    }
}

fn advance(slot: &AtomicUsize, in_use: usize) -> usize {
    // The closure never declines, so both arms carry the previous value.
    let (Ok(previous) | Err(previous)) =
        slot.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            Some((current % in_use + 1) % in_use)
        });
    previous % in_use
}
