use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::models::entry::Entry;
use crate::models::event::BatchProgress;
use crate::paths;
use crate::services::query_service::QueryFilter;

/// Multi-select bookkeeping over the active result list. The selection is
/// keyed by normalized path, cleared whenever the active query changes, and
/// reconciled against the live canonical set so it never references a
/// deleted entry.
#[derive(Debug, Default)]
pub struct SelectionState {
    selected: BTreeSet<String>,
    active_filter: QueryFilter,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the active query; a changed query drops the selection.
    pub fn set_filter(&mut self, filter: QueryFilter) {
        if filter != self.active_filter {
            self.selected.clear();
            self.active_filter = filter;
        }
    }

    pub fn toggle(&mut self, path: &str) {
        let key = paths::identity_key(path);
        if !self.selected.remove(&key) {
            self.selected.insert(key);
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.selected.contains(&paths::identity_key(path))
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Drops any selected path no longer present in the canonical set.
    pub fn reconcile(&mut self, live: &[Entry]) {
        let live_keys: BTreeSet<String> = live.iter().map(Entry::identity_key).collect();
        self.selected.retain(|key| live_keys.contains(key));
    }

    /// Display paths of the selection, resolved against the live set.
    pub fn selected_paths(&self, live: &[Entry]) -> Vec<String> {
        live.iter()
            .filter(|e| self.selected.contains(&e.identity_key()))
            .map(|e| e.path.clone())
            .collect()
    }
}

/// Verbatim passthrough of externally reported ingestion-batch counters.
#[derive(Debug, Default)]
pub struct BatchTracker {
    current: BatchProgress,
}

impl BatchTracker {
    pub fn update(&mut self, progress: BatchProgress) {
        self.current = progress;
    }

    pub fn snapshot(&self) -> BatchProgress {
        self.current.clone()
    }
}

/// Debounce bookkeeping for the periodic dedupe safety-net pass: the sweep
/// only fires once the store is big enough, and never more than once per
/// interval.
#[derive(Debug)]
pub struct SweepScheduler {
    min_entries: usize,
    interval: Duration,
    last_sweep: Option<Instant>,
}

impl SweepScheduler {
    pub fn new(min_entries: usize, interval: Duration) -> Self {
        Self {
            min_entries,
            interval,
            last_sweep: None,
        }
    }

    /// Returns true (and arms the debounce) when a sweep is due.
    pub fn should_sweep(&mut self, store_len: usize, now: Instant) -> bool {
        if store_len < self.min_entries {
            return false;
        }
        if let Some(last) = self.last_sweep {
            if now.duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_sweep = Some(now);
        true
    }
}
