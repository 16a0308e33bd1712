use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::models::entry::Entry;
use crate::models::event::{CaptureEvent, EventStatus};
use crate::services::reconcile_service::{self, CaptureOutcome};

/// UI-facing view of the transient producer status. Errors expire after the
/// configured display window; they never affect the canonical set.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub phase: EventStatus,
    pub last_path: Option<String>,
    pub last_error: Option<String>,
}

/// Owner of the canonical entry set. All mutation funnels through this type
/// (behind one lock in the engine), and every mutator restores the set's
/// invariants — unique normalized paths, newest-first order — before
/// returning. Nothing else writes entry fields.
pub struct EntryStore {
    config: EngineConfig,
    entries: Vec<Entry>,
    phase: EventStatus,
    last_path: Option<String>,
    last_error: Option<(String, Instant)>,
}

impl EntryStore {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            phase: EventStatus::Idle,
            last_path: None,
            last_error: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bulk load from persistence at startup. Loaded data gets the same
    /// invariant treatment as live events; the store trusts nobody.
    pub fn replace_all(&mut self, entries: Vec<Entry>) {
        self.entries = entries;
        reconcile_service::restore_invariants(&mut self.entries);
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Folds one capture event in, recording transient status as a side
    /// effect. `now` timestamps entries without a reported creation time;
    /// `seen_at` anchors the error display window.
    pub fn ingest(
        &mut self,
        event: &CaptureEvent,
        now: DateTime<Utc>,
        seen_at: Instant,
    ) -> CaptureOutcome {
        self.phase = event.status;
        self.last_path = Some(event.path.clone());
        if let Some(error) = &event.error {
            self.last_error = Some((error.clone(), seen_at));
        }

        reconcile_service::apply_capture(
            &mut self.entries,
            event,
            now,
            self.config.rename_tolerance,
        )
    }

    pub fn set_tags(&mut self, path: &str, tags: &[String]) -> Option<Entry> {
        reconcile_service::apply_tags_update(&mut self.entries, path, tags)
    }

    /// Drops entries for deleted files; returns the display paths removed.
    pub fn remove_paths(&mut self, paths: &[String]) -> Vec<String> {
        reconcile_service::remove_paths(&mut self.entries, paths)
    }

    pub fn toggle_pin(&mut self, path: &str) -> Option<Entry> {
        let key = crate::paths::identity_key(path);
        let entry = self.entries.iter_mut().find(|e| e.identity_key() == key)?;
        entry.pinned = !entry.pinned;
        Some(entry.clone())
    }

    pub fn add_custom_tag(&mut self, path: &str, tag: &str) -> Option<Entry> {
        let key = crate::paths::identity_key(path);
        let entry = self.entries.iter_mut().find(|e| e.identity_key() == key)?;
        if !entry.custom_tags.iter().any(|t| t == tag) {
            entry.custom_tags.push(tag.to_string());
        }
        Some(entry.clone())
    }

    pub fn remove_custom_tag(&mut self, path: &str, tag: &str) -> Option<Entry> {
        let key = crate::paths::identity_key(path);
        let entry = self.entries.iter_mut().find(|e| e.identity_key() == key)?;
        entry.custom_tags.retain(|t| t != tag);
        Some(entry.clone())
    }

    /// Safety-net pass; returns true when it actually collapsed something.
    pub fn dedupe_sweep(&mut self) -> bool {
        let before = self.entries.len();
        reconcile_service::restore_invariants(&mut self.entries);
        self.entries.len() != before
    }

    /// Transient status with the error display window applied.
    pub fn status(&self, now: Instant) -> StatusSnapshot {
        let last_error = self.last_error.as_ref().and_then(|(error, seen_at)| {
            if now.duration_since(*seen_at) < self.config.error_display_window {
                Some(error.clone())
            } else {
                None
            }
        });
        StatusSnapshot {
            phase: self.phase,
            last_path: self.last_path.clone(),
            last_error,
        }
    }
}
