use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::entry::Entry;
use crate::models::event::{CaptureEvent, EventStatus};
use crate::paths;

/// What a capture event did to the canonical set. Carries clones of the
/// affected entry so the caller can write them through to persistence
/// without re-locking the store.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// Processing-only or unusable event; the canonical set is untouched.
    Ignored,
    Created(Entry),
    Updated { previous_path: String, entry: Entry },
}

/// Finds the existing entry an incoming event refers to. Exact normalized
/// path match wins; otherwise a rename is inferred from a creation time
/// within `tolerance` of an existing entry with a different path and the
/// same extension. Producers rename files shortly after creation while the
/// original creation timestamp survives, so the old entry must be updated in
/// place rather than duplicated.
pub fn resolve_identity(
    entries: &[Entry],
    path: &str,
    created_at: Option<DateTime<Utc>>,
    tolerance: Duration,
) -> Option<usize> {
    let key = paths::identity_key(path);
    if key.is_empty() {
        return None;
    }
    if let Some(index) = entries.iter().position(|e| e.identity_key() == key) {
        return Some(index);
    }

    let incoming_at = created_at?;
    let incoming_ext = paths::extension(path);
    let candidates: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| {
            e.identity_key() != key
                && paths::extension(&e.path) == incoming_ext
                && within_tolerance(e.created_at, incoming_at, tolerance)
        })
        .map(|(i, _)| i)
        .collect();

    match candidates.as_slice() {
        [] => None,
        [index] => Some(*index),
        [first, ..] => {
            warn!(
                incoming = %path,
                matched = %entries[*first].path,
                candidates = candidates.len(),
                "ambiguous rename inference, keeping earliest match"
            );
            Some(*first)
        }
    }
}

fn within_tolerance(a: DateTime<Utc>, b: DateTime<Utc>, tolerance: Duration) -> bool {
    let delta = (a - b).num_milliseconds().unsigned_abs();
    (delta as u128) < tolerance.as_millis()
}

/// Merges newly reported text into what is already stored. OCR passes are
/// noisy and a later pass is not guaranteed to be better, so previously
/// captured tokens are never dropped: longer text wins outright, shorter
/// text only contributes the tokens the stored text lacks.
pub fn merge_text(old: &str, new: &str) -> String {
    let old = old.trim();
    let new = new.trim();
    if old.is_empty() || new.len() > old.len() {
        return new.to_string();
    }

    let known: HashSet<String> = old.split_whitespace().map(str::to_lowercase).collect();
    let mut appended: HashSet<String> = HashSet::new();
    let mut merged = old.to_string();
    for token in new.split_whitespace() {
        let folded = token.to_lowercase();
        if !known.contains(&folded) && appended.insert(folded) {
            merged.push(' ');
            merged.push_str(token);
        }
    }
    merged
}

/// Collapses entries sharing a normalized identity down to the single best
/// record: longest text wins, ties keep the earliest-seen entry. Idempotent;
/// runs after every ingestion and as the periodic safety net.
pub fn dedupe_entries(entries: Vec<Entry>) -> Vec<Entry> {
    let mut kept: Vec<Entry> = Vec::with_capacity(entries.len());
    for entry in entries {
        let key = entry.identity_key();
        match kept.iter_mut().find(|e| e.identity_key() == key) {
            Some(existing) => {
                if entry.text.len() > existing.text.len() {
                    *existing = entry;
                }
            }
            None => kept.push(entry),
        }
    }
    kept
}

/// Canonical ordering: newest first, path as the tie-breaker.
pub fn sort_canonical(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.path.cmp(&b.path))
    });
}

/// Folds one capture event into the canonical set, restoring invariants
/// (dedupe + canonical order) before returning. `now` backs entries whose
/// producer reported no creation time.
pub fn apply_capture(
    entries: &mut Vec<Entry>,
    event: &CaptureEvent,
    now: DateTime<Utc>,
    tolerance: Duration,
) -> CaptureOutcome {
    if event.status == EventStatus::Processing {
        return CaptureOutcome::Ignored;
    }

    let normalized = paths::normalize(&event.path);
    if normalized.is_empty() {
        return CaptureOutcome::Ignored;
    }

    let outcome = match resolve_identity(entries, &normalized, event.created_at, tolerance) {
        Some(index) => {
            let entry = &mut entries[index];
            let previous_path = entry.path.clone();
            entry.path = normalized;
            if let Some(text) = &event.text {
                entry.text = merge_text(&entry.text, text);
            }
            if let Some(tags) = &event.tags {
                entry.tags = tags.clone();
            }
            if let Some(urls) = &event.urls {
                entry.urls = urls.clone();
            }
            if let Some(emails) = &event.emails {
                entry.emails = emails.clone();
            }
            CaptureOutcome::Updated {
                previous_path,
                entry: entry.clone(),
            }
        }
        None => {
            // A failed pass with nothing to show creates nothing.
            if event.error.is_some() && event.text.is_none() {
                return CaptureOutcome::Ignored;
            }
            let mut entry = Entry::new(
                normalized,
                event.text.clone().unwrap_or_default().trim(),
                event.created_at.unwrap_or(now),
            );
            if let Some(tags) = &event.tags {
                entry.tags = tags.clone();
            }
            if let Some(urls) = &event.urls {
                entry.urls = urls.clone();
            }
            if let Some(emails) = &event.emails {
                entry.emails = emails.clone();
            }
            entries.push(entry.clone());
            CaptureOutcome::Created(entry)
        }
    };

    restore_invariants(entries);
    outcome
}

/// Replaces the tag set for a path. Classification finishes out-of-band, so
/// tags routinely arrive after the entry exists; a refresh for an unknown
/// path is dropped. Resolution is by normalized path only.
pub fn apply_tags_update(entries: &mut Vec<Entry>, path: &str, tags: &[String]) -> Option<Entry> {
    let key = paths::identity_key(path);
    let entry = entries.iter_mut().find(|e| e.identity_key() == key)?;
    entry.tags = tags.to_vec();
    Some(entry.clone())
}

/// Removes every entry whose normalized path is in `paths`; returns the
/// display paths actually removed.
pub fn remove_paths(entries: &mut Vec<Entry>, paths_to_remove: &[String]) -> Vec<String> {
    let keys: HashSet<String> = paths_to_remove
        .iter()
        .map(|p| paths::identity_key(p))
        .collect();
    let mut removed = Vec::new();
    entries.retain(|e| {
        if keys.contains(&e.identity_key()) {
            removed.push(e.path.clone());
            false
        } else {
            true
        }
    });
    removed
}

pub fn restore_invariants(entries: &mut Vec<Entry>) {
    let deduped = dedupe_entries(std::mem::take(entries));
    *entries = deduped;
    sort_canonical(entries);
}
