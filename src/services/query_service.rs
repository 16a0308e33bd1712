use chrono::{DateTime, Datelike, Days, Utc};

use crate::models::entry::Entry;
use crate::services::text_normalizer;

/// Active filter tuple for the library view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    pub free_text: String,
    pub collection: Option<String>,
    pub pinned_only: bool,
}

/// A display bucket of results, newest bucket first.
#[derive(Debug, Clone)]
pub struct DateGroup {
    pub label: String,
    pub entries: Vec<Entry>,
}

/// Evaluates the filter against the canonical set. Collection and pinned
/// filters narrow first; free text then matches as a plain OR over the
/// display path, the raw text, and the OCR-normalized text — no scoring.
/// Results come back newest first.
pub fn query(entries: &[Entry], filter: &QueryFilter) -> Vec<Entry> {
    let free_text = filter.free_text.trim();
    let needle = free_text.to_lowercase();
    let normalized_needle = text_normalizer::normalize(free_text).to_lowercase();

    let mut results: Vec<Entry> = entries
        .iter()
        .filter(|e| {
            if filter.pinned_only && !e.pinned {
                return false;
            }
            if let Some(collection) = &filter.collection {
                if !e.tags.iter().any(|t| t == collection)
                    && !e.custom_tags.iter().any(|t| t == collection)
                {
                    return false;
                }
            }
            true
        })
        .filter(|e| {
            if needle.is_empty() {
                return true;
            }
            e.path.to_lowercase().contains(&needle)
                || e.text.to_lowercase().contains(&needle)
                || text_normalizer::normalize(&e.text)
                    .to_lowercase()
                    .contains(&normalized_needle)
        })
        .cloned()
        .collect();

    results.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.path.cmp(&b.path))
    });
    results
}

/// Buckets an already-sorted result list for display. Buckets are emitted in
/// recency order; entries inside keep their newest-first order.
pub fn group_by_date(results: &[Entry], now: DateTime<Utc>) -> Vec<DateGroup> {
    let mut groups: Vec<DateGroup> = Vec::new();
    for entry in results {
        let label = bucket_label(entry.created_at, now);
        match groups.last_mut() {
            Some(group) if group.label == label => group.entries.push(entry.clone()),
            _ => groups.push(DateGroup {
                label,
                entries: vec![entry.clone()],
            }),
        }
    }
    groups
}

fn bucket_label(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let today = now.date_naive();
    let date = created_at.date_naive();

    if date >= today {
        return "Today".to_string();
    }
    if Some(date) == today.checked_sub_days(Days::new(1)) {
        return "Yesterday".to_string();
    }
    if let Some(week_ago) = today.checked_sub_days(Days::new(7)) {
        if date > week_ago {
            return "This Week".to_string();
        }
    }
    if date.year() == today.year() && date.month() == today.month() {
        return "This Month".to_string();
    }
    created_at.format("%B %Y").to_string()
}

/// Index of `current` in the active result list; absent paths resolve to 0.
pub fn current_index(results: &[Entry], current: Option<&str>) -> usize {
    current
        .and_then(|path| {
            let key = crate::paths::identity_key(path);
            results.iter().position(|e| e.identity_key() == key)
        })
        .unwrap_or(0)
}

/// Path after `current` in the active result list, wrapping at the end.
pub fn next_path<'a>(results: &'a [Entry], current: Option<&str>) -> Option<&'a str> {
    if results.is_empty() {
        return None;
    }
    let index = (current_index(results, current) + 1) % results.len();
    Some(results[index].path.as_str())
}

/// Path before `current` in the active result list, wrapping at the start.
pub fn previous_path<'a>(results: &'a [Entry], current: Option<&str>) -> Option<&'a str> {
    if results.is_empty() {
        return None;
    }
    let index = current_index(results, current)
        .checked_sub(1)
        .unwrap_or(results.len() - 1);
    Some(results[index].path.as_str())
}
