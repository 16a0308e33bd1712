use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::entry::{DeleteOutcome, FileMeta};

/// Deletes each path independently; one failure never blocks or rolls back
/// the others. A path that is already gone counts as deleted — its index
/// entry is stale either way.
pub fn delete_files(paths: &[String]) -> DeleteOutcome {
    let mut outcome = DeleteOutcome::default();
    for path_str in paths {
        let path = Path::new(path_str);
        if !path.exists() {
            outcome.deleted.push(path_str.clone());
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => outcome.deleted.push(path_str.clone()),
            Err(error) => {
                warn!(path = %path_str, %error, "delete failed");
                outcome.failed.push(path_str.clone());
            }
        }
    }
    outcome
}

/// Best-effort metadata for each path; unreadable paths are skipped.
/// Creation time falls back to mtime on filesystems that don't record it.
pub fn file_metadata(paths: &[String]) -> Vec<FileMeta> {
    paths
        .iter()
        .filter_map(|path| metadata_for(path))
        .collect()
}

fn metadata_for(path: &str) -> Option<FileMeta> {
    let metadata = fs::metadata(path).ok()?;
    let created = metadata.created().or_else(|_| metadata.modified()).ok()?;
    Some(FileMeta {
        path: path.to_string(),
        size_bytes: metadata.len(),
        created_at: DateTime::<Utc>::from(created),
    })
}
