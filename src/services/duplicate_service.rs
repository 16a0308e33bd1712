use tracing::warn;

use crate::error::{AppError, Result};
use crate::models::entry::{DeleteOutcome, FileMeta};
use crate::services::file_service;

/// Paths an external perceptual-similarity service believes depict the same
/// content. Recomputed on demand, never persisted here.
pub type SimilarityGroup = Vec<String>;

pub trait MetadataSource {
    fn file_metadata(&self, paths: &[String]) -> Result<Vec<FileMeta>>;
}

pub trait FileRemover {
    fn delete_files(&self, paths: &[String]) -> DeleteOutcome;
}

/// The external similarity engine; how the grouping is computed is its
/// business entirely.
pub trait SimilaritySource {
    fn find_similar(&self, threshold: u32) -> Result<Vec<SimilarityGroup>>;
}

/// Real-filesystem collaborator used outside of tests.
pub struct FsCollaborator;

impl MetadataSource for FsCollaborator {
    fn file_metadata(&self, paths: &[String]) -> Result<Vec<FileMeta>> {
        Ok(file_service::file_metadata(paths))
    }
}

impl FileRemover for FsCollaborator {
    fn delete_files(&self, paths: &[String]) -> DeleteOutcome {
        file_service::delete_files(paths)
    }
}

/// One similarity group with its available actions, ready for display.
#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub paths: Vec<String>,
    /// Bytes reclaimed by keeping only the newest member; `None` when
    /// metadata could not be retrieved for the group.
    pub savings_bytes: Option<u64>,
    pub keep_newest_available: bool,
}

/// Summarizes every group independently: a metadata failure degrades that
/// one group (unknown savings, keep-newest disabled) and leaves the rest
/// untouched.
pub fn summarize_groups(
    metadata: &dyn MetadataSource,
    groups: &[SimilarityGroup],
) -> Vec<GroupSummary> {
    groups
        .iter()
        .map(|group| match metadata.file_metadata(group) {
            Ok(metas) => GroupSummary {
                paths: group.clone(),
                savings_bytes: Some(estimate_savings(&metas)),
                keep_newest_available: !metas.is_empty(),
            },
            Err(error) => {
                warn!(%error, group_size = group.len(), "metadata unavailable for group");
                GroupSummary {
                    paths: group.clone(),
                    savings_bytes: None,
                    keep_newest_available: false,
                }
            }
        })
        .collect()
}

/// Bytes saved by deleting everything except the most recently created
/// member. Groups with fewer than two members with metadata save nothing.
pub fn estimate_savings(metas: &[FileMeta]) -> u64 {
    if metas.len() < 2 {
        return 0;
    }
    let total: u64 = metas.iter().map(|m| m.size_bytes).sum();
    let newest = metas
        .iter()
        .max_by_key(|m| m.created_at)
        .map(|m| m.size_bytes)
        .unwrap_or(0);
    total - newest
}

/// Deletes every member of the group except the most recently created one.
/// Destructive, no undo. Fails up front when metadata is unavailable; the
/// caller removes the returned `deleted` paths from the canonical store
/// afterwards, so a failure here leaves the store untouched.
pub fn resolve_keep_newest(
    metadata: &dyn MetadataSource,
    remover: &dyn FileRemover,
    group: &SimilarityGroup,
) -> Result<DeleteOutcome> {
    let metas = metadata.file_metadata(group)?;
    let newest = metas
        .iter()
        .max_by_key(|m| m.created_at)
        .ok_or_else(|| AppError::Metadata("no metadata available for group".to_string()))?;

    let newest_key = crate::paths::identity_key(&newest.path);
    let doomed: Vec<String> = group
        .iter()
        .filter(|p| crate::paths::identity_key(p) != newest_key)
        .cloned()
        .collect();
    Ok(remover.delete_files(&doomed))
}

/// Deletes every member of the group. Destructive, no undo.
pub fn resolve_delete_all(remover: &dyn FileRemover, group: &SimilarityGroup) -> DeleteOutcome {
    remover.delete_files(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::cell::RefCell;

    fn meta(path: &str, size: u64, secs: i64) -> FileMeta {
        FileMeta {
            path: path.to_string(),
            size_bytes: size,
            created_at: DateTime::<Utc>::from_timestamp(secs, 0).unwrap(),
        }
    }

    struct FakeMetadata {
        metas: Vec<FileMeta>,
        fail: bool,
    }

    impl MetadataSource for FakeMetadata {
        fn file_metadata(&self, paths: &[String]) -> Result<Vec<FileMeta>> {
            if self.fail {
                return Err(AppError::Metadata("offline".to_string()));
            }
            Ok(self
                .metas
                .iter()
                .filter(|m| paths.contains(&m.path))
                .cloned()
                .collect())
        }
    }

    struct FakeRemover {
        deleted: RefCell<Vec<String>>,
    }

    impl FakeRemover {
        fn new() -> Self {
            Self {
                deleted: RefCell::new(Vec::new()),
            }
        }
    }

    impl FileRemover for FakeRemover {
        fn delete_files(&self, paths: &[String]) -> DeleteOutcome {
            self.deleted.borrow_mut().extend(paths.iter().cloned());
            DeleteOutcome {
                deleted: paths.to_vec(),
                failed: Vec::new(),
            }
        }
    }

    #[test]
    fn savings_excludes_newest_member() {
        let metas = vec![
            meta("/a.png", 10, 100),
            meta("/b.png", 20, 300),
            meta("/c.png", 5, 200),
        ];
        assert_eq!(estimate_savings(&metas), 15);
    }

    #[test]
    fn savings_is_zero_below_two_members() {
        assert_eq!(estimate_savings(&[]), 0);
        assert_eq!(estimate_savings(&[meta("/a.png", 10, 100)]), 0);
    }

    #[test]
    fn keep_newest_deletes_all_but_newest() {
        let metadata = FakeMetadata {
            metas: vec![
                meta("/a.png", 10, 100),
                meta("/b.png", 20, 300),
                meta("/c.png", 5, 200),
            ],
            fail: false,
        };
        let remover = FakeRemover::new();
        let group = vec![
            "/a.png".to_string(),
            "/b.png".to_string(),
            "/c.png".to_string(),
        ];

        let outcome = resolve_keep_newest(&metadata, &remover, &group).unwrap();

        assert_eq!(outcome.deleted, vec!["/a.png", "/c.png"]);
        assert!(!remover.deleted.borrow().contains(&"/b.png".to_string()));
    }

    #[test]
    fn keep_newest_fails_closed_without_metadata() {
        let metadata = FakeMetadata {
            metas: Vec::new(),
            fail: true,
        };
        let remover = FakeRemover::new();
        let group = vec!["/a.png".to_string(), "/b.png".to_string()];

        assert!(resolve_keep_newest(&metadata, &remover, &group).is_err());
        assert!(remover.deleted.borrow().is_empty());
    }

    #[test]
    fn one_bad_group_does_not_poison_the_rest() {
        let metadata = FakeMetadata {
            metas: vec![meta("/a.png", 10, 100), meta("/b.png", 30, 200)],
            fail: false,
        };
        let groups = vec![
            vec!["/a.png".to_string(), "/b.png".to_string()],
            vec!["/x.png".to_string(), "/y.png".to_string()],
        ];

        let summaries = summarize_groups(&metadata, &groups);

        assert_eq!(summaries[0].savings_bytes, Some(10));
        assert!(summaries[0].keep_newest_available);
        // Unknown paths yield no metadata rows: zero savings, keep-newest off.
        assert_eq!(summaries[1].savings_bytes, Some(0));
        assert!(!summaries[1].keep_newest_available);
    }

    #[test]
    fn metadata_transport_failure_degrades_to_unknown() {
        let metadata = FakeMetadata {
            metas: Vec::new(),
            fail: true,
        };
        let groups = vec![vec!["/a.png".to_string(), "/b.png".to_string()]];
        let summaries = summarize_groups(&metadata, &groups);

        assert_eq!(summaries[0].savings_bytes, None);
        assert!(!summaries[0].keep_newest_available);
    }

    #[test]
    fn delete_all_removes_every_member() {
        let remover = FakeRemover::new();
        let group = vec!["/a.png".to_string(), "/b.png".to_string()];
        let outcome = resolve_delete_all(&remover, &group);
        assert_eq!(outcome.deleted.len(), 2);
    }
}
