use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical record for one screenshot artifact. The store guarantees at
/// most one entry per normalized path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub path: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub urls: Vec<String>,
    pub emails: Vec<String>,
    pub pinned: bool,
    pub custom_tags: Vec<String>,
}

impl Entry {
    pub fn new(path: impl Into<String>, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            created_at,
            tags: Vec::new(),
            urls: Vec::new(),
            emails: Vec::new(),
            pinned: false,
            custom_tags: Vec::new(),
        }
    }

    pub fn identity_key(&self) -> String {
        crate::paths::identity_key(&self.path)
    }
}

/// A persisted (query, filter) pair the user can reapply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSearch {
    pub id: String,
    pub name: String,
    pub query: String,
    pub collection_filter: Option<String>,
}

impl SavedSearch {
    pub fn new(name: impl Into<String>, query: impl Into<String>, collection_filter: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            query: query.into(),
            collection_filter,
        }
    }
}

/// On-disk facts about one file, as reported by the metadata collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMeta {
    pub path: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Per-path outcome of a batch deletion. Successes are never rolled back
/// when other paths fail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

impl DeleteOutcome {
    pub fn merge(&mut self, other: DeleteOutcome) {
        self.deleted.extend(other.deleted);
        self.failed.extend(other.failed);
    }
}
