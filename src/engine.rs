use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::Utc;
use rusqlite::Connection;

use crate::config::EngineConfig;
use crate::data::{migrations, repository};
use crate::error::Result;
use crate::models::entry::{DeleteOutcome, Entry, SavedSearch};
use crate::models::event::BatchProgress;
use crate::services::duplicate_service::{
    self, FileRemover, GroupSummary, MetadataSource, SimilarityGroup, SimilaritySource,
};
use crate::services::ingest_service::{self, IngestHandle};
use crate::services::query_service::{self, DateGroup, QueryFilter};
use crate::services::selection_service::{BatchTracker, SelectionState};
use crate::state::{EntryStore, StatusSnapshot};

/// The assembled engine: canonical store, persistence, selection, and batch
/// state behind one narrow API. Event producers feed the handle returned by
/// [`Chronicle::start_ingest`]; everything here is the read path plus
/// user-driven mutation, serialized through the same store lock the ingest
/// loop uses.
pub struct Chronicle {
    store: Arc<Mutex<EntryStore>>,
    db: Arc<Mutex<Connection>>,
    batch: Arc<Mutex<BatchTracker>>,
    selection: Mutex<SelectionState>,
}

impl Chronicle {
    /// Runs migrations and bulk-loads the canonical set from persistence.
    pub fn open(config: EngineConfig, conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        let loaded = repository::load_all_entries(&conn)?;

        let mut store = EntryStore::new(config);
        store.replace_all(loaded);

        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            db: Arc::new(Mutex::new(conn)),
            batch: Arc::new(Mutex::new(BatchTracker::default())),
            selection: Mutex::new(SelectionState::new()),
        })
    }

    /// Spawns the single-consumer ingestion loop; must be called from within
    /// a tokio runtime.
    pub fn start_ingest(&self) -> IngestHandle {
        ingest_service::start(self.store.clone(), self.db.clone(), self.batch.clone())
    }

    fn store(&self) -> MutexGuard<'_, EntryStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn selection(&self) -> MutexGuard<'_, SelectionState> {
        self.selection.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ─── Read path ───

    pub fn entries(&self) -> Vec<Entry> {
        self.store().entries().to_vec()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.store().status(Instant::now())
    }

    pub fn batch_progress(&self) -> BatchProgress {
        self.batch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .snapshot()
    }

    /// Evaluates the filter. Changing the filter clears the multi-select.
    pub fn search(&self, filter: &QueryFilter) -> Vec<Entry> {
        self.selection().set_filter(filter.clone());
        query_service::query(self.store().entries(), filter)
    }

    pub fn search_grouped(&self, filter: &QueryFilter) -> Vec<DateGroup> {
        let results = self.search(filter);
        query_service::group_by_date(&results, Utc::now())
    }

    pub fn next_path(&self, filter: &QueryFilter, current: Option<&str>) -> Option<String> {
        let results = self.search(filter);
        query_service::next_path(&results, current).map(str::to_string)
    }

    pub fn previous_path(&self, filter: &QueryFilter, current: Option<&str>) -> Option<String> {
        let results = self.search(filter);
        query_service::previous_path(&results, current).map(str::to_string)
    }

    // ─── Selection ───

    pub fn toggle_selected(&self, path: &str) {
        self.selection().toggle(path);
    }

    pub fn clear_selection(&self) {
        self.selection().clear();
    }

    /// Selection resolved against the live set; stale paths drop out here.
    pub fn selected_paths(&self) -> Vec<String> {
        let store = self.store();
        let mut selection = self.selection.lock().unwrap_or_else(|p| p.into_inner());
        selection.reconcile(store.entries());
        selection.selected_paths(store.entries())
    }

    // ─── User-driven mutation ───

    /// Deletes files through the removing collaborator, then drops the
    /// successfully deleted ones from the store and persistence. Failed
    /// paths stay indexed; nothing is rolled back.
    pub fn delete_entries(&self, remover: &dyn FileRemover, paths: &[String]) -> DeleteOutcome {
        let outcome = remover.delete_files(paths);
        self.apply_removals(&outcome.deleted);
        outcome
    }

    pub fn toggle_pin(&self, path: &str) -> Result<Option<Entry>> {
        let updated = self.store().toggle_pin(path);
        if let Some(entry) = &updated {
            repository::set_pinned(&self.conn(), &entry.path, entry.pinned)?;
        }
        Ok(updated)
    }

    pub fn add_custom_tag(&self, path: &str, tag: &str) -> Result<Option<Entry>> {
        let updated = self.store().add_custom_tag(path, tag);
        if let Some(entry) = &updated {
            repository::set_custom_tags(&self.conn(), &entry.path, &entry.custom_tags)?;
        }
        Ok(updated)
    }

    pub fn remove_custom_tag(&self, path: &str, tag: &str) -> Result<Option<Entry>> {
        let updated = self.store().remove_custom_tag(path, tag);
        if let Some(entry) = &updated {
            repository::set_custom_tags(&self.conn(), &entry.path, &entry.custom_tags)?;
        }
        Ok(updated)
    }

    pub fn all_custom_tags(&self) -> Result<Vec<String>> {
        repository::all_custom_tags(&self.conn())
    }

    // ─── Saved searches ───

    pub fn save_search(
        &self,
        name: &str,
        query: &str,
        collection_filter: Option<String>,
    ) -> Result<SavedSearch> {
        let search = SavedSearch::new(name, query, collection_filter);
        repository::insert_saved_search(&self.conn(), &search)?;
        Ok(search)
    }

    pub fn saved_searches(&self) -> Result<Vec<SavedSearch>> {
        repository::load_saved_searches(&self.conn())
    }

    pub fn delete_saved_search(&self, id: &str) -> Result<()> {
        repository::delete_saved_search(&self.conn(), id)?;
        Ok(())
    }

    // ─── Duplicate groups ───

    /// Fetches similarity groups from the external service and summarizes
    /// the available actions per group.
    pub fn duplicate_groups(
        &self,
        similarity: &dyn SimilaritySource,
        metadata: &dyn MetadataSource,
        threshold: u32,
    ) -> Result<Vec<GroupSummary>> {
        let groups = similarity.find_similar(threshold)?;
        Ok(duplicate_service::summarize_groups(metadata, &groups))
    }

    /// Keeps the newest member of the group and deletes the rest; the store
    /// only changes for files actually removed, so a metadata failure is a
    /// no-op on the index.
    pub fn resolve_keep_newest(
        &self,
        metadata: &dyn MetadataSource,
        remover: &dyn FileRemover,
        group: &SimilarityGroup,
    ) -> Result<DeleteOutcome> {
        let outcome = duplicate_service::resolve_keep_newest(metadata, remover, group)?;
        self.apply_removals(&outcome.deleted);
        Ok(outcome)
    }

    pub fn resolve_delete_all(
        &self,
        remover: &dyn FileRemover,
        group: &SimilarityGroup,
    ) -> DeleteOutcome {
        let outcome = duplicate_service::resolve_delete_all(remover, group);
        self.apply_removals(&outcome.deleted);
        outcome
    }

    fn apply_removals(&self, deleted: &[String]) {
        if deleted.is_empty() {
            return;
        }
        let removed = {
            let mut store = self.store();
            store.remove_paths(deleted)
        };
        {
            let conn = self.conn();
            for path in deleted {
                let _ = repository::delete_by_path(&conn, path);
            }
            for path in &removed {
                let _ = repository::delete_by_path(&conn, path);
            }
        }
        let store = self.store();
        self.selection().reconcile(store.entries());
    }
}
