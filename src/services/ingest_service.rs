use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use rusqlite::Connection;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::data::repository;
use crate::error::AppError;
use crate::models::event::EngineEvent;
use crate::services::reconcile_service::CaptureOutcome;
use crate::services::selection_service::{BatchTracker, SweepScheduler};
use crate::state::EntryStore;

/// Running ingestion loop. Dropping the handle (or calling `shutdown`)
/// closes the channel; the loop drains what was already queued, then exits.
pub struct IngestHandle {
    tx: mpsc::Sender<EngineEvent>,
    task: JoinHandle<()>,
}

impl IngestHandle {
    /// Cloneable sender for producers (watcher bridge, OCR worker, tests).
    pub fn sender(&self) -> mpsc::Sender<EngineEvent> {
        self.tx.clone()
    }

    pub async fn submit(&self, event: EngineEvent) -> Result<(), AppError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| AppError::General("ingest loop has shut down".to_string()))
    }

    /// Closes the channel and waits for queued events to finish applying.
    pub async fn shutdown(self) {
        drop(self.tx);
        let _ = self.task.await;
    }
}

/// Spawns the single-consumer reconciliation loop. Events for the same path
/// apply in submission order; all store mutation happens under the one lock,
/// and the periodic dedupe sweep shares it, so a sweep never interleaves
/// with an in-flight event.
pub fn start(
    store: Arc<Mutex<EntryStore>>,
    db: Arc<Mutex<Connection>>,
    batch: Arc<Mutex<BatchTracker>>,
) -> IngestHandle {
    let (capacity, sweep_min, sweep_interval) = {
        let store = store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let config = store.config();
        (
            config.event_channel_capacity,
            config.sweep_min_entries,
            config.sweep_interval,
        )
    };

    let (tx, mut rx) = mpsc::channel(capacity);
    let task = tokio::spawn(async move {
        let mut scheduler = SweepScheduler::new(sweep_min, sweep_interval);
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + sweep_interval,
            sweep_interval,
        );
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(event) => handle_event(&store, &db, &batch, event),
                    None => break,
                },
                _ = ticker.tick() => run_sweep(&store, &mut scheduler),
            }
        }
    });

    IngestHandle { tx, task }
}

fn handle_event(
    store: &Arc<Mutex<EntryStore>>,
    db: &Arc<Mutex<Connection>>,
    batch: &Arc<Mutex<BatchTracker>>,
    event: EngineEvent,
) {
    match event {
        EngineEvent::Capture(capture) => {
            let outcome = {
                let mut store = store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                store.ingest(&capture, Utc::now(), Instant::now())
            };
            persist_outcome(db, &outcome);
        }
        EngineEvent::TagsUpdated { path, tags } => {
            let updated = {
                let mut store = store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                store.set_tags(&path, &tags)
            };
            if let Some(entry) = updated {
                persist_upsert(db, &entry);
            }
        }
        EngineEvent::Batch(progress) => {
            let mut batch = batch.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            batch.update(progress);
        }
    }
}

/// Write-through after the store has already applied the mutation. The store
/// is the source of truth; a persistence hiccup is logged and the next
/// upsert for the path heals the row.
fn persist_outcome(db: &Arc<Mutex<Connection>>, outcome: &CaptureOutcome) {
    match outcome {
        CaptureOutcome::Ignored => {}
        CaptureOutcome::Created(entry) => persist_upsert(db, entry),
        CaptureOutcome::Updated {
            previous_path,
            entry,
        } => {
            if previous_path != &entry.path {
                let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if let Err(error) = repository::delete_by_path(&conn, previous_path) {
                    warn!(path = %previous_path, %error, "failed to drop renamed row");
                }
            }
            persist_upsert(db, entry);
        }
    }
}

fn persist_upsert(db: &Arc<Mutex<Connection>>, entry: &crate::models::entry::Entry) {
    let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Err(error) = repository::upsert_entry(&conn, entry) {
        warn!(path = %entry.path, %error, "failed to persist entry");
    }
}

fn run_sweep(store: &Arc<Mutex<EntryStore>>, scheduler: &mut SweepScheduler) {
    let mut store = store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if !scheduler.should_sweep(store.len(), Instant::now()) {
        return;
    }
    if store.dedupe_sweep() {
        warn!(entries = store.len(), "safety-net sweep collapsed duplicates");
    } else {
        debug!(entries = store.len(), "safety-net sweep found nothing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::data::migrations;
    use crate::models::event::{BatchProgress, CaptureEvent};
    use chrono::DateTime;

    fn harness() -> (Arc<Mutex<EntryStore>>, Arc<Mutex<Connection>>, Arc<Mutex<BatchTracker>>) {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        (
            Arc::new(Mutex::new(EntryStore::new(EngineConfig::default()))),
            Arc::new(Mutex::new(conn)),
            Arc::new(Mutex::new(BatchTracker::default())),
        )
    }

    fn at(secs: i64) -> chrono::DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn events_apply_in_order_and_persist() {
        let (store, db, batch) = harness();
        let handle = start(store.clone(), db.clone(), batch);

        handle
            .submit(EngineEvent::Capture(
                CaptureEvent::idle("/a/1.png")
                    .with_text("hello")
                    .with_created_at(at(1000)),
            ))
            .await
            .unwrap();
        handle
            .submit(EngineEvent::Capture(
                CaptureEvent::idle("/a/1.png").with_text("hello world"),
            ))
            .await
            .unwrap();
        handle.shutdown().await;

        let store = store.lock().unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].text, "hello world");

        let conn = db.lock().unwrap();
        let persisted = repository::load_all_entries(&conn).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].text, "hello world");
    }

    #[tokio::test]
    async fn rename_drops_the_old_row() {
        let (store, db, batch) = harness();
        let handle = start(store.clone(), db.clone(), batch);

        handle
            .submit(EngineEvent::Capture(
                CaptureEvent::idle("/a/2.png")
                    .with_text("abc")
                    .with_created_at(at(2000)),
            ))
            .await
            .unwrap();
        handle
            .submit(EngineEvent::Capture(
                CaptureEvent::idle("/a/2-renamed.png")
                    .with_text("abc")
                    .with_created_at(at(2001)),
            ))
            .await
            .unwrap();
        handle.shutdown().await;

        let conn = db.lock().unwrap();
        let persisted = repository::load_all_entries(&conn).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].path, "/a/2-renamed.png");
        assert_eq!(persisted[0].created_at, at(2000));
    }

    #[tokio::test]
    async fn tags_updates_reach_store_and_db() {
        let (store, db, batch) = harness();
        let handle = start(store.clone(), db.clone(), batch);

        handle
            .submit(EngineEvent::Capture(
                CaptureEvent::idle("/a.png")
                    .with_text("cargo build output")
                    .with_created_at(at(10)),
            ))
            .await
            .unwrap();
        handle
            .submit(EngineEvent::TagsUpdated {
                path: "/a.png".to_string(),
                tags: vec!["Terminal".to_string()],
            })
            .await
            .unwrap();
        handle.shutdown().await;

        assert_eq!(store.lock().unwrap().entries()[0].tags, vec!["Terminal"]);
        let conn = db.lock().unwrap();
        assert_eq!(
            repository::load_all_entries(&conn).unwrap()[0].tags,
            vec!["Terminal"]
        );
    }

    #[tokio::test]
    async fn batch_progress_is_passed_through() {
        let (store, db, batch) = harness();
        let handle = start(store, db, batch.clone());

        handle
            .submit(EngineEvent::Batch(BatchProgress {
                total: 8,
                completed: 3,
                percent: 37.5,
                eta_seconds: 20,
                in_progress: true,
            }))
            .await
            .unwrap();
        handle.shutdown().await;

        let snapshot = batch.lock().unwrap().snapshot();
        assert_eq!(snapshot.total, 8);
        assert_eq!(snapshot.completed, 3);
        assert!(snapshot.in_progress);
    }

    #[tokio::test]
    async fn shutdown_drains_queued_events() {
        let (store, db, batch) = harness();
        let handle = start(store.clone(), db, batch);

        for n in 0..20 {
            handle
                .submit(EngineEvent::Capture(
                    CaptureEvent::idle(format!("/shots/{n}.png"))
                        .with_text("x")
                        .with_created_at(at(n * 100)),
                ))
                .await
                .unwrap();
        }
        handle.shutdown().await;

        assert_eq!(store.lock().unwrap().len(), 20);
    }
}
