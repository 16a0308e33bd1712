//! Chronicle core: a searchable, de-duplicated index of screenshot captures.
//!
//! Text, tags, and pin state arrive asynchronously from external producers
//! (watcher, OCR worker, classifier, similarity service); the engine folds
//! that unordered, sometimes-duplicate event stream into a single canonical
//! record per artifact and answers filtered, date-grouped queries over it.

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod models;
pub mod paths;
pub mod services;
pub mod state;

pub use config::EngineConfig;
pub use engine::Chronicle;
pub use error::{AppError, Result};
pub use models::entry::{DeleteOutcome, Entry, FileMeta, SavedSearch};
pub use models::event::{BatchProgress, CaptureEvent, EngineEvent, EventStatus};
pub use services::duplicate_service::{
    FileRemover, FsCollaborator, GroupSummary, MetadataSource, SimilarityGroup, SimilaritySource,
};
pub use services::ingest_service::IngestHandle;
pub use services::query_service::{DateGroup, QueryFilter};
pub use state::StatusSnapshot;
