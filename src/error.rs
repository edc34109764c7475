//! Error taxonomy for the persistence layer.
//!
//! Failures that threaten data integrity (migrations, the primary image
//! file write) surface as hard errors; derived artifacts (thumbnails,
//! dimension probes) degrade gracefully and are reported by the media
//! layer as `None` fields instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The embedded SQLite engine could not be opened. Recoverable: the
    /// facade falls back to the document store.
    #[error("sqlite engine unavailable at {}: {source}", path.display())]
    EngineUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Engine-level SQL failure (syntax error, constraint violation).
    #[error("statement failed: {sql}: {source}")]
    Statement {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A migration batch failed. Versions below `version` remain applied;
    /// `version` and everything after it is retried on next startup.
    #[error("migration v{version} failed: {source}")]
    MigrationFailed {
        version: u32,
        #[source]
        source: Box<StoreError>,
    },

    /// Both copy and move of an image into managed storage failed.
    #[error(
        "failed to store image {} at {}: copy failed: {copy_error}; move failed: {move_error}",
        from.display(),
        to.display()
    )]
    StorageWriteFailed {
        from: PathBuf,
        to: PathBuf,
        copy_error: std::io::Error,
        move_error: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
