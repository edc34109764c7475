//! Local-first photo diary persistence layer.
//!
//! Storage is split into two halves: a database layer ([`db`]) that keeps
//! photo records in SQLite with a JSON document-store fallback, and a
//! media layer ([`media`]) that manages the image files those records
//! point at.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod media;

pub use config::{Config, DatabaseConfig, MediaConfig};
pub use db::{ActiveBackend, SqlBackend, Store};
pub use error::StoreError;
pub use media::{DeleteOutcome, MediaStore, SaveOptions, SavedImage};
