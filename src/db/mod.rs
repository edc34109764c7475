//! Persistence facade and its two backends.
//!
//! [`Store::open`] attempts the SQLite backend (open + migrate) and on
//! any failure falls back to the document store. Selection is one-shot:
//! once a backend is chosen it serves every call for the lifetime of the
//! value, with no automatic promotion back to SQLite after a fallback.

mod backend;
pub mod document;
pub mod migrate;
pub mod photos;
mod schema;
pub mod sqlite;

use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

pub use backend::{Atomicity, BoundStatement, Row, SqlBackend};
pub use schema::{LATEST_VERSION, MIGRATIONS, TABLES};

use crate::config::DatabaseConfig;
use crate::error::StoreError;

/// Macro to dispatch a method call to the active backend variant.
macro_rules! dispatch {
    // No arguments beyond self
    ($self:expr, $method:ident()) => {
        match &$self.inner {
            BackendInner::Sqlite(db) => db.$method(),
            BackendInner::Document(db) => db.$method(),
        }
    };
    // With arguments
    ($self:expr, $method:ident($($arg:expr),+ $(,)?)) => {
        match &$self.inner {
            BackendInner::Sqlite(db) => db.$method($($arg),+),
            BackendInner::Document(db) => db.$method($($arg),+),
        }
    };
}

enum BackendInner {
    Sqlite(sqlite::SqliteBackend),
    Document(document::DocumentBackend),
}

/// Which backend the facade selected at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveBackend {
    Sqlite,
    Document,
}

impl std::fmt::Display for ActiveBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActiveBackend::Sqlite => write!(f, "sqlite"),
            ActiveBackend::Document => write!(f, "document"),
        }
    }
}

pub struct Store {
    inner: BackendInner,
}

impl Store {
    /// Open a store: SQLite preferred, document store as fallback.
    /// The selected backend is migrated to the latest schema version
    /// before the store is returned.
    pub fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        match Self::open_sqlite(&config.sqlite_path) {
            Ok(db) => {
                info!(path = %config.sqlite_path.display(), "opened sqlite backend");
                Ok(Self {
                    inner: BackendInner::Sqlite(db),
                })
            }
            Err(err) => {
                warn!(error = %err, "sqlite unavailable, falling back to document store");
                let db = document::DocumentBackend::load(&config.document_path)?;
                migrate::migrate_to_latest(&db)?;
                info!(path = %config.document_path.display(), "opened document backend");
                Ok(Self {
                    inner: BackendInner::Document(db),
                })
            }
        }
    }

    fn open_sqlite(path: &Path) -> Result<sqlite::SqliteBackend, StoreError> {
        let db = sqlite::SqliteBackend::open(path)?;
        migrate::migrate_to_latest(&db)?;
        Ok(db)
    }

    /// Re-run the migration pass on the already-selected backend.
    /// Idempotent: at the latest version this does nothing.
    pub fn initialize(&self) -> Result<(), StoreError> {
        match &self.inner {
            BackendInner::Sqlite(db) => migrate::migrate_to_latest(db),
            BackendInner::Document(db) => migrate::migrate_to_latest(db),
        }
    }

    pub fn active_backend(&self) -> ActiveBackend {
        match &self.inner {
            BackendInner::Sqlite(_) => ActiveBackend::Sqlite,
            BackendInner::Document(_) => ActiveBackend::Document,
        }
    }

    /// Current applied schema version.
    pub fn schema_version(&self) -> u32 {
        match &self.inner {
            BackendInner::Sqlite(db) => migrate::current_version(db),
            BackendInner::Document(db) => migrate::current_version(db),
        }
    }

    pub fn run(&self, sql: &str, params: &[Value]) -> Result<(), StoreError> {
        dispatch!(self, run(sql, params))
    }

    pub fn all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        dispatch!(self, all(sql, params))
    }

    pub fn get(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError> {
        dispatch!(self, get(sql, params))
    }

    pub fn transaction(&self, statements: &[BoundStatement]) -> Result<(), StoreError> {
        dispatch!(self, transaction(statements))
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        dispatch!(self, table_exists(name))
    }

    pub fn atomicity(&self) -> Atomicity {
        dispatch!(self, atomicity())
    }
}

impl SqlBackend for Store {
    fn run(&self, sql: &str, params: &[Value]) -> Result<(), StoreError> {
        Store::run(self, sql, params)
    }

    fn all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        Store::all(self, sql, params)
    }

    fn transaction(&self, statements: &[BoundStatement]) -> Result<(), StoreError> {
        Store::transaction(self, statements)
    }

    fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        Store::table_exists(self, name)
    }

    fn atomicity(&self) -> Atomicity {
        Store::atomicity(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> DatabaseConfig {
        DatabaseConfig {
            sqlite_path: dir.join("photolog.db"),
            document_path: dir.join("db.json"),
        }
    }

    #[test]
    fn selects_sqlite_when_available() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&config_in(dir.path())).unwrap();

        assert_eq!(store.active_backend(), ActiveBackend::Sqlite);
        assert_eq!(store.atomicity(), Atomicity::Atomic);
        assert_eq!(store.schema_version(), LATEST_VERSION);
        assert!(store.table_exists("photos").unwrap());
    }

    #[test]
    fn falls_back_to_document_store_when_sqlite_open_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        // A directory at the database path makes the sqlite open fail.
        config.sqlite_path = dir.path().to_path_buf();

        let store = Store::open(&config).unwrap();
        assert_eq!(store.active_backend(), ActiveBackend::Document);
        assert_eq!(store.atomicity(), Atomicity::BestEffortSequential);
        assert_eq!(store.schema_version(), LATEST_VERSION);
        assert!(store.table_exists("photos").unwrap());
    }

    #[test]
    fn reopen_is_a_no_op_for_an_already_migrated_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let store = Store::open(&config).unwrap();
        let before = store.schema_version();
        drop(store);

        let store = Store::open(&config).unwrap();
        assert_eq!(store.schema_version(), before);
        store.initialize().unwrap();
        assert_eq!(store.schema_version(), before);
    }
}
