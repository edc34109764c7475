//! Migration runner.
//!
//! Reads the current schema version from the active backend and applies
//! any un-applied batches from the registry in strictly ascending order,
//! recording each version after its batch succeeds. The first failing
//! batch halts the run: earlier versions stay applied, the failed
//! version and everything after it is retried on the next startup.
//! Batches must be written to tolerate partial re-runs because the
//! document backend offers no real rollback.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::backend::{BoundStatement, SqlBackend};
use super::schema;
use crate::error::StoreError;

/// Current applied migration version, 0 if the schema_version table is
/// absent or empty. A read failure is treated as "not yet migrated"
/// rather than an error, matching a fresh store.
pub fn current_version(backend: &impl SqlBackend) -> u32 {
    let row = match backend.get("SELECT MAX(version) AS version FROM schema_version", &[]) {
        Ok(row) => row,
        Err(_) => return 0,
    };
    row.and_then(|r| r.get("version").and_then(Value::as_u64))
        .unwrap_or(0) as u32
}

/// Bring the backend up to the latest registered schema version.
/// Idempotent: at the latest version this is a no-op.
pub fn migrate_to_latest(backend: &impl SqlBackend) -> Result<(), StoreError> {
    apply(backend, schema::MIGRATIONS)
}

fn migration_failed(version: u32) -> impl FnOnce(StoreError) -> StoreError {
    move |source| StoreError::MigrationFailed {
        version,
        source: Box::new(source),
    }
}

pub(crate) fn apply(backend: &impl SqlBackend, batches: &[&[&str]]) -> Result<(), StoreError> {
    let current = current_version(backend);
    let latest = batches.len() as u32;
    if current >= latest {
        debug!(version = current, "schema already at latest version");
        return Ok(());
    }

    for version in (current + 1)..=latest {
        let statements: Vec<BoundStatement> = batches[(version - 1) as usize]
            .iter()
            .map(|sql| (sql.to_string(), Vec::new()))
            .collect();

        backend
            .transaction(&statements)
            .map_err(migration_failed(version))?;
        backend
            .run(
                "INSERT INTO schema_version (version, applied_at) VALUES (?, ?)",
                &[json!(version), json!(Utc::now().to_rfc3339())],
            )
            .map_err(migration_failed(version))?;
        info!(version, "applied schema migration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::document::DocumentBackend;
    use crate::db::sqlite::SqliteBackend;

    #[test]
    fn fresh_sqlite_store_reaches_latest_version() {
        let db = SqliteBackend::open_in_memory().unwrap();
        migrate_to_latest(&db).unwrap();

        assert_eq!(current_version(&db), schema::LATEST_VERSION);
        for table in schema::TABLES {
            assert!(db.table_exists(table).unwrap(), "missing table {}", table);
        }
    }

    #[test]
    fn fresh_document_store_reaches_latest_version() {
        let dir = tempfile::tempdir().unwrap();
        let db = DocumentBackend::load(&dir.path().join("db.json")).unwrap();
        migrate_to_latest(&db).unwrap();

        assert_eq!(current_version(&db), schema::LATEST_VERSION);
        for table in schema::TABLES {
            assert!(db.table_exists(table).unwrap(), "missing table {}", table);
        }
    }

    #[test]
    fn rerun_is_a_no_op() {
        let db = SqliteBackend::open_in_memory().unwrap();
        migrate_to_latest(&db).unwrap();
        let before = current_version(&db);

        migrate_to_latest(&db).unwrap();
        assert_eq!(current_version(&db), before);

        // One schema_version row per applied migration, none re-applied.
        let rows = db.all("SELECT version FROM schema_version", &[]).unwrap();
        assert_eq!(rows.len() as u32, schema::LATEST_VERSION);
    }

    #[test]
    fn failing_batch_halts_and_preserves_applied_versions() {
        let db = SqliteBackend::open_in_memory().unwrap();
        let good: &[&str] = &[
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL)",
        ];
        let bad: &[&str] = &["CREATE BROKEN SYNTAX"];

        let err = apply(&db, &[good, bad]).unwrap_err();
        match err {
            StoreError::MigrationFailed { version, .. } => assert_eq!(version, 2),
            other => panic!("expected MigrationFailed, got {other:?}"),
        }
        assert_eq!(current_version(&db), 1);

        // A fixed registry retries from the failed version.
        let fixed: &[&str] = &["CREATE TABLE IF NOT EXISTS extras (id TEXT PRIMARY KEY)"];
        apply(&db, &[good, fixed]).unwrap();
        assert_eq!(current_version(&db), 2);
        assert!(db.table_exists("extras").unwrap());
    }

    #[test]
    fn version_read_failure_means_zero() {
        let db = SqliteBackend::open_in_memory().unwrap();
        // No schema_version table yet.
        assert_eq!(current_version(&db), 0);
    }
}
