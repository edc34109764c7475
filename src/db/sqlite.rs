//! SQLite backend implementation.
//!
//! Wraps a rusqlite connection behind the [`SqlBackend`] surface. Rows
//! are returned as JSON maps so callers see the same shape regardless of
//! which backend the facade selected. Transactions here are real: if any
//! statement fails the whole group rolls back.

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;

use super::backend::{Atomicity, BoundStatement, Row, SqlBackend};
use crate::error::StoreError;

#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) the database file. Failure here is the
    /// `EngineUnavailable` condition that makes the facade fall back to
    /// the document store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|source| StoreError::EngineUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        // Foreign key enforcement is off by default in SQLite.
        let _ = conn.execute_batch("PRAGMA foreign_keys = ON;");
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::EngineUnavailable {
            path: std::path::PathBuf::from(":memory:"),
            source,
        })?;
        Ok(Self { conn })
    }
}

fn stmt_error(sql: &str, source: rusqlite::Error) -> StoreError {
    StoreError::Statement {
        sql: sql.to_string(),
        source,
    }
}

/// Convert a JSON parameter into something rusqlite can bind. Arrays and
/// objects are bound as their JSON text.
fn bind_value(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Sql::Integer(i)
            } else {
                Sql::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => Sql::Text(s.clone()),
        other => Sql::Text(other.to_string()),
    }
}

fn row_to_json(row: &rusqlite::Row<'_>, columns: &[String]) -> Result<Row, rusqlite::Error> {
    let mut out = Row::new();
    for (i, name) in columns.iter().enumerate() {
        let value = match row.get_ref(i)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(n) => Value::from(n),
            ValueRef::Real(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
            // No blob columns in this schema.
            ValueRef::Blob(_) => Value::Null,
        };
        out.insert(name.clone(), value);
    }
    Ok(out)
}

impl SqlBackend for SqliteBackend {
    fn run(&self, sql: &str, params: &[Value]) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare(sql).map_err(|e| stmt_error(sql, e))?;
        stmt.execute(rusqlite::params_from_iter(params.iter().map(bind_value)))
            .map_err(|e| stmt_error(sql, e))?;
        Ok(())
    }

    fn all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let mut stmt = self.conn.prepare(sql).map_err(|e| stmt_error(sql, e))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter().map(bind_value)),
                |row| row_to_json(row, &columns),
            )
            .map_err(|e| stmt_error(sql, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| stmt_error(sql, e))?;
        Ok(rows)
    }

    fn transaction(&self, statements: &[BoundStatement]) -> Result<(), StoreError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| stmt_error("BEGIN", e))?;
        for (sql, params) in statements {
            // Dropping the transaction on the error path rolls everything back.
            tx.execute(sql, rusqlite::params_from_iter(params.iter().map(bind_value)))
                .map_err(|e| stmt_error(sql, e))?;
        }
        tx.commit().map_err(|e| stmt_error("COMMIT", e))?;
        Ok(())
    }

    fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let sql = "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?";
        let count: i64 = self
            .conn
            .query_row(sql, [name], |row| row.get(0))
            .map_err(|e| stmt_error(sql, e))?;
        Ok(count > 0)
    }

    fn atomicity(&self) -> Atomicity {
        Atomicity::Atomic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend_with_table() -> SqliteBackend {
        let db = SqliteBackend::open_in_memory().unwrap();
        db.run(
            "CREATE TABLE IF NOT EXISTS items (id TEXT PRIMARY KEY, rank INTEGER)",
            &[],
        )
        .unwrap();
        db
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("photolog.db");
        SqliteBackend::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn open_on_directory_path_is_engine_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqliteBackend::open(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::EngineUnavailable { .. }));
    }

    #[test]
    fn run_and_query_round_trip() {
        let db = backend_with_table();
        db.run(
            "INSERT INTO items (id, rank) VALUES (?, ?)",
            &[json!("a"), json!(1)],
        )
        .unwrap();
        db.run(
            "INSERT INTO items (id, rank) VALUES (?, ?)",
            &[json!("b"), json!(2)],
        )
        .unwrap();

        let rows = db
            .all("SELECT id, rank FROM items ORDER BY rank", &[])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], json!("a"));
        assert_eq!(rows[1]["rank"], json!(2));
    }

    #[test]
    fn get_returns_none_for_empty_result() {
        let db = backend_with_table();
        let row = db
            .get("SELECT id FROM items WHERE id = ?", &[json!("missing")])
            .unwrap();
        assert!(row.is_none());
    }

    #[test]
    fn bad_statement_is_statement_error() {
        let db = backend_with_table();
        let err = db.run("INSERT INTO no_such_table VALUES (1)", &[]).unwrap_err();
        assert!(matches!(err, StoreError::Statement { .. }));
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let db = backend_with_table();
        let statements = vec![
            (
                "INSERT INTO items (id, rank) VALUES (?, ?)".to_string(),
                vec![json!("a"), json!(1)],
            ),
            ("INSERT INTO no_such_table VALUES (1)".to_string(), vec![]),
        ];
        let err = db.transaction(&statements).unwrap_err();
        assert!(matches!(err, StoreError::Statement { .. }));

        let rows = db.all("SELECT id FROM items", &[]).unwrap();
        assert!(rows.is_empty(), "first insert should have rolled back");
    }

    #[test]
    fn table_exists_checks_catalog() {
        let db = backend_with_table();
        assert!(db.table_exists("items").unwrap());
        assert!(!db.table_exists("photos").unwrap());
    }

    #[test]
    fn null_params_bind_as_null() {
        let db = backend_with_table();
        db.run(
            "INSERT INTO items (id, rank) VALUES (?, ?)",
            &[json!("a"), Value::Null],
        )
        .unwrap();
        let row = db.get("SELECT rank FROM items WHERE id = 'a'", &[]).unwrap().unwrap();
        assert_eq!(row["rank"], Value::Null);
    }
}
