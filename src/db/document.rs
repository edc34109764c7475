//! Document-store fallback backend.
//!
//! Emulates the minimal subset of relational semantics the rest of the
//! layer needs (table existence, insert, ordered select) on top of a
//! single JSON document persisted to one file. The SQL interpreter is a
//! deliberately small tagged-variant parser over the three statement
//! shapes this project issues; anything else is an explicit no-op, not
//! an error. This is a documented scope limit, not a parser meant to
//! grow general SQL support.

use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::backend::{Atomicity, BoundStatement, Row, SqlBackend};
use crate::error::StoreError;

/// Array-backed tables seeded into a fresh document. `schema_version` is
/// held separately as a scalar watermark.
const DEFAULT_TABLES: &[&str] = &["albums", "photos", "labels", "photo_labels", "notes", "events"];

pub struct DocumentBackend {
    path: PathBuf,
    /// The in-process write queue: every mutate-and-persist cycle runs
    /// under this lock, so writes to the backing file never interleave.
    /// It does not protect against concurrent processes.
    doc: Mutex<Map<String, Value>>,
}

fn default_document() -> Map<String, Value> {
    let mut doc = Map::new();
    doc.insert("schema_version".to_string(), json!(0));
    for table in DEFAULT_TABLES {
        doc.insert(table.to_string(), json!([]));
    }
    doc
}

fn ensure_default_keys(doc: &mut Map<String, Value>) {
    if !doc.get("schema_version").map_or(false, Value::is_u64) {
        doc.insert("schema_version".to_string(), json!(0));
    }
    for table in DEFAULT_TABLES {
        if !doc.get(*table).map_or(false, Value::is_array) {
            doc.insert(table.to_string(), json!([]));
        }
    }
}

/// The statement shapes the interpreter understands.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement {
    CreateTable(String),
    InsertInto(String),
    SelectFrom(String),
    Unrecognized,
}

/// Leading identifier characters of a token, lowercased. Strips trailing
/// punctuation such as `(` or `;`.
fn identifier(token: &str) -> String {
    token
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

fn parse_statement(sql: &str) -> Statement {
    let tokens: Vec<&str> = sql.split_whitespace().collect();
    let kw = |i: usize, word: &str| tokens.get(i).map_or(false, |t| t.eq_ignore_ascii_case(word));

    if kw(0, "CREATE") && kw(1, "TABLE") {
        let name_idx = if kw(2, "IF") && kw(3, "NOT") && kw(4, "EXISTS") { 5 } else { 2 };
        if let Some(name) = tokens.get(name_idx).map(|t| identifier(t)) {
            if !name.is_empty() {
                return Statement::CreateTable(name);
            }
        }
        return Statement::Unrecognized;
    }

    if kw(0, "INSERT") && kw(1, "INTO") {
        if let Some(name) = tokens.get(2).map(|t| identifier(t)) {
            if !name.is_empty() {
                return Statement::InsertInto(name);
            }
        }
        return Statement::Unrecognized;
    }

    if kw(0, "SELECT") {
        if let Some(from_idx) = tokens.iter().position(|t| t.eq_ignore_ascii_case("FROM")) {
            if let Some(name) = tokens.get(from_idx + 1).map(|t| identifier(t)) {
                if !name.is_empty() {
                    return Statement::SelectFrom(name);
                }
            }
        }
        return Statement::Unrecognized;
    }

    Statement::Unrecognized
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_uppercase().contains(&needle.to_uppercase())
}

fn text_field<'a>(row: &'a Row, key: &str) -> &'a str {
    row.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Build a photo row from the positional parameters `create_photo` uses:
/// `[id, file_uri, thumbnail_uri, taken_at, created_at, updated_at, width, height]`.
fn photo_from_params(params: &[Value]) -> Row {
    let param = |i: usize| params.get(i).cloned().unwrap_or(Value::Null);
    let id = match param(0) {
        Value::String(s) => s,
        other => other.to_string(),
    };
    let now = || json!(chrono::Utc::now().to_rfc3339());

    let mut row = Row::new();
    row.insert("id".to_string(), Value::String(id));
    row.insert("file_uri".to_string(), param(1));
    row.insert("thumbnail_uri".to_string(), param(2));
    row.insert("taken_at".to_string(), param(3));
    row.insert(
        "created_at".to_string(),
        if param(4).is_null() { now() } else { param(4) },
    );
    row.insert(
        "updated_at".to_string(),
        if param(5).is_null() { now() } else { param(5) },
    );
    row.insert("width".to_string(), param(6));
    row.insert("height".to_string(), param(7));
    row
}

impl DocumentBackend {
    /// Read the backing file if present; on a missing file or parse
    /// failure, reinitialize to an empty default document and persist it
    /// immediately. Self-healing: parse problems never fail upward.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let doc = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(mut map)) => {
                    ensure_default_keys(&mut map);
                    map
                }
                Ok(_) | Err(_) => {
                    warn!(path = %path.display(), "document store file unreadable, reinitializing");
                    default_document()
                }
            },
            Err(_) => default_document(),
        };

        let backend = Self {
            path: path.to_path_buf(),
            doc: Mutex::new(doc),
        };
        {
            let doc = backend.doc.lock().expect("document lock poisoned");
            backend.persist(&doc)?;
        }
        Ok(backend)
    }

    /// Serialize the full document to the backing file. Callers hold the
    /// document lock, which is what serializes writes.
    fn persist(&self, doc: &Map<String, Value>) -> Result<(), StoreError> {
        let payload = serde_json::to_string_pretty(doc)?;
        std::fs::write(&self.path, payload)?;
        Ok(())
    }
}

impl SqlBackend for DocumentBackend {
    fn run(&self, sql: &str, params: &[Value]) -> Result<(), StoreError> {
        let mut doc = self.doc.lock().expect("document lock poisoned");

        match parse_statement(sql) {
            Statement::CreateTable(name) => {
                if !doc.contains_key(&name) {
                    doc.insert(name, json!([]));
                    self.persist(&doc)?;
                }
            }
            Statement::InsertInto(name) => match name.as_str() {
                "schema_version" => {
                    // The watermark only ever moves forward.
                    let version = params.first().and_then(Value::as_u64).unwrap_or(0);
                    let current = doc.get("schema_version").and_then(Value::as_u64).unwrap_or(0);
                    if version > current {
                        doc.insert("schema_version".to_string(), json!(version));
                        self.persist(&doc)?;
                    }
                }
                "photos" => {
                    let photo = photo_from_params(params);
                    let id = photo.get("id").cloned();
                    match doc.entry("photos").or_insert_with(|| json!([])) {
                        Value::Array(rows) => {
                            // Insert is upsert-by-id: drop any existing row first.
                            rows.retain(|row| row.get("id") != id.as_ref());
                            rows.push(Value::Object(photo));
                        }
                        slot => *slot = json!([Value::Object(photo)]),
                    }
                    self.persist(&doc)?;
                }
                other => {
                    // Generic tables receive opaque positional-parameter records.
                    let record = json!({ "params": params });
                    match doc
                        .entry(other.to_string())
                        .or_insert_with(|| json!([]))
                    {
                        Value::Array(rows) => rows.push(record),
                        slot => *slot = json!([record]),
                    }
                    self.persist(&doc)?;
                }
            },
            Statement::SelectFrom(_) | Statement::Unrecognized => {
                debug!(sql, "document store ignoring unsupported statement");
            }
        }
        Ok(())
    }

    fn all(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let doc = self.doc.lock().expect("document lock poisoned");

        match parse_statement(sql) {
            Statement::SelectFrom(name) if name == "schema_version" => {
                // Mirror the `MAX(version)` shape SQLite produces: one row,
                // NULL before any migration has been recorded.
                let version = doc.get("schema_version").and_then(Value::as_u64).unwrap_or(0);
                let mut row = Row::new();
                row.insert(
                    "version".to_string(),
                    if version == 0 { Value::Null } else { json!(version) },
                );
                Ok(vec![row])
            }
            Statement::SelectFrom(name) => {
                let mut rows: Vec<Row> = doc
                    .get(&name)
                    .and_then(Value::as_array)
                    .map(|rows| rows.iter().filter_map(|v| v.as_object().cloned()).collect())
                    .unwrap_or_default();

                if name == "photos" {
                    if contains_ci(sql, "deleted_at IS NULL") {
                        rows.retain(|row| row.get("deleted_at").map_or(true, Value::is_null));
                    }
                    if contains_ci(sql, "ORDER BY created_at DESC") {
                        rows.sort_by(|a, b| {
                            text_field(b, "created_at").cmp(text_field(a, "created_at"))
                        });
                    }
                }
                Ok(rows)
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Sequential execution only. A failing statement leaves the effects
    /// of earlier statements in place; there is no rollback.
    fn transaction(&self, statements: &[BoundStatement]) -> Result<(), StoreError> {
        for (sql, params) in statements {
            self.run(sql, params)?;
        }
        Ok(())
    }

    fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let doc = self.doc.lock().expect("document lock poisoned");
        Ok(doc.contains_key(name))
    }

    fn atomicity(&self) -> Atomicity {
        Atomicity::BestEffortSequential
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_backend() -> (tempfile::TempDir, DocumentBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = DocumentBackend::load(&dir.path().join("db.json")).unwrap();
        (dir, backend)
    }

    fn insert_photo(backend: &DocumentBackend, id: &str, created_at: &str) {
        backend
            .run(
                "INSERT INTO photos (id, file_uri, thumbnail_uri, taken_at, created_at, updated_at, width, height)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                &[
                    json!(id),
                    json!(format!("file:///photos/{id}.jpg")),
                    Value::Null,
                    Value::Null,
                    json!(created_at),
                    json!(created_at),
                    json!(640),
                    json!(480),
                ],
            )
            .unwrap();
    }

    #[test]
    fn fresh_load_seeds_default_tables() {
        let (_dir, backend) = temp_backend();
        for table in DEFAULT_TABLES {
            assert!(backend.table_exists(table).unwrap(), "missing {}", table);
        }
        assert!(backend.table_exists("schema_version").unwrap());
    }

    #[test]
    fn corrupt_file_self_heals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{not json at all").unwrap();

        let backend = DocumentBackend::load(&path).unwrap();
        assert!(backend.table_exists("photos").unwrap());

        // The healed document was persisted immediately.
        let reread: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(reread.get("photos").unwrap().is_array());
    }

    #[test]
    fn insert_is_upsert_by_id() {
        let (_dir, backend) = temp_backend();
        insert_photo(&backend, "p1", "2026-01-01T10:00:00Z");
        insert_photo(&backend, "p1", "2026-01-02T10:00:00Z");

        let rows = backend.all("SELECT * FROM photos", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["created_at"], json!("2026-01-02T10:00:00Z"));
    }

    #[test]
    fn select_orders_by_created_at_desc() {
        let (_dir, backend) = temp_backend();
        insert_photo(&backend, "a", "2026-01-01T00:00:00Z");
        insert_photo(&backend, "c", "2026-01-03T00:00:00Z");
        insert_photo(&backend, "b", "2026-01-02T00:00:00Z");

        let rows = backend
            .all("SELECT id FROM photos ORDER BY created_at DESC", &[])
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| text_field(r, "id")).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn select_honors_soft_delete_filter() {
        let (_dir, backend) = temp_backend();
        insert_photo(&backend, "kept", "2026-01-01T00:00:00Z");
        insert_photo(&backend, "gone", "2026-01-02T00:00:00Z");

        // Mark one row deleted by hand; the interpreter has no UPDATE shape.
        {
            let mut doc = backend.doc.lock().unwrap();
            if let Some(Value::Array(rows)) = doc.get_mut("photos") {
                for row in rows.iter_mut() {
                    if row["id"] == json!("gone") {
                        row["deleted_at"] = json!("2026-01-03T00:00:00Z");
                    }
                }
            }
        }

        let rows = backend
            .all("SELECT id FROM photos WHERE deleted_at IS NULL", &[])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("kept"));
    }

    #[test]
    fn schema_version_is_a_forward_only_watermark() {
        let (_dir, backend) = temp_backend();
        let max_version = |b: &DocumentBackend| {
            b.get("SELECT MAX(version) AS version FROM schema_version", &[])
                .unwrap()
                .unwrap()["version"]
                .clone()
        };
        assert_eq!(max_version(&backend), Value::Null);

        backend
            .run(
                "INSERT INTO schema_version (version, applied_at) VALUES (?, ?)",
                &[json!(2), json!("2026-01-01T00:00:00Z")],
            )
            .unwrap();
        backend
            .run(
                "INSERT INTO schema_version (version, applied_at) VALUES (?, ?)",
                &[json!(1), json!("2026-01-02T00:00:00Z")],
            )
            .unwrap();
        assert_eq!(max_version(&backend), json!(2));
    }

    #[test]
    fn unrecognized_statements_are_silent_no_ops() {
        let (_dir, backend) = temp_backend();
        backend
            .run("UPDATE photos SET deleted_at = ? WHERE id = ?", &[json!("t"), json!("x")])
            .unwrap();
        backend.run("PRAGMA foreign_keys = ON", &[]).unwrap();
        backend.run("DROP TABLE photos", &[]).unwrap();
        assert!(backend.table_exists("photos").unwrap());
    }

    #[test]
    fn generic_insert_stores_opaque_params() {
        let (_dir, backend) = temp_backend();
        backend
            .run(
                "INSERT INTO labels (id, name) VALUES (?, ?)",
                &[json!("l1"), json!("holiday")],
            )
            .unwrap();
        let rows = backend.all("SELECT * FROM labels", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["params"], json!(["l1", "holiday"]));
    }

    #[test]
    fn document_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        {
            let backend = DocumentBackend::load(&path).unwrap();
            insert_photo(&backend, "p1", "2026-01-01T00:00:00Z");
        }
        let backend = DocumentBackend::load(&path).unwrap();
        let rows = backend.all("SELECT * FROM photos", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("p1"));
    }

    #[test]
    fn create_table_adds_missing_key() {
        let (_dir, backend) = temp_backend();
        assert!(!backend.table_exists("extras").unwrap());
        backend
            .run("CREATE TABLE IF NOT EXISTS extras (id TEXT PRIMARY KEY)", &[])
            .unwrap();
        assert!(backend.table_exists("extras").unwrap());
    }

    #[test]
    fn parser_recognizes_known_shapes() {
        assert_eq!(
            parse_statement("CREATE TABLE IF NOT EXISTS photos (id TEXT)"),
            Statement::CreateTable("photos".to_string())
        );
        assert_eq!(
            parse_statement("insert into Albums (id) values (?)"),
            Statement::InsertInto("albums".to_string())
        );
        assert_eq!(
            parse_statement("SELECT MAX(version) AS version FROM schema_version"),
            Statement::SelectFrom("schema_version".to_string())
        );
        assert_eq!(parse_statement("DELETE FROM photos"), Statement::Unrecognized);
        assert_eq!(parse_statement(""), Statement::Unrecognized);
    }
}
