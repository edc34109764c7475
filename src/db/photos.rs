//! Photo repository: domain-level operations expressed as parametrized
//! statements against whichever backend the facade selected.

use chrono::Utc;
use serde_json::{json, Value};

use super::backend::{Row, SqlBackend};
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub id: String,
    pub file_uri: String,
    pub thumbnail_uri: Option<String>,
    pub taken_at: Option<String>,
    pub created_at: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

/// Caller-supplied content fields; the repository assigns `created_at`
/// and `updated_at` on insert.
#[derive(Debug, Clone, Default)]
pub struct NewPhoto {
    pub id: String,
    pub file_uri: String,
    pub thumbnail_uri: Option<String>,
    pub taken_at: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

/// Insert one photo row. On SQLite a duplicate id is a constraint
/// violation; on the document backend it replaces the existing row
/// (upsert-by-id).
pub fn create_photo(db: &impl SqlBackend, photo: &NewPhoto) -> Result<(), StoreError> {
    let now = Utc::now().to_rfc3339();
    insert_with_timestamps(db, photo, &now, &now)
}

pub(crate) fn insert_with_timestamps(
    db: &impl SqlBackend,
    photo: &NewPhoto,
    created_at: &str,
    updated_at: &str,
) -> Result<(), StoreError> {
    db.run(
        "INSERT INTO photos (id, file_uri, thumbnail_uri, taken_at, created_at, updated_at, width, height)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        &[
            json!(photo.id),
            json!(photo.file_uri),
            json!(photo.thumbnail_uri),
            json!(photo.taken_at),
            json!(created_at),
            json!(updated_at),
            json!(photo.width),
            json!(photo.height),
        ],
    )
}

/// All non-deleted photos, newest first.
pub fn list_photos(db: &impl SqlBackend) -> Result<Vec<Photo>, StoreError> {
    let rows = db.all(
        "SELECT id, file_uri, thumbnail_uri, taken_at, created_at, width, height
         FROM photos WHERE deleted_at IS NULL ORDER BY created_at DESC",
        &[],
    )?;
    Ok(rows.iter().map(photo_from_row).collect())
}

/// Mark a photo deleted without removing the row. File removal is the
/// media layer's job. The document backend's interpreter has no UPDATE
/// shape, so there this is a recorded no-op.
pub fn soft_delete_photo(db: &impl SqlBackend, id: &str) -> Result<(), StoreError> {
    let now = Utc::now().to_rfc3339();
    db.run(
        "UPDATE photos SET deleted_at = ?, updated_at = ? WHERE id = ?",
        &[json!(now), json!(now), json!(id)],
    )
}

fn str_field(row: &Row, key: &str) -> String {
    row.get(key).and_then(Value::as_str).unwrap_or("").to_string()
}

fn opt_str_field(row: &Row, key: &str) -> Option<String> {
    row.get(key).and_then(Value::as_str).map(str::to_string)
}

fn photo_from_row(row: &Row) -> Photo {
    Photo {
        id: str_field(row, "id"),
        file_uri: str_field(row, "file_uri"),
        thumbnail_uri: opt_str_field(row, "thumbnail_uri"),
        taken_at: opt_str_field(row, "taken_at"),
        created_at: str_field(row, "created_at"),
        width: row.get("width").and_then(Value::as_i64),
        height: row.get("height").and_then(Value::as_i64),
    }
}
