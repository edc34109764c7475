//! Schema registry: one ordered, append-only list of migration batches.
//!
//! `MIGRATIONS[i]` is the batch for schema version `i + 1`. Batches are
//! immutable once shipped; schema evolution happens by appending a new
//! batch, never by editing an existing one. Every statement must tolerate
//! being re-run (`IF NOT EXISTS` and friends) because the document-store
//! backend cannot roll back a partially applied batch.

/// Versioned migration batches, 0-indexed.
pub const MIGRATIONS: &[&[&str]] = &[
    // ---- v1: initial schema ----
    &[
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS albums (
            id TEXT PRIMARY KEY,
            remote_id TEXT,
            name TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            sync_status TEXT NOT NULL DEFAULT 'pending'
        )",
        "CREATE TABLE IF NOT EXISTS photos (
            id TEXT PRIMARY KEY,
            remote_id TEXT,
            album_id TEXT,
            file_uri TEXT NOT NULL,
            thumbnail_uri TEXT,
            taken_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            sync_status TEXT NOT NULL DEFAULT 'pending',
            location_lat REAL,
            location_lng REAL,
            width INTEGER,
            height INTEGER,
            orientation INTEGER
        )",
        "CREATE TABLE IF NOT EXISTS labels (
            id TEXT PRIMARY KEY,
            remote_id TEXT,
            name TEXT NOT NULL,
            type TEXT NOT NULL DEFAULT 'tag',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            sync_status TEXT NOT NULL DEFAULT 'pending'
        )",
        "CREATE TABLE IF NOT EXISTS photo_labels (
            photo_id TEXT NOT NULL,
            label_id TEXT NOT NULL,
            PRIMARY KEY (photo_id, label_id)
        )",
        "CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            remote_id TEXT,
            photo_id TEXT NOT NULL,
            body TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            sync_status TEXT NOT NULL DEFAULT 'pending'
        )",
        "CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            remote_id TEXT,
            title TEXT NOT NULL,
            start_at TEXT NOT NULL,
            end_at TEXT,
            location TEXT,
            memo TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            sync_status TEXT NOT NULL DEFAULT 'pending'
        )",
        // Indexes for common queries
        "CREATE INDEX IF NOT EXISTS idx_photos_album_id ON photos(album_id)",
        "CREATE INDEX IF NOT EXISTS idx_photos_taken_at ON photos(taken_at)",
        "CREATE INDEX IF NOT EXISTS idx_photos_created_at ON photos(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_labels_name ON labels(name)",
        "CREATE INDEX IF NOT EXISTS idx_notes_photo_id ON notes(photo_id)",
        "CREATE INDEX IF NOT EXISTS idx_events_start_at ON events(start_at)",
    ],
    // Future migrations are appended here as additional batches.
];

/// The schema version a fully migrated store sits at.
pub const LATEST_VERSION: u32 = MIGRATIONS.len() as u32;

/// The seven tables created by v1, in creation order.
pub const TABLES: &[&str] = &[
    "schema_version",
    "albums",
    "photos",
    "labels",
    "photo_labels",
    "notes",
    "events",
];
