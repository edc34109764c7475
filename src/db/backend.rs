//! Storage backend abstraction.
//!
//! This module provides a trait-based abstraction layer that allows the
//! persistence facade to work with different backends (SQLite, document
//! store). The migration runner is generic over this trait.

use serde_json::Value;

use crate::error::StoreError;

/// A single result row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// A parameterized statement as accepted by [`SqlBackend::transaction`].
pub type BoundStatement = (String, Vec<Value>);

/// What `transaction` actually guarantees on a given backend.
///
/// SQLite provides real grouped commits. The document store cannot roll
/// back, so it degrades to sequential execution; callers that need the
/// hard guarantee must check this before relying on rollback ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Atomicity {
    /// All statements commit or roll back together.
    Atomic,
    /// Statements run in order; effects of earlier statements persist
    /// even when a later one fails.
    BestEffortSequential,
}

/// Common interface implemented by both storage backends.
pub trait SqlBackend {
    /// Execute one statement inside its own implicit transaction.
    fn run(&self, sql: &str, params: &[Value]) -> Result<(), StoreError>;

    /// Query for multiple rows.
    fn all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError>;

    /// Query for the first row, or `None` when the result set is empty.
    /// Zero results is not an error.
    fn get(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError> {
        Ok(self.all(sql, params)?.into_iter().next())
    }

    /// Execute a group of statements, atomically where the backend
    /// supports it (see [`SqlBackend::atomicity`]). Fails with the first
    /// statement's error.
    fn transaction(&self, statements: &[BoundStatement]) -> Result<(), StoreError>;

    /// Whether a table with the given name exists.
    fn table_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// The transaction guarantee this backend provides.
    fn atomicity(&self) -> Atomicity;
}
