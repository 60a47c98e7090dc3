//! Record store contract and the in-memory implementation.
//!
//! The application persists documents through whatever backend the shell
//! wires in; everything in this crate only depends on the [`RecordStore`]
//! trait. [`MemoryStore`] is the reference implementation and the one the
//! test suite runs against.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde_json::Value;
use thiserror::Error;

use super::model::{FieldMap, ItemKind};

pub type RecordId = u64;
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no {kind} record with id {id}")]
    NotFound { kind: ItemKind, id: RecordId },
    #[error("{kind} records do not support soft deletion")]
    SoftDeleteUnsupported { kind: ItemKind },
}

/// Soft-deletion metadata kept beside a row
#[derive(Debug, Clone)]
pub struct Deletion {
    pub reason: String,
    pub deleted_by: Option<String>,
    pub deleted_at: DateTime<Local>,
}

/// Contract any persistence backend must satisfy for the undo machinery.
///
/// `get_by_id` returns soft-deleted rows as well; deletion state is queried
/// separately. Soft deletion is an optional capability, probed through
/// `supports_soft_delete` before the delete/restore paths are taken.
pub trait RecordStore: Send + Sync {
    /// Fetch a record's fields by id, including the `id` field itself.
    fn get_by_id(&self, kind: ItemKind, id: RecordId) -> StoreResult<FieldMap>;

    /// Assign the given fields on the record and persist it.
    fn apply_fields(&self, kind: ItemKind, id: RecordId, values: &FieldMap) -> StoreResult<()>;

    /// Whether records of this kind can be soft deleted and restored.
    fn supports_soft_delete(&self, kind: ItemKind) -> bool;

    /// Mark the record inactive without removing it.
    fn soft_delete(
        &self,
        kind: ItemKind,
        id: RecordId,
        reason: &str,
        deleted_by: Option<&str>,
    ) -> StoreResult<()>;

    /// Bring a soft-deleted record back.
    fn restore(&self, kind: ItemKind, id: RecordId) -> StoreResult<()>;

    fn is_deleted(&self, kind: ItemKind, id: RecordId) -> StoreResult<bool>;
}

struct Row {
    fields: FieldMap,
    deletion: Option<Deletion>,
}

#[derive(Default)]
struct Inner {
    rows: HashMap<(ItemKind, RecordId), Row>,
    next_ids: HashMap<ItemKind, RecordId>,
}

/// In-memory record store with per-kind auto-increment ids.
///
/// Rows carry `created_at`/`updated_at` stamps the same way the database
/// models do; `updated_at` is bumped on every field assignment.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Insert a new row and return its assigned id.
    pub fn insert(&self, kind: ItemKind, mut fields: FieldMap) -> RecordId {
        let mut inner = self.inner.lock().unwrap();
        let next = inner.next_ids.entry(kind).or_insert(1);
        let id = *next;
        *next += 1;

        let now = Local::now().to_rfc3339();
        fields.insert("id".to_string(), Value::from(id));
        fields.insert("created_at".to_string(), Value::from(now.clone()));
        fields.insert("updated_at".to_string(), Value::from(now));
        inner.rows.insert(
            (kind, id),
            Row {
                fields,
                deletion: None,
            },
        );
        id
    }

    /// Active (non-deleted) rows of one kind, ordered by id.
    pub fn list_active(&self, kind: ItemKind) -> Vec<(RecordId, FieldMap)> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<(RecordId, FieldMap)> = inner
            .rows
            .iter()
            .filter(|((k, _), row)| *k == kind && row.deletion.is_none())
            .map(|((_, id), row)| (*id, row.fields.clone()))
            .collect();
        rows.sort_by_key(|(id, _)| *id);
        rows
    }

    /// Deletion metadata for a row, if it is currently soft deleted.
    pub fn deletion_info(&self, kind: ItemKind, id: RecordId) -> Option<Deletion> {
        let inner = self.inner.lock().unwrap();
        inner
            .rows
            .get(&(kind, id))
            .and_then(|row| row.deletion.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn get_by_id(&self, kind: ItemKind, id: RecordId) -> StoreResult<FieldMap> {
        let inner = self.inner.lock().unwrap();
        inner
            .rows
            .get(&(kind, id))
            .map(|row| row.fields.clone())
            .ok_or(StoreError::NotFound { kind, id })
    }

    fn apply_fields(&self, kind: ItemKind, id: RecordId, values: &FieldMap) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .rows
            .get_mut(&(kind, id))
            .ok_or(StoreError::NotFound { kind, id })?;

        for (name, value) in values {
            // The id column is not assignable.
            if name == "id" {
                continue;
            }
            row.fields.insert(name.clone(), value.clone());
        }
        row.fields.insert(
            "updated_at".to_string(),
            Value::from(Local::now().to_rfc3339()),
        );
        Ok(())
    }

    fn supports_soft_delete(&self, _kind: ItemKind) -> bool {
        true
    }

    fn soft_delete(
        &self,
        kind: ItemKind,
        id: RecordId,
        reason: &str,
        deleted_by: Option<&str>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .rows
            .get_mut(&(kind, id))
            .ok_or(StoreError::NotFound { kind, id })?;
        row.deletion = Some(Deletion {
            reason: reason.to_string(),
            deleted_by: deleted_by.map(str::to_string),
            deleted_at: Local::now(),
        });
        Ok(())
    }

    fn restore(&self, kind: ItemKind, id: RecordId) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .rows
            .get_mut(&(kind, id))
            .ok_or(StoreError::NotFound { kind, id })?;
        row.deletion = None;
        Ok(())
    }

    fn is_deleted(&self, kind: ItemKind, id: RecordId) -> StoreResult<bool> {
        let inner = self.inner.lock().unwrap();
        inner
            .rows
            .get(&(kind, id))
            .map(|row| row.deletion.is_some())
            .ok_or(StoreError::NotFound { kind, id })
    }
}
