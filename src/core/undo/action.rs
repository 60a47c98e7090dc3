//! Undoable action records.
//!
//! Actions are recorded after the fact: the create/update/delete has already
//! hit the store by the time the action object exists, so `execute` only
//! confirms, while `undo`/`redo` perform the inverse and forward effects.
//! Reversal failures never propagate; they surface as a false return and the
//! manager keeps the action for a later retry.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::core::records::model::{FieldMap, ItemKind};
use crate::core::records::store::{RecordId, RecordStore};

static ACTION_COUNTER: AtomicU64 = AtomicU64::new(0);

const DELETE_REDO_REASON: &str = "Redo of delete action";
const CREATE_UNDO_REASON: &str = "Undo of create action";

/// Per-kind reversal data
#[derive(Debug, Clone)]
pub enum ActionPayload {
    /// Field snapshot taken at soft-delete time, identity excluded
    Delete { snapshot: FieldMap },
    /// Independent copies of the values before and after the edit
    Update {
        old_values: FieldMap,
        new_values: FieldMap,
    },
    /// Field snapshot taken at creation time, identity and audit stamps excluded
    Create { snapshot: FieldMap },
}

/// A single reversible operation against a persistent record
#[derive(Debug, Clone)]
pub struct UndoableAction {
    action_id: u64,
    description: String,
    timestamp: DateTime<Local>,
    item_kind: ItemKind,
    record_id: RecordId,
    payload: ActionPayload,
}

impl UndoableAction {
    fn new(
        item_kind: ItemKind,
        record_id: RecordId,
        description: impl Into<String>,
        payload: ActionPayload,
    ) -> Self {
        Self {
            action_id: ACTION_COUNTER.fetch_add(1, Ordering::SeqCst),
            description: description.into(),
            timestamp: Local::now(),
            item_kind,
            record_id,
            payload,
        }
    }

    /// Action for a record that was just soft deleted.
    pub fn delete(
        item_kind: ItemKind,
        record_id: RecordId,
        fields: &FieldMap,
        description: impl Into<String>,
    ) -> Self {
        let snapshot = capture_snapshot(fields, &["id"]);
        Self::new(
            item_kind,
            record_id,
            description,
            ActionPayload::Delete { snapshot },
        )
    }

    /// Action for a record that was just updated. Both value maps are copied,
    /// so the caller may keep mutating its own maps freely.
    pub fn update(
        item_kind: ItemKind,
        record_id: RecordId,
        old_values: &FieldMap,
        new_values: &FieldMap,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            item_kind,
            record_id,
            description,
            ActionPayload::Update {
                old_values: old_values.clone(),
                new_values: new_values.clone(),
            },
        )
    }

    /// Action for a record that was just created.
    pub fn create(
        item_kind: ItemKind,
        record_id: RecordId,
        fields: &FieldMap,
        description: impl Into<String>,
    ) -> Self {
        let snapshot = capture_snapshot(fields, &["id", "created_at", "updated_at"]);
        Self::new(
            item_kind,
            record_id,
            description,
            ActionPayload::Create { snapshot },
        )
    }

    pub fn action_id(&self) -> u64 {
        self.action_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn item_kind(&self) -> ItemKind {
        self.item_kind
    }

    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    pub fn payload(&self) -> &ActionPayload {
        &self.payload
    }

    /// History tag for this action's kind
    pub fn kind_tag(&self) -> &'static str {
        match self.payload {
            ActionPayload::Delete { .. } => "delete",
            ActionPayload::Update { .. } => "update",
            ActionPayload::Create { .. } => "create",
        }
    }

    /// Confirm the forward effect. The operation ran before the action was
    /// recorded, so there is nothing left to do.
    pub fn execute(&self, _store: &dyn RecordStore) -> bool {
        true
    }

    /// Apply the inverse effect. Returns false when the record is gone, the
    /// kind lacks the needed capability, or the store reports an error.
    pub fn undo(&self, store: &dyn RecordStore) -> bool {
        match &self.payload {
            ActionPayload::Delete { .. } => {
                if !store.supports_soft_delete(self.item_kind) {
                    return false;
                }
                store.restore(self.item_kind, self.record_id).is_ok()
            }
            ActionPayload::Update { old_values, .. } => store
                .apply_fields(self.item_kind, self.record_id, old_values)
                .is_ok(),
            ActionPayload::Create { .. } => {
                if !store.supports_soft_delete(self.item_kind) {
                    return false;
                }
                store
                    .soft_delete(self.item_kind, self.record_id, CREATE_UNDO_REASON, None)
                    .is_ok()
            }
        }
    }

    /// Re-apply the forward effect after an undo.
    pub fn redo(&self, store: &dyn RecordStore) -> bool {
        match &self.payload {
            ActionPayload::Delete { .. } => {
                if !store.supports_soft_delete(self.item_kind) {
                    return false;
                }
                store
                    .soft_delete(self.item_kind, self.record_id, DELETE_REDO_REASON, None)
                    .is_ok()
            }
            ActionPayload::Update { new_values, .. } => store
                .apply_fields(self.item_kind, self.record_id, new_values)
                .is_ok(),
            ActionPayload::Create { snapshot } => {
                if !store.supports_soft_delete(self.item_kind) {
                    return false;
                }
                match store.is_deleted(self.item_kind, self.record_id) {
                    Ok(true) => {
                        if store.restore(self.item_kind, self.record_id).is_err() {
                            return false;
                        }
                    }
                    Ok(false) => {}
                    Err(_) => return false,
                }
                store
                    .apply_fields(self.item_kind, self.record_id, snapshot)
                    .is_ok()
            }
        }
    }
}

/// Copy a record's fields, skipping the excluded names. A value that is
/// itself an object carrying an `id` is captured as that id only, so the
/// snapshot never holds a stale nested record.
fn capture_snapshot(fields: &FieldMap, excluded: &[&str]) -> FieldMap {
    fields
        .iter()
        .filter(|(name, _)| !excluded.contains(&name.as_str()))
        .map(|(name, value)| {
            let captured = match value {
                Value::Object(map) => map.get("id").cloned().unwrap_or_else(|| value.clone()),
                other => other.clone(),
            };
            (name.clone(), captured)
        })
        .collect()
}
