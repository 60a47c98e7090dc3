//! Bounded undo/redo history over recorded actions.
//!
//! The manager owns two LIFO stacks; an action always lives in exactly one
//! of them and moves between them as it is undone and redone. A failed
//! reversal pushes the action back where it came from, so history is never
//! lost to a transient store problem.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use lazy_static::lazy_static;
use serde::Serialize;

use super::action::UndoableAction;
use crate::core::records::model::{FieldMap, ItemKind};
use crate::core::records::store::{RecordId, RecordStore};

/// History cap of the process-wide manager
pub const DEFAULT_MAX_HISTORY: usize = 100;

type Callback = Box<dyn Fn() + Send>;

/// One exported history row
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub description: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// Undo and redo listings, most recent first
#[derive(Debug, Serialize)]
pub struct ActionHistory {
    pub undo: Vec<HistoryEntry>,
    pub redo: Vec<HistoryEntry>,
}

/// Manager for tracking and executing undo/redo operations
pub struct UndoManager {
    undo_stack: Vec<UndoableAction>,
    redo_stack: Vec<UndoableAction>,
    max_history: usize,
    // Only the history channel is notified today; the undo/redo channels
    // are registration points the UI relies on existing.
    #[allow(dead_code)]
    undo_callbacks: Vec<Callback>,
    #[allow(dead_code)]
    redo_callbacks: Vec<Callback>,
    history_callbacks: Vec<Callback>,
}

impl UndoManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history,
            undo_callbacks: Vec::new(),
            redo_callbacks: Vec::new(),
            history_callbacks: Vec::new(),
        }
    }

    /// Record an action for potential undo.
    ///
    /// Clears the redo stack (new activity invalidates any undone future)
    /// and evicts the oldest entry once the cap is exceeded.
    pub fn record_action(&mut self, action: UndoableAction) {
        self.undo_stack.push(action);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_history {
            self.undo_stack.remove(0);
        }
        self.notify_history_changed();
    }

    /// Undo the most recent action.
    ///
    /// On success the action moves to the redo stack and is returned. On
    /// failure it stays on top of the undo stack for a retry and `None` is
    /// returned.
    pub fn undo(&mut self, store: &dyn RecordStore) -> Option<&UndoableAction> {
        let action = self.undo_stack.pop()?;
        if action.undo(store) {
            self.redo_stack.push(action);
            self.notify_history_changed();
            self.redo_stack.last()
        } else {
            self.undo_stack.push(action);
            None
        }
    }

    /// Redo the most recently undone action. Symmetric to [`Self::undo`].
    pub fn redo(&mut self, store: &dyn RecordStore) -> Option<&UndoableAction> {
        let action = self.redo_stack.pop()?;
        if action.redo(store) {
            self.undo_stack.push(action);
            self.notify_history_changed();
            self.undo_stack.last()
        } else {
            self.redo_stack.push(action);
            None
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the action an undo would revert, without popping it.
    pub fn get_undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(UndoableAction::description)
    }

    /// Description of the action a redo would re-apply, without popping it.
    pub fn get_redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(UndoableAction::description)
    }

    /// Drop all undo/redo history.
    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.notify_history_changed();
    }

    /// Export both stacks for display, most recent action first.
    pub fn get_history(&self) -> ActionHistory {
        let export = |stack: &[UndoableAction]| {
            stack
                .iter()
                .rev()
                .map(|action| HistoryEntry {
                    id: action.action_id(),
                    description: action.description().to_string(),
                    timestamp: action.timestamp().to_rfc3339(),
                    kind: action.kind_tag(),
                })
                .collect()
        };
        ActionHistory {
            undo: export(&self.undo_stack),
            redo: export(&self.redo_stack),
        }
    }

    /// Register a callback for undo availability changes.
    pub fn register_undo_callback(&mut self, callback: impl Fn() + Send + 'static) {
        self.undo_callbacks.push(Box::new(callback));
    }

    /// Register a callback for redo availability changes.
    pub fn register_redo_callback(&mut self, callback: impl Fn() + Send + 'static) {
        self.redo_callbacks.push(Box::new(callback));
    }

    /// Register a callback for history changes.
    pub fn register_history_callback(&mut self, callback: impl Fn() + Send + 'static) {
        self.history_callbacks.push(Box::new(callback));
    }

    fn notify_history_changed(&self) {
        for callback in &self.history_callbacks {
            // A panicking observer must not corrupt the manager or starve
            // the remaining observers.
            let _ = catch_unwind(AssertUnwindSafe(|| callback()));
        }
    }
}

lazy_static! {
    static ref MANAGER: Mutex<Option<UndoManager>> = Mutex::new(None);
}

/// Run a closure against the process-wide manager, creating it on first use.
pub fn with_manager<R>(f: impl FnOnce(&mut UndoManager) -> R) -> R {
    let mut guard = MANAGER.lock().unwrap();
    let manager = guard.get_or_insert_with(|| UndoManager::new(DEFAULT_MAX_HISTORY));
    f(manager)
}

/// Discard the process-wide manager and its stacks. Test teardown only.
pub fn reset() {
    *MANAGER.lock().unwrap() = None;
}

/// Record a soft deletion that already happened on the global manager.
pub fn record_delete(
    store: &dyn RecordStore,
    kind: ItemKind,
    id: RecordId,
    description: impl Into<String>,
) {
    match store.get_by_id(kind, id) {
        Ok(fields) => with_manager(|manager| {
            manager.record_action(UndoableAction::delete(kind, id, &fields, description));
        }),
        Err(e) => log::warn!("Cannot record deletion of {} #{}: {}", kind, id, e),
    }
}

/// Record an update that already happened on the global manager.
pub fn record_update(
    kind: ItemKind,
    id: RecordId,
    old_values: &FieldMap,
    new_values: &FieldMap,
    description: impl Into<String>,
) {
    with_manager(|manager| {
        manager.record_action(UndoableAction::update(
            kind,
            id,
            old_values,
            new_values,
            description,
        ));
    });
}

/// Record a creation that already happened on the global manager.
pub fn record_create(
    store: &dyn RecordStore,
    kind: ItemKind,
    id: RecordId,
    description: impl Into<String>,
) {
    match store.get_by_id(kind, id) {
        Ok(fields) => with_manager(|manager| {
            manager.record_action(UndoableAction::create(kind, id, &fields, description));
        }),
        Err(e) => log::warn!("Cannot record creation of {} #{}: {}", kind, id, e),
    }
}
