#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
pub mod core;

pub use crate::core::alerts::model::{AlertLevel, CategoryAlertSettings, DocumentCategory};
pub use crate::core::alerts::settings::AlertSettingsManager;
pub use crate::core::backup::runner::{BackupRunner, FsBackupRunner};
pub use crate::core::backup::scheduler::{BackupScheduler, SchedulerConfig};
pub use crate::core::records::model::{FieldMap, ItemKind};
pub use crate::core::records::store::{MemoryStore, RecordStore};
pub use crate::core::undo::action::UndoableAction;
pub use crate::core::undo::manager::UndoManager;
