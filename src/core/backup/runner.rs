// Backup creation seam.
//
// The scheduler only depends on the BackupRunner trait; the file-copy
// implementation below is what the application wires in for its SQLite
// database file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;

/// Outcome of checking a finished backup file
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub size_bytes: u64,
    pub valid: bool,
}

/// Something that can produce and check a backup of the application data.
pub trait BackupRunner: Send + Sync {
    /// Create a backup and return its path. `description` tags the file
    /// (`automatic`, `manual`, ...).
    fn create_backup(&self, description: &str) -> io::Result<PathBuf>;

    /// Check a previously created backup.
    fn verify_backup(&self, path: &Path) -> io::Result<BackupReport>;
}

/// Copies the database file into a backup directory with a timestamped name.
pub struct FsBackupRunner {
    database_path: PathBuf,
    backup_dir: PathBuf,
}

impl FsBackupRunner {
    pub fn new(database_path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }
}

impl BackupRunner for FsBackupRunner {
    fn create_backup(&self, description: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.backup_dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let target = self
            .backup_dir
            .join(format!("backup_{}_{}.db", stamp, description));
        fs::copy(&self.database_path, &target)?;
        Ok(target)
    }

    fn verify_backup(&self, path: &Path) -> io::Result<BackupReport> {
        let size_bytes = fs::metadata(path)?.len();
        Ok(BackupReport {
            size_bytes,
            valid: size_bytes > 0,
        })
    }
}
