//! Automated backup scheduling.
//!
//! One background thread polls once a minute and fires a daily backup once
//! the configured time of day has passed. Stopping signals a condvar and
//! joins the thread.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::runner::{BackupReport, BackupRunner};

const POLL_INTERVAL: Duration = Duration::from_secs(60);

lazy_static! {
    static ref TIME_FORMAT: Regex = Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap();
}

/// Scheduler configuration, persisted by the shell in its settings file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub automatic_daily: bool,
    /// Daily backup time as `HH:MM`
    pub backup_time: String,
    pub backup_on_shutdown: bool,
    pub retention_days: u32,
    pub retention_weeks: u32,
    pub retention_months: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            automatic_daily: true,
            backup_time: "02:00".to_string(),
            backup_on_shutdown: false,
            retention_days: 30,
            retention_weeks: 12,
            retention_months: 12,
        }
    }
}

/// How a scheduled backup run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStatus {
    /// Backup created and verified
    Success,
    /// Backup created but verification rejected it
    Failed,
    /// Backup creation itself errored
    Error,
}

/// Details handed to backup callbacks
#[derive(Debug, Default)]
pub struct BackupInfo {
    pub report: Option<BackupReport>,
    pub error: Option<String>,
}

type BackupCallback = Box<dyn Fn(BackupStatus, Option<&Path>, &BackupInfo) + Send>;

struct Shared {
    runner: Box<dyn BackupRunner>,
    config: Mutex<SchedulerConfig>,
    callbacks: Mutex<Vec<BackupCallback>>,
    last_backup: Mutex<Option<DateTime<Local>>>,
    running: AtomicBool,
    stop_flag: Mutex<bool>,
    stop_signal: Condvar,
}

/// Manages automated daily backups on a background thread.
pub struct BackupScheduler {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl BackupScheduler {
    pub fn new(runner: Box<dyn BackupRunner>, config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                runner,
                config: Mutex::new(config),
                callbacks: Mutex::new(Vec::new()),
                last_backup: Mutex::new(None),
                running: AtomicBool::new(false),
                stop_flag: Mutex::new(false),
                stop_signal: Condvar::new(),
            }),
            thread: None,
        }
    }

    pub fn with_defaults(runner: Box<dyn BackupRunner>) -> Self {
        Self::new(runner, SchedulerConfig::default())
    }

    /// Start the scheduler thread. Does nothing when automatic daily backups
    /// are disabled or the scheduler is already running.
    pub fn start(&mut self) {
        let backup_time = {
            let config = self.shared.config.lock().unwrap();
            if !config.automatic_daily {
                log::info!("Automatic daily backups disabled in config");
                return;
            }
            config.backup_time.clone()
        };
        if self.shared.running.load(Ordering::SeqCst) {
            log::warn!("Backup scheduler already running");
            return;
        }

        *self.shared.stop_flag.lock().unwrap() = false;
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        self.thread = Some(thread::spawn(move || run_loop(&shared)));

        log::info!("Backup scheduler started (daily backup at {})", backup_time);
    }

    /// Signal the scheduler thread to stop and wait for it to finish.
    pub fn stop(&mut self) {
        if !self.shared.running.load(Ordering::SeqCst) {
            return;
        }
        log::info!("Stopping backup scheduler");

        *self.shared.stop_flag.lock().unwrap() = true;
        self.shared.stop_signal.notify_all();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        self.shared.running.store(false, Ordering::SeqCst);

        log::info!("Backup scheduler stopped");
    }

    /// Run an immediate manual backup, bypassing the schedule.
    pub fn run_backup_now(&self) -> io::Result<PathBuf> {
        log::info!("Running immediate manual backup");
        self.shared.runner.create_backup("manual")
    }

    /// Register a callback invoked with (status, path, info) after every
    /// scheduled run.
    pub fn register_callback(
        &self,
        callback: impl Fn(BackupStatus, Option<&Path>, &BackupInfo) + Send + 'static,
    ) {
        self.shared
            .callbacks
            .lock()
            .unwrap()
            .push(Box::new(callback));
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn last_backup_time(&self) -> Option<DateTime<Local>> {
        *self.shared.last_backup.lock().unwrap()
    }

    pub fn config(&self) -> SchedulerConfig {
        self.shared.config.lock().unwrap().clone()
    }

    /// Replace the scheduler configuration. Takes effect on the next poll.
    pub fn set_config(&self, config: SchedulerConfig) {
        *self.shared.config.lock().unwrap() = config;
        log::info!("Backup scheduler config updated");
    }
}

impl Drop for BackupScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(shared: &Shared) {
    log::info!("Backup scheduler thread started");

    loop {
        let due = {
            let config = shared.config.lock().unwrap();
            let last = *shared.last_backup.lock().unwrap();
            backup_due(&config.backup_time, last, Local::now())
        };
        if due {
            run_scheduled_backup(shared);
        }

        let guard = shared.stop_flag.lock().unwrap();
        if *guard {
            break;
        }
        let (guard, _timeout) = shared
            .stop_signal
            .wait_timeout(guard, POLL_INTERVAL)
            .unwrap();
        if *guard {
            break;
        }
    }

    log::info!("Backup scheduler thread stopped");
}

/// Whether the configured daily time has been reached with no backup run yet
/// today. An unparsable `backup_time` disables the schedule.
fn backup_due(backup_time: &str, last: Option<DateTime<Local>>, now: DateTime<Local>) -> bool {
    let Some(at) = parse_backup_time(backup_time) else {
        log::error!("Invalid backup_time format: {}", backup_time);
        return false;
    };
    if now.time() < at {
        return false;
    }
    match last {
        None => true,
        Some(prev) => prev.date_naive() < now.date_naive(),
    }
}

fn parse_backup_time(value: &str) -> Option<NaiveTime> {
    let caps = TIME_FORMAT.captures(value)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn run_scheduled_backup(shared: &Shared) {
    log::info!("Starting scheduled automatic backup");

    let path = match shared.runner.create_backup("automatic") {
        Ok(path) => path,
        Err(e) => {
            log::error!("Scheduled backup failed: {}", e);
            let info = BackupInfo {
                report: None,
                error: Some(e.to_string()),
            };
            notify_callbacks(shared, BackupStatus::Error, None, &info);
            return;
        }
    };

    match shared.runner.verify_backup(&path) {
        Ok(report) if report.valid => {
            *shared.last_backup.lock().unwrap() = Some(Local::now());
            log::info!(
                "Scheduled backup completed: {:?} ({} bytes)",
                path.file_name().unwrap_or_default(),
                report.size_bytes
            );
            let info = BackupInfo {
                report: Some(report),
                error: None,
            };
            notify_callbacks(shared, BackupStatus::Success, Some(&path), &info);
        }
        Ok(report) => {
            log::error!("Scheduled backup verification failed: {:?}", path);
            let info = BackupInfo {
                report: Some(report),
                error: None,
            };
            notify_callbacks(shared, BackupStatus::Failed, Some(&path), &info);
        }
        Err(e) => {
            log::error!("Scheduled backup verification failed: {}", e);
            let info = BackupInfo {
                report: None,
                error: Some(e.to_string()),
            };
            notify_callbacks(shared, BackupStatus::Failed, Some(&path), &info);
        }
    }
}

fn notify_callbacks(shared: &Shared, status: BackupStatus, path: Option<&Path>, info: &BackupInfo) {
    for callback in shared.callbacks.lock().unwrap().iter() {
        // One broken observer must not keep the others from being told.
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            callback(status, path, info);
        }));
        if result.is_err() {
            log::error!("Backup callback panicked");
        }
    }
}
