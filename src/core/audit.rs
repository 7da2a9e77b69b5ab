//! Append-only audit trail
//!
//! Every alert sent, configuration change and error encountered is recorded
//! as a timestamped human-readable line. The file is rotated by size with a
//! bounded number of retained backups (`audit.log.1` is the newest backup).
//! Audit failures are logged and swallowed: the bot must keep running even
//! when its audit disk is unhappy.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use tracing::warn;

/// Timestamp format for audit lines
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Size-rotated audit log
pub struct AuditLog {
    path: PathBuf,
    max_bytes: u64,
    max_backups: usize,
    /// Serializes append+rotate so concurrent tasks cannot interleave a
    /// rotation with a write.
    lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: PathBuf, max_bytes: u64, max_backups: usize) -> Self {
        Self {
            path,
            max_bytes,
            max_backups,
            lock: Mutex::new(()),
        }
    }

    /// Record an alert dispatch.
    pub fn alert(&self, message: &str) {
        self.record("ALERT", message);
    }

    /// Record an accepted configuration change.
    pub fn config_change(&self, message: &str) {
        self.record("CONFIG", message);
    }

    /// Record an error encountered by the bot.
    pub fn error(&self, message: &str) {
        self.record("ERROR", message);
    }

    fn record(&self, level: &str, message: &str) {
        if let Err(e) = self.append(level, message) {
            warn!(error = ?e, path = %self.path.display(), "audit write failed");
        }
    }

    fn append(&self, level: &str, message: &str) -> io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let line = format!(
            "{} - {} - {}\n",
            Utc::now().format(TIMESTAMP_FORMAT),
            level,
            message
        );

        if let Ok(meta) = fs::metadata(&self.path) {
            if meta.len() + line.len() as u64 > self.max_bytes {
                self.rotate()?;
            }
        }

        let mut file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }

    /// Shift backups up by one slot, dropping the oldest.
    fn rotate(&self) -> io::Result<()> {
        if self.max_backups == 0 {
            fs::remove_file(&self.path)?;
            return Ok(());
        }

        let oldest = self.backup_path(self.max_backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for i in (1..self.max_backups).rev() {
            let from = self.backup_path(i);
            if from.exists() {
                fs::rename(&from, self.backup_path(i + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }
}

// ============================================================================
// Tests
// ============================================================================
