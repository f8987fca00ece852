//! Pre-migration database backups
//!
//! Backups are verbatim copies of the database file named
//! `{stem}_bk_{YYYYMMDDHHMMSS}{.ext}` inside the configured backup directory.
//! Two backups taken within the same second share a name; the later one wins.

use crate::database::core::files::{copy_file, ensure_db_extension};
use crate::error::{LazyDbError, Result};
use chrono::{DateTime, Local, TimeZone};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Timestamp layout embedded in backup file names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Compute the backup destination for `db_path` at instant `at`
pub fn backup_path_at<Tz>(db_path: &Path, backup_dir: &Path, at: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let stem = db_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = db_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    backup_dir.join(format!(
        "{}_bk_{}{}",
        stem,
        at.format(BACKUP_TIMESTAMP_FORMAT),
        ext
    ))
}

/// Backup destination for `db_path` at the current local time
pub fn default_backup_path(db_path: &Path, backup_dir: &Path) -> PathBuf {
    backup_path_at(db_path, backup_dir, &Local::now())
}

/// Copy the database file at `db_path` to `dest`.
///
/// `dest` must end in `.db`; its parent directories are created as needed.
pub fn backup_to(db_path: &Path, dest: &Path) -> Result<u64> {
    ensure_db_extension(dest)?;

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                LazyDbError::io(
                    format!("failed to create backup directory '{}'", parent.display()),
                    e,
                )
            })?;
        }
    }

    copy_file(db_path, dest)
}

/// Back up `db_path` into `backup_dir` under a timestamped name.
///
/// An empty `backup_dir` disables backups and returns `Ok(None)`.
pub fn create_backup(db_path: &Path, backup_dir: &str) -> Result<Option<PathBuf>> {
    create_backup_tracked(db_path, backup_dir).map_err(LazyDbError::from)
}

/// A failed backup together with the destination it was aimed at
#[derive(Debug)]
pub struct BackupError {
    pub dest: PathBuf,
    pub error: LazyDbError,
}

impl From<BackupError> for LazyDbError {
    fn from(e: BackupError) -> Self {
        e.error
    }
}

/// Same as [`create_backup`], but keeps the attempted destination on failure
pub(crate) fn create_backup_tracked(
    db_path: &Path,
    backup_dir: &str,
) -> std::result::Result<Option<PathBuf>, BackupError> {
    if backup_dir.is_empty() {
        return Ok(None);
    }

    let dest = default_backup_path(db_path, Path::new(backup_dir));
    match backup_to(db_path, &dest) {
        Ok(bytes) => {
            info!(
                "backed up {} to {} ({} bytes)",
                db_path.display(),
                dest.display(),
                bytes
            );
            Ok(Some(dest))
        }
        Err(error) => Err(BackupError { dest, error }),
    }
}
