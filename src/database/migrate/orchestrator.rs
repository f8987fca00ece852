//! Migration orchestration
//!
//! Ties the schema version probe, the script source and the backup manager
//! together around one [`MigrationState`]:
//!
//! ```text
//! probe version -> latest script version -> backup (when due) -> apply
//! ```
//!
//! A backup is only taken when a backup directory is configured, the database
//! already has a recorded version, and the script source offers a newer one. A
//! failed backup stops the migration before the schema is touched. A failed
//! migration keeps whatever backup was already written.

use crate::database::migrate::backup::create_backup_tracked;
use crate::database::migrate::probe::{current_version, CurrentVersion, MigrationState, Target};
use crate::database::migrate::source::{largest_version, ScriptSource};
use crate::error::LazyDbError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of a successful migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrateReport {
    /// Backup written before migrating, if one was due
    pub backup_path: Option<PathBuf>,
    /// Version before the migration
    pub from: CurrentVersion,
    /// Version after the migration
    pub to: CurrentVersion,
}

impl MigrateReport {
    /// Whether the schema actually moved
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// A failed migration, carrying the backup path produced before the failure
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct MigrationFailure {
    pub backup_path: Option<PathBuf>,
    pub error: LazyDbError,
}

impl MigrationFailure {
    fn without_backup(error: LazyDbError) -> Self {
        Self {
            backup_path: None,
            error,
        }
    }
}

impl From<MigrationFailure> for LazyDbError {
    fn from(failure: MigrationFailure) -> Self {
        failure.error
    }
}

/// Drives one migration of the database file at `db_path`
pub struct MigrationOrchestrator<'a, S: ScriptSource + ?Sized> {
    db_path: &'a Path,
    source: &'a S,
    directory: &'a str,
    backup_dir: &'a str,
}

impl<'a, S: ScriptSource + ?Sized> MigrationOrchestrator<'a, S> {
    pub fn new(db_path: &'a Path, source: &'a S, directory: &'a str, backup_dir: &'a str) -> Self {
        Self {
            db_path,
            source,
            directory,
            backup_dir,
        }
    }

    /// Whether a backup is due before migrating from `current` when the
    /// source offers `latest`
    pub fn backup_due(&self, current: CurrentVersion, latest: u64) -> bool {
        !self.backup_dir.is_empty() && !current.is_new() && latest > current.version()
    }

    /// Migrate `state` to `requested`, where 0 means the highest version the
    /// script source offers at call time.
    pub fn migrate_to<M: MigrationState + ?Sized>(
        &self,
        state: &M,
        requested: u64,
    ) -> Result<MigrateReport, MigrationFailure> {
        if self.directory.is_empty() {
            return Err(MigrationFailure::without_backup(
                LazyDbError::EmptyDirectory,
            ));
        }

        let from = current_version(state).map_err(MigrationFailure::without_backup)?;
        let latest = largest_version(self.source, self.directory)
            .map_err(MigrationFailure::without_backup)?;
        debug!("schema version {}, latest available {}", from, latest);

        let backup_path = if self.backup_due(from, latest) {
            create_backup_tracked(self.db_path, self.backup_dir).map_err(|e| {
                warn!("backup to {} failed: {}", e.dest.display(), e.error);
                MigrationFailure {
                    backup_path: Some(e.dest),
                    error: e.error,
                }
            })?
        } else {
            None
        };

        let to = match state.apply(Target::from_requested(requested)) {
            Ok(version) => CurrentVersion::Recorded(version),
            Err(LazyDbError::NoChange) => {
                info!("schema already at requested version {}", from);
                from
            }
            Err(error) => {
                return Err(MigrationFailure { backup_path, error });
            }
        };

        Ok(MigrateReport {
            backup_path,
            from,
            to,
        })
    }
}
