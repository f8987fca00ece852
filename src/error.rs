//! Error types
//!
//! Every fallible operation in lazydb returns [`LazyDbError`]. Two variants,
//! [`LazyDbError::NilVersion`] and [`LazyDbError::NoChange`], are sentinels
//! raised at the migration-state boundary; the orchestrator turns both into
//! successful outcomes and they never reach callers of [`crate::LazyDb`].

use std::path::PathBuf;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, LazyDbError>;

#[derive(Debug, thiserror::Error)]
pub enum LazyDbError {
    /// Empty string passed as the database path
    #[error("empty database file path")]
    EmptyPath,

    /// Database (or backup) file does not carry the `.db` extension
    #[error("invalid file extension of database: {}", path.display())]
    InvalidExtension { path: PathBuf },

    /// No live connection is bound
    #[error("database is not connected")]
    NilDatabase,

    /// Batch execution requested with no statements
    #[error("no statement to execute")]
    EmptyStatement,

    /// WAL pages could not all be moved into the main file
    #[error("wal checkpoint blocked by readers: {checkpointed} of {log} frames copied")]
    CheckpointBusy { log: i64, checkpointed: i64 },

    /// Migration script directory is an empty string
    #[error("empty string for migration directory")]
    EmptyDirectory,

    /// Migration script directory contains a nested directory
    #[error("invalid migration directory structure: '{entry}' in '{directory}' is a directory")]
    InvalidDirectoryStructure { directory: String, entry: String },

    /// Backup source is a symlink, directory, device or similar
    #[error("{} is not a regular file", path.display())]
    NotRegularFile { path: PathBuf },

    /// No schema version has ever been recorded
    #[error("no migration version recorded")]
    NilVersion,

    /// Migration found nothing to apply
    #[error("no change")]
    NoChange,

    /// A previous migration failed half-way and left the schema dirty
    #[error("database is dirty at version {0}, fix and force version")]
    Dirty(u64),

    /// Requested target version has no script
    #[error("no migration script found for version {0}")]
    UnknownVersion(u64),

    /// More than one script for the same version and direction
    #[error("duplicate migration script for version {version}: {name}")]
    DuplicateScript { version: u64, name: String },

    /// A migration script failed to execute
    #[error("migration {version} failed: {source}")]
    Script {
        version: u64,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Sqlite {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl LazyDbError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LazyDbError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn sqlite(context: impl Into<String>, source: rusqlite::Error) -> Self {
        LazyDbError::Sqlite {
            context: context.into(),
            source,
        }
    }
}
