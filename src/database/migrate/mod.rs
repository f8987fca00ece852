//! Schema migration with automatic backup
//!
//! - `source`: versioned script sources (on disk or in memory) and `largest_version`
//! - `probe`: the migration-state boundary and the schema version probe
//! - `backup`: timestamped pre-migration copies of the database file
//! - `runner`: `SqliteMigrator`, which applies up/down scripts
//! - `orchestrator`: decides on a backup, then migrates

pub mod backup;
pub mod orchestrator;
pub mod probe;
pub mod runner;
pub mod source;

#[cfg(test)]
pub(crate) mod fixtures;

pub use backup::{backup_path_at, backup_to, create_backup, default_backup_path};
pub use orchestrator::{MigrateReport, MigrationFailure, MigrationOrchestrator};
pub use probe::{current_version, CurrentVersion, MigrationState, Target};
pub use runner::{ScriptPair, SqliteMigrator, MIGRATIONS_TABLE};
pub use source::{
    largest_version, DirScriptSource, MemoryScriptSource, ScriptEntry, ScriptSource, SourceEntry,
};
