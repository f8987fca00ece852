//! Database module
//!
//! - **core**: SQLite connection wrapper and database file helpers
//! - **migrate**: versioned scripts, backups and the migration orchestrator
//! - **lazy**: [`LazyDb`], the handle tying configuration, connection and
//!   migrations together
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/            # Foundation
//! │   ├── connection   # DatabaseConn wrapper, ParamQuery
//! │   └── files        # .db path checks, file creation and copies
//! │
//! ├── migrate/         # Schema migration
//! │   ├── source       # ScriptSource, largest_version
//! │   ├── probe        # MigrationState, CurrentVersion
//! │   ├── backup       # timestamped backups
//! │   ├── runner       # SqliteMigrator
//! │   └── orchestrator # backup-then-migrate
//! │
//! └── lazy             # LazyDb
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use lazydb::{LazyDb, LazyDbConfig};
//!
//! let config = LazyDbConfig {
//!     database_path: "app.db".to_string(),
//!     backup_directory: "bk".to_string(),
//!     ..Default::default()
//! };
//!
//! let mut db = LazyDb::new(config)?;
//! db.connect()?;
//! let report = db.migrate()?;
//! if let Some(backup) = report.backup_path {
//!     println!("backed up to {}", backup.display());
//! }
//! ```

pub mod core;
pub mod migrate;

mod lazy;

pub use core::{create_db_file, is_file_exist, DatabaseConn, ParamQuery, DATABASE_EXTENSION};
pub use lazy::LazyDb;
pub use migrate::{
    CurrentVersion, MigrateReport, MigrationFailure, MigrationOrchestrator, MigrationState,
    ScriptSource, SqliteMigrator, Target,
};
