#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! lazydb - SQLite with lazy connection, versioned migrations and automatic backup
//!
//! A `LazyDb` opens (and, if needed, creates) a `.db` file on first connect.
//! Migrations are plain SQL scripts named `{version}_{title}.up.sql` /
//! `{version}_{title}.down.sql`, read through a [`ScriptSource`]. Before an
//! existing database is moved forward to a newer schema, the database file is
//! copied into a backup directory with a timestamped name.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `cli` (default) | `lazydb` binary | `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! lazydb = { version = "0.3", default-features = false }
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: connection, migration and backup
//!   - `core`: SQLite connection wrapper and file helpers
//!   - `migrate`: script sources, version probe, backups, runner, orchestrator
//! - **[`config`]**: configuration from TOML and `LAZYDB_*` environment variables
//! - **[`error`]**: the crate error type
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lazydb::{LazyDb, LazyDbConfig};
//! use lazydb::database::migrate::MemoryScriptSource;
//!
//! let source = MemoryScriptSource::new()
//!     .with_file("schema/1_init.up.sql", "CREATE TABLE t (id INTEGER);")
//!     .with_file("schema/1_init.down.sql", "DROP TABLE t;");
//!
//! let mut db = LazyDb::new(LazyDbConfig::default())?.with_source(source);
//! db.connect()?;
//! db.migrate()?;
//! db.exec("INSERT INTO t (id) VALUES (?1)", [1])?;
//! ```

pub mod config;
pub mod database;
pub mod error;

pub use config::LazyDbConfig;
pub use error::{LazyDbError, Result};

pub use database::{DatabaseConn, LazyDb, ParamQuery};

pub use database::migrate::{
    backup_to, create_backup, current_version, largest_version, CurrentVersion, DirScriptSource,
    MemoryScriptSource, MigrateReport, MigrationFailure, MigrationOrchestrator, MigrationState,
    ScriptSource, SqliteMigrator, Target,
};
