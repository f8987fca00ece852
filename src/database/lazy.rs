//! The lazy database handle
//!
//! `LazyDb` owns the configuration, the script source and (once connected) the
//! SQLite connection. Connecting creates the database file when needed;
//! migrating backs it up first when a newer schema is about to be applied.

use crate::config::LazyDbConfig;
use crate::database::core::{DatabaseConn, ParamQuery};
use crate::database::migrate::{
    backup_to, current_version, largest_version, CurrentVersion, DirScriptSource, MigrateReport,
    MigrationFailure, MigrationOrchestrator, ScriptSource, SqliteMigrator,
};
use crate::error::{LazyDbError, Result};
use rusqlite::{Connection, Row};
use std::path::Path;
use tracing::{debug, info};

/// SQLite database with lazy connection, migration and automatic backup
pub struct LazyDb {
    config: LazyDbConfig,
    source: Box<dyn ScriptSource>,
    db: Option<DatabaseConn>,
}

impl LazyDb {
    /// Create a handle from a validated configuration.
    ///
    /// Scripts are read from the filesystem, with the script directory resolved
    /// against the working directory. Use [`LazyDb::with_source`] to read them
    /// from somewhere else.
    pub fn new(config: LazyDbConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source: Box::new(DirScriptSource::new(".")),
            db: None,
        })
    }

    /// Replace the script source
    pub fn with_source(mut self, source: impl ScriptSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn config(&self) -> &LazyDbConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.config.database_path)
    }

    /// Open the connection, creating the database file if it does not exist.
    ///
    /// Calling it again while connected keeps the existing connection.
    pub fn connect(&mut self) -> Result<()> {
        if self.db.is_some() {
            return Ok(());
        }

        let db = DatabaseConn::open(self.path())?;
        info!("connected to {}", self.config.database_path);
        self.db = Some(db);
        Ok(())
    }

    /// Close the connection. Does nothing when not connected.
    pub fn close(&mut self) -> Result<()> {
        match self.db.take() {
            Some(db) => db
                .conn
                .close()
                .map_err(|(_, e)| LazyDbError::sqlite("failed to close database", e)),
            None => Ok(()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.db.is_some()
    }

    /// The live connection, if any
    pub fn db(&self) -> Option<&Connection> {
        self.db.as_ref().map(|db| &db.conn)
    }

    fn conn(&self) -> Result<&DatabaseConn> {
        self.db.as_ref().ok_or(LazyDbError::NilDatabase)
    }

    /// Execute one statement through a prepared statement
    pub fn exec<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<usize> {
        self.conn()?.execute(sql, params)
    }

    /// Execute a batch of statements in one transaction; all or nothing
    pub fn exec_multiple(&self, queries: &[ParamQuery]) -> Result<Vec<usize>> {
        self.conn()?.execute_multiple(queries)
    }

    pub fn query_row<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<T>
    where
        P: rusqlite::Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.conn()?.query_row(sql, params, f)
    }

    pub fn query_map<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Vec<T>>
    where
        P: rusqlite::Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.conn()?.query_map(sql, params, f)
    }

    /// Migrate to the configured target version
    pub fn migrate(&self) -> std::result::Result<MigrateReport, MigrationFailure> {
        self.migrate_to(self.config.target_version)
    }

    /// Migrate to `version`, where 0 means the latest available script.
    ///
    /// When a backup directory is configured and the database is behind the
    /// latest script, the database file is copied there first and the copy's
    /// path is reported, also on failure.
    pub fn migrate_to(&self, version: u64) -> std::result::Result<MigrateReport, MigrationFailure> {
        let migrator = self
            .migrator()
            .and_then(|migrator| {
                // a backup copies the main file only
                if self.config.backup_enabled() {
                    self.conn()?.checkpoint()?;
                }
                Ok(migrator)
            })
            .map_err(|error| MigrationFailure {
                backup_path: None,
                error,
            })?;

        debug!("migrating {} to version {}", self.config.database_path, version);
        MigrationOrchestrator::new(
            self.path(),
            self.source.as_ref(),
            &self.config.script_directory,
            &self.config.backup_directory,
        )
        .migrate_to(&migrator, version)
    }

    fn migrator(&self) -> Result<SqliteMigrator<'_, dyn ScriptSource>> {
        let db = self.conn()?;
        if self.config.script_directory.is_empty() {
            return Err(LazyDbError::EmptyDirectory);
        }
        Ok(SqliteMigrator::new(
            db,
            self.source.as_ref(),
            &self.config.script_directory,
        ))
    }

    /// Applied schema version of the connected database
    pub fn current_version(&self) -> Result<CurrentVersion> {
        current_version(&self.migrator()?)
    }

    /// Highest version offered by the script source right now
    pub fn latest_version(&self) -> Result<u64> {
        if self.config.script_directory.is_empty() {
            return Err(LazyDbError::EmptyDirectory);
        }
        largest_version(self.source.as_ref(), &self.config.script_directory)
    }

    /// Copy the database file to `dest`, ignoring the backup directory setting.
    ///
    /// When connected, pending WAL pages are checkpointed into the file first.
    pub fn backup_to(&self, dest: impl AsRef<Path>) -> Result<u64> {
        if let Some(db) = &self.db {
            db.checkpoint()?;
        }
        backup_to(self.path(), dest.as_ref())
    }
}

impl Drop for LazyDb {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!("error closing database: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migrate::fixtures::{schema_v2, schema_v3, SCHEMA_DIR};
    use crate::database::migrate::MemoryScriptSource;
    use rusqlite::types::Value;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn config(path: &Path, backup_dir: &str, target_version: u64) -> LazyDbConfig {
        LazyDbConfig {
            database_path: path.to_string_lossy().to_string(),
            script_directory: SCHEMA_DIR.to_string(),
            backup_directory: backup_dir.to_string(),
            target_version,
        }
    }

    fn open(config: LazyDbConfig, source: MemoryScriptSource) -> LazyDb {
        let mut db = LazyDb::new(config).unwrap().with_source(source);
        db.connect().unwrap();
        db
    }

    fn user_version(db: &LazyDb) -> i64 {
        db.query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap()
    }

    /// A database file migrated to version 2
    fn outdated_db(path: &Path) {
        let mut db = open(config(path, "", 0), schema_v2());
        let report = db.migrate().unwrap();
        assert_eq!(report.backup_path, None);
        db.close().unwrap();
    }

    #[test]
    fn test_new_validates_config() {
        let result = LazyDb::new(LazyDbConfig {
            database_path: String::new(),
            ..Default::default()
        });
        assert!(matches!(result, Err(LazyDbError::EmptyPath)));

        let result = LazyDb::new(LazyDbConfig {
            database_path: "data.txt".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(LazyDbError::InvalidExtension { .. })));
    }

    #[test]
    fn test_connect_and_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("test.db");
        let mut db = LazyDb::new(config(&path, "", 0)).unwrap();

        assert!(!db.is_connected());
        assert!(db.db().is_none());
        db.close().unwrap();

        db.connect().unwrap();
        assert!(db.is_connected());
        assert!(path.exists());
        db.connect().unwrap();

        db.close().unwrap();
        assert!(!db.is_connected());
        assert!(path.exists());
    }

    #[test]
    fn test_wrappers_need_connection() {
        let dir = tempdir().unwrap();
        let db = LazyDb::new(config(&dir.path().join("test.db"), "", 0)).unwrap();

        assert!(matches!(
            db.exec("SELECT 1", []),
            Err(LazyDbError::NilDatabase)
        ));
        assert!(matches!(
            db.exec_multiple(&[ParamQuery::new("SELECT 1", vec![])]),
            Err(LazyDbError::NilDatabase)
        ));
        assert!(matches!(
            db.current_version(),
            Err(LazyDbError::NilDatabase)
        ));
    }

    #[test]
    fn test_exec_wrappers() {
        let dir = tempdir().unwrap();
        let db = open(config(&dir.path().join("test.db"), "", 0), schema_v3());
        db.migrate().unwrap();

        db.exec(
            "INSERT INTO users (name, email) VALUES (?1, ?2)",
            ["alice", "alice@example.com"],
        )
        .unwrap();
        db.exec_multiple(&[
            ParamQuery::new(
                "INSERT INTO users (name) VALUES (?)",
                vec![Value::Text("bob".to_string())],
            ),
            ParamQuery::new(
                "UPDATE users SET email = ? WHERE name = ?",
                vec![
                    Value::Text("bob@example.com".to_string()),
                    Value::Text("bob".to_string()),
                ],
            ),
        ])
        .unwrap();

        let emails = db
            .query_map("SELECT email FROM users ORDER BY name", [], |row| {
                row.get::<_, String>(0)
            })
            .unwrap();
        assert_eq!(emails, vec!["alice@example.com", "bob@example.com"]);
    }

    #[test]
    fn test_migrate_to_latest() {
        let dir = tempdir().unwrap();
        let db = open(config(&dir.path().join("test.db"), "", 0), schema_v3());

        assert_eq!(db.current_version().unwrap(), CurrentVersion::New);
        db.migrate().unwrap();
        assert_eq!(user_version(&db), 3);

        // again: nothing to do, no error
        let report = db.migrate().unwrap();
        assert!(!report.changed());
        assert_eq!(user_version(&db), 3);
        assert_eq!(db.current_version().unwrap(), CurrentVersion::Recorded(3));
    }

    #[test]
    fn test_migrate_to_specific() {
        let dir = tempdir().unwrap();
        let cases: [(u64, bool, i64); 5] = [
            (1, false, 1),
            (2, false, 2),
            (3, false, 3),
            (0, false, 3),
            (4, true, 3),
        ];

        for (idx, (version, want_err, want_version)) in cases.into_iter().enumerate() {
            let path = dir.path().join(format!("test{}.db", idx));
            let db = open(config(&path, "", 3), schema_v3());
            db.migrate().unwrap();

            let result = db.migrate_to(version);
            assert_eq!(result.is_err(), want_err, "case {}", idx);
            assert_eq!(user_version(&db), want_version, "case {}", idx);
        }
    }

    #[test]
    fn test_invalid_migrate() {
        let dir = tempdir().unwrap();

        // empty script directory
        let mut cfg = config(&dir.path().join("empty_schema.db"), "", 0);
        cfg.script_directory = String::new();
        let db = open(cfg, schema_v3());
        assert!(matches!(
            db.migrate().map_err(|f| f.error),
            Err(LazyDbError::EmptyDirectory)
        ));

        // directory missing from the source
        let mut cfg = config(&dir.path().join("dir_not_found.db"), "", 1);
        cfg.script_directory = "no_no_no".to_string();
        let db = open(cfg, schema_v3());
        assert!(db.migrate().is_err());

        // not connected
        let db = LazyDb::new(config(&dir.path().join("no_connect.db"), "", 1))
            .unwrap()
            .with_source(schema_v3());
        assert!(matches!(
            db.migrate().map_err(|f| f.error),
            Err(LazyDbError::NilDatabase)
        ));
    }

    #[test]
    fn test_auto_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backupTest.db");
        outdated_db(&path);
        let before = fs::read(&path).unwrap();

        let backup_dir = dir.path().join("bk");
        let db = open(
            config(&path, backup_dir.to_str().unwrap(), 0),
            schema_v3(),
        );
        let report = db.migrate().unwrap();

        let backup: PathBuf = report.backup_path.unwrap();
        assert!(backup.exists());
        assert_eq!(fs::read(&backup).unwrap(), before);
        assert_eq!(user_version(&db), 3);
    }

    #[test]
    fn test_auto_backup_no_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.db");
        outdated_db(&path);

        let db = open(config(&path, "", 0), schema_v3());
        let report = db.migrate().unwrap();
        assert_eq!(report.backup_path, None);
        assert_eq!(user_version(&db), 3);
    }

    #[test]
    fn test_no_backup_for_new_db() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.db");
        let backup_dir = dir.path().join("bk");

        let db = open(
            config(&path, backup_dir.to_str().unwrap(), 0),
            schema_v3(),
        );
        let report = db.migrate().unwrap();
        assert_eq!(report.backup_path, None);
        assert!(!backup_dir.exists());
    }

    #[test]
    fn test_backup_then_failed_migration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.db");
        outdated_db(&path);

        let backup_dir = dir.path().join("bk");
        let db = open(
            config(&path, backup_dir.to_str().unwrap(), 0),
            schema_v3(),
        );
        let failure = db.migrate_to(9).unwrap_err();

        assert!(matches!(failure.error, LazyDbError::UnknownVersion(9)));
        assert!(failure.backup_path.unwrap().exists());
        assert_eq!(user_version(&db), 2);
    }

    #[test]
    fn test_backup_to() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.db");
        let db = open(config(&path, "", 0), schema_v3());
        db.migrate().unwrap();

        let dest = dir.path().join("manual").join("copy.db");
        db.backup_to(&dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), fs::read(&path).unwrap());

        assert!(matches!(
            db.backup_to(dir.path().join("copy.txt")),
            Err(LazyDbError::InvalidExtension { .. })
        ));
    }

    #[test]
    fn test_current_version_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE notes (body TEXT)", []).unwrap();
        }
        let before = fs::read(&path).unwrap();

        let mut db = open(config(&path, "", 0), schema_v3());
        assert_eq!(db.current_version().unwrap(), CurrentVersion::New);
        db.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_auto_backup_includes_wal_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.db");
        let backup_dir = dir.path().join("bk");

        let db = open(
            config(&path, backup_dir.to_str().unwrap(), 0),
            schema_v2(),
        );
        let mode: String = db
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
        db.migrate().unwrap();
        db.exec("INSERT INTO users (name) VALUES (?1)", ["alice"])
            .unwrap();

        // an idle second connection
        let reader = Connection::open(&path).unwrap();
        let live: i64 = reader
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(live, 1);

        let db = db.with_source(schema_v3());
        let report = db.migrate().unwrap();
        assert_eq!(user_version(&db), 3);

        let backup = Connection::open(report.backup_path.unwrap()).unwrap();
        let rows: i64 = backup
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
        let version: i64 = backup
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 2);
        drop(reader);
    }

    #[test]
    fn test_backup_to_includes_wal_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.db");
        let db = open(config(&path, "", 0), schema_v3());
        db.query_row("PRAGMA journal_mode=WAL", [], |row| row.get::<_, String>(0))
            .unwrap();
        db.migrate().unwrap();
        db.exec("INSERT INTO users (name) VALUES (?1)", ["bob"])
            .unwrap();

        let dest = dir.path().join("copy.db");
        db.backup_to(&dest).unwrap();

        let copy = Connection::open(&dest).unwrap();
        let name: String = copy
            .query_row("SELECT name FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "bob");
    }

    #[test]
    fn test_latest_version() {
        let dir = tempdir().unwrap();
        let db = LazyDb::new(config(&dir.path().join("data.db"), "", 0))
            .unwrap()
            .with_source(schema_v3());
        assert_eq!(db.latest_version().unwrap(), 3);
    }
}
