//! SQLite script runner
//!
//! Applies `{version}_{title}.up.sql` / `{version}_{title}.down.sql` scripts from a
//! [`ScriptSource`] and records progress in a single-row `schema_migrations`
//! table, created by the first migration step:
//!
//! ```text
//! schema_migrations (version INTEGER NOT NULL, dirty INTEGER NOT NULL)
//! ```
//!
//! Every step first records the version it is moving to as dirty, runs the script
//! in its own transaction, then clears the dirty flag. A script that fails leaves
//! the flag set and further migrations are refused until it is repaired.

use crate::database::core::DatabaseConn;
use crate::database::migrate::probe::{MigrationState, Target};
use crate::database::migrate::source::{ScriptEntry, ScriptSource};
use crate::error::{LazyDbError, Result};
use rusqlite::OptionalExtension;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Name of the bookkeeping table
pub const MIGRATIONS_TABLE: &str = "schema_migrations";

const UP_SUFFIX: &str = ".up.sql";
const DOWN_SUFFIX: &str = ".down.sql";

/// Up and down script names of one version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptPair {
    pub up: Option<String>,
    pub down: Option<String>,
}

/// Runs migration scripts against one connection
pub struct SqliteMigrator<'a, S: ScriptSource + ?Sized> {
    db: &'a DatabaseConn,
    source: &'a S,
    directory: &'a str,
}

impl<'a, S: ScriptSource + ?Sized> SqliteMigrator<'a, S> {
    /// Create a runner. Nothing is written until a migration step runs.
    pub fn new(db: &'a DatabaseConn, source: &'a S, directory: &'a str) -> Self {
        Self {
            db,
            source,
            directory,
        }
    }

    /// All scripts of the source directory, keyed by version
    pub fn scripts(&self) -> Result<BTreeMap<u64, ScriptPair>> {
        let mut scripts: BTreeMap<u64, ScriptPair> = BTreeMap::new();

        for entry in self.source.entries(self.directory)? {
            if entry.is_dir {
                return Err(LazyDbError::InvalidDirectoryStructure {
                    directory: self.directory.to_string(),
                    entry: entry.name,
                });
            }

            let Some(script) = ScriptEntry::parse(&entry.name) else {
                continue;
            };
            let pair = scripts.entry(script.version).or_default();
            let slot = if script.name.ends_with(UP_SUFFIX) {
                &mut pair.up
            } else if script.name.ends_with(DOWN_SUFFIX) {
                &mut pair.down
            } else {
                continue;
            };

            if slot.is_some() {
                return Err(LazyDbError::DuplicateScript {
                    version: script.version,
                    name: script.name,
                });
            }
            *slot = Some(script.name);
        }

        // versions that only had unrelated files are not migrations
        scripts.retain(|_, pair| pair.up.is_some() || pair.down.is_some());
        Ok(scripts)
    }

    /// Recorded `(version, dirty)`, `None` when nothing has been recorded.
    ///
    /// Read-only: a database that was never migrated has no bookkeeping table
    /// and is left without one.
    pub fn recorded_version(&self) -> Result<Option<(u64, bool)>> {
        if !self.db.table_exists(MIGRATIONS_TABLE)? {
            return Ok(None);
        }

        self.db
            .conn
            .query_row(
                &format!("SELECT version, dirty FROM {} LIMIT 1", MIGRATIONS_TABLE),
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, bool>(1)?)),
            )
            .optional()
            .map(|row| row.map(|(version, dirty)| (version as u64, dirty)))
            .map_err(|e| LazyDbError::sqlite("failed to read migration version", e))
    }

    fn set_version(&self, version: Option<u64>, dirty: bool) -> Result<()> {
        let tx = self
            .db
            .conn
            .unchecked_transaction()
            .map_err(|e| LazyDbError::sqlite("failed to begin transaction", e))?;

        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (version INTEGER NOT NULL, dirty INTEGER NOT NULL);
             CREATE UNIQUE INDEX IF NOT EXISTS {table}_version_unique ON {table} (version);",
            table = MIGRATIONS_TABLE
        ))
        .map_err(|e| LazyDbError::sqlite("failed to create migrations table", e))?;

        tx.execute(&format!("DELETE FROM {}", MIGRATIONS_TABLE), [])
            .map_err(|e| LazyDbError::sqlite("failed to clear migration version", e))?;

        if let Some(version) = version {
            tx.execute(
                &format!(
                    "INSERT INTO {} (version, dirty) VALUES (?1, ?2)",
                    MIGRATIONS_TABLE
                ),
                rusqlite::params![version as i64, dirty],
            )
            .map_err(|e| LazyDbError::sqlite("failed to record migration version", e))?;
        }

        tx.commit()
            .map_err(|e| LazyDbError::sqlite("failed to commit migration version", e))
    }

    fn run_script(&self, version: u64, name: &str) -> Result<()> {
        let body = self.source.read(self.directory, name)?;

        let tx = self
            .db
            .conn
            .unchecked_transaction()
            .map_err(|e| LazyDbError::sqlite("failed to begin transaction", e))?;
        tx.execute_batch(&body)
            .map_err(|source| LazyDbError::Script { version, source })?;
        tx.commit()
            .map_err(|source| LazyDbError::Script { version, source })
    }

    /// Record `after` as dirty, run the script (if any), then mark it clean
    fn step(&self, version: u64, script: Option<&String>, after: Option<u64>) -> Result<()> {
        self.set_version(after, true)?;
        if let Some(name) = script {
            debug!("running migration script {}", name);
            self.run_script(version, name)?;
        }
        self.set_version(after, false)
    }
}

impl<S: ScriptSource + ?Sized> MigrationState for SqliteMigrator<'_, S> {
    fn version(&self) -> Result<(u64, bool)> {
        self.recorded_version()?.ok_or(LazyDbError::NilVersion)
    }

    fn apply(&self, target: Target) -> Result<u64> {
        let scripts = self.scripts()?;

        let current = match self.recorded_version()? {
            Some((version, true)) => return Err(LazyDbError::Dirty(version)),
            Some((version, false)) => Some(version),
            None => None,
        };

        let target_version = match target {
            Target::Latest => match scripts.keys().next_back() {
                Some(v) => *v,
                None => return Err(LazyDbError::NoChange),
            },
            Target::Version(v) if scripts.contains_key(&v) => v,
            Target::Version(v) => return Err(LazyDbError::UnknownVersion(v)),
        };

        if let Some(c) = current {
            if !scripts.contains_key(&c) {
                return Err(LazyDbError::UnknownVersion(c));
            }
            if c == target_version {
                return Err(LazyDbError::NoChange);
            }
        }

        match current {
            Some(c) if c > target_version => {
                let steps: Vec<u64> = scripts
                    .range(target_version + 1..=c)
                    .rev()
                    .map(|(v, _)| *v)
                    .collect();
                for version in steps {
                    let after = scripts.range(..version).next_back().map(|(v, _)| *v);
                    self.step(version, scripts[&version].down.as_ref(), after)?;
                }
            }
            _ => {
                let lower = current.map(|c| c + 1).unwrap_or(0);
                for (version, pair) in scripts.range(lower..=target_version) {
                    self.step(*version, pair.up.as_ref(), Some(*version))?;
                }
            }
        }

        info!(
            "migrated schema from {} to {}",
            current
                .map(|c| c.to_string())
                .unwrap_or_else(|| "nil".to_string()),
            target_version
        );
        Ok(target_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migrate::fixtures::{schema_v3 as fixture, temp_db};
    use crate::database::migrate::source::MemoryScriptSource;

    fn user_version(db: &DatabaseConn) -> i64 {
        db.conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_scripts() {
        let (_dir, db) = temp_db();
        let source = fixture();
        let migrator = SqliteMigrator::new(&db, &source, "schema");

        let scripts = migrator.scripts().unwrap();
        assert_eq!(scripts.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(scripts[&2].up.as_deref(), Some("2_add_email.up.sql"));
        assert_eq!(scripts[&2].down.as_deref(), Some("2_add_email.down.sql"));
    }

    #[test]
    fn test_duplicate_script() {
        let (_dir, db) = temp_db();
        let source = MemoryScriptSource::from_files([
            ("schema/1_a.up.sql", ""),
            ("schema/1_b.up.sql", ""),
        ]);
        let migrator = SqliteMigrator::new(&db, &source, "schema");
        assert!(matches!(
            migrator.apply(Target::Latest),
            Err(LazyDbError::DuplicateScript { version: 1, .. })
        ));
    }

    #[test]
    fn test_version_read_is_read_only() {
        let (_dir, db) = temp_db();
        let source = fixture();
        let migrator = SqliteMigrator::new(&db, &source, "schema");

        assert_eq!(migrator.recorded_version().unwrap(), None);
        assert!(matches!(migrator.version(), Err(LazyDbError::NilVersion)));
        assert!(!db.table_exists(MIGRATIONS_TABLE).unwrap());

        migrator.apply(Target::Version(1)).unwrap();
        assert!(db.table_exists(MIGRATIONS_TABLE).unwrap());
        assert_eq!(migrator.recorded_version().unwrap(), Some((1, false)));
    }

    #[test]
    fn test_up_to_latest() {
        let (_dir, db) = temp_db();
        let source = fixture();
        let migrator = SqliteMigrator::new(&db, &source, "schema");

        assert!(matches!(migrator.version(), Err(LazyDbError::NilVersion)));

        assert_eq!(migrator.apply(Target::Latest).unwrap(), 3);
        assert_eq!(migrator.version().unwrap(), (3, false));
        assert_eq!(user_version(&db), 3);

        assert!(matches!(
            migrator.apply(Target::Latest),
            Err(LazyDbError::NoChange)
        ));
    }

    #[test]
    fn test_up_and_down_to_version() {
        let (_dir, db) = temp_db();
        let source = fixture();
        let migrator = SqliteMigrator::new(&db, &source, "schema");

        assert_eq!(migrator.apply(Target::Version(2)).unwrap(), 2);
        assert_eq!(user_version(&db), 2);

        assert_eq!(migrator.apply(Target::Version(3)).unwrap(), 3);
        assert_eq!(user_version(&db), 3);

        assert_eq!(migrator.apply(Target::Version(1)).unwrap(), 1);
        assert_eq!(user_version(&db), 1);
        assert_eq!(migrator.version().unwrap(), (1, false));

        assert!(matches!(
            migrator.apply(Target::Version(1)),
            Err(LazyDbError::NoChange)
        ));
    }

    #[test]
    fn test_unknown_version() {
        let (_dir, db) = temp_db();
        let source = fixture();
        let migrator = SqliteMigrator::new(&db, &source, "schema");

        assert!(matches!(
            migrator.apply(Target::Version(4)),
            Err(LazyDbError::UnknownVersion(4))
        ));
        assert!(matches!(migrator.version(), Err(LazyDbError::NilVersion)));
        assert!(!db.table_exists(MIGRATIONS_TABLE).unwrap());
    }

    #[test]
    fn test_failed_script_leaves_dirty() {
        let (_dir, db) = temp_db();
        let source =
            fixture().with_file("schema/4_broken.up.sql", "CREATE TABLE users (id INTEGER);");
        let migrator = SqliteMigrator::new(&db, &source, "schema");

        let err = migrator.apply(Target::Latest).unwrap_err();
        assert!(matches!(err, LazyDbError::Script { version: 4, .. }));
        assert_eq!(migrator.version().unwrap(), (4, true));
        assert_eq!(user_version(&db), 3);

        assert!(matches!(
            migrator.apply(Target::Latest),
            Err(LazyDbError::Dirty(4))
        ));
    }

    #[test]
    fn test_empty_source() {
        let (_dir, db) = temp_db();
        let source = MemoryScriptSource::from_files([("schema/notes.txt", "")]);
        let migrator = SqliteMigrator::new(&db, &source, "schema");

        assert!(matches!(
            migrator.apply(Target::Latest),
            Err(LazyDbError::NoChange)
        ));
    }
}
