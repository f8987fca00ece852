//! Database connection management
//!
//! This module provides the SQLite connection wrapper used by [`crate::LazyDb`],
//! together with the statement helpers built on top of it.

use crate::database::core::files::create_db_file;
use crate::error::{LazyDbError, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::path::Path;

/// Core database connection wrapper
///
/// `DatabaseConn` provides a thin wrapper around a file-backed SQLite
/// connection with consistent configuration and error handling.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open the database file at `path`, creating it (and its parent
    /// directories) first when it does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        create_db_file(path)?;

        let conn = Connection::open(path).map_err(|e| {
            LazyDbError::sqlite(format!("failed to open database at '{}'", path.display()), e)
        })?;

        let db = DatabaseConn { conn };
        db.configure()?;
        db.ping()?;
        Ok(db)
    }

    /// Configure the connection.
    ///
    /// The journal mode is left as stored in the file. New files use the
    /// rollback journal; files already switched to WAL stay in WAL.
    fn configure(&self) -> Result<()> {
        self.conn
            .execute("PRAGMA foreign_keys=ON", [])
            .map_err(|e| LazyDbError::sqlite("failed to enable foreign keys", e))?;

        // Store temp tables in memory
        self.conn
            .execute("PRAGMA temp_store=MEMORY", [])
            .map_err(|e| LazyDbError::sqlite("failed to set temp store", e))?;

        Ok(())
    }

    /// Round-trip a trivial query to make sure the file is a usable database
    pub fn ping(&self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| LazyDbError::sqlite("failed to ping database", e))
    }

    /// Move every committed change into the main database file.
    ///
    /// Rollback-journal databases are already complete and report no frames.
    /// In WAL mode the log is checkpointed and truncated; readers holding it
    /// open make this fail with [`LazyDbError::CheckpointBusy`].
    pub fn checkpoint(&self) -> Result<()> {
        let (busy, log, checkpointed): (i64, i64, i64) = self
            .conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(|e| LazyDbError::sqlite("failed to checkpoint database", e))?;

        if busy != 0 {
            return Err(LazyDbError::CheckpointBusy { log, checkpointed });
        }
        Ok(())
    }

    /// Execute a single statement through a prepared statement
    pub fn execute<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| LazyDbError::sqlite(format!("failed to prepare '{}'", sql), e))?;
        stmt.execute(params)
            .map_err(|e| LazyDbError::sqlite(format!("failed to exec '{}'", sql), e))
    }

    /// Execute every query in `queries` inside one transaction.
    ///
    /// Any failure rolls the whole batch back; the affected row counts are
    /// returned only when all statements succeeded.
    pub fn execute_multiple(&self, queries: &[ParamQuery]) -> Result<Vec<usize>> {
        if queries.is_empty() {
            return Err(LazyDbError::EmptyStatement);
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| LazyDbError::sqlite("failed to begin transaction", e))?;

        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            let mut stmt = tx.prepare(&query.query).map_err(|e| {
                LazyDbError::sqlite(format!("failed to prepare '{}'", query.query), e)
            })?;
            let changed = stmt
                .execute(params_from_iter(query.args.iter()))
                .map_err(|e| LazyDbError::sqlite(format!("failed to exec '{}'", query.filled()), e))?;
            results.push(changed);
        }

        tx.commit()
            .map_err(|e| LazyDbError::sqlite("failed to commit transaction", e))?;

        Ok(results)
    }

    /// Run a query expected to return exactly one row
    pub fn query_row<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<T>
    where
        P: rusqlite::Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| LazyDbError::sqlite(format!("failed to prepare '{}'", sql), e))?;
        stmt.query_row(params, f)
            .map_err(|e| LazyDbError::sqlite(format!("failed to query '{}'", sql), e))
    }

    /// Run a query and map every returned row
    pub fn query_map<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Vec<T>>
    where
        P: rusqlite::Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| LazyDbError::sqlite(format!("failed to prepare '{}'", sql), e))?;
        let rows = stmt
            .query_map(params, f)
            .map_err(|e| LazyDbError::sqlite(format!("failed to query '{}'", sql), e))?;
        rows.collect::<rusqlite::Result<Vec<T>>>()
            .map_err(|e| LazyDbError::sqlite(format!("failed to read rows of '{}'", sql), e))
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i64 = self.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// A statement and its positional arguments, executed as a prepared statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamQuery {
    pub query: String,
    pub args: Vec<Value>,
}

impl ParamQuery {
    pub fn new(query: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            query: query.into(),
            args,
        }
    }

    /// Render the statement with every `?` replaced by its argument.
    ///
    /// Meant for logs and error messages only; never execute the result.
    pub fn filled(&self) -> String {
        let mut filled = String::with_capacity(self.query.len());
        let mut args = self.args.iter();
        for c in self.query.chars() {
            if c != '?' {
                filled.push(c);
                continue;
            }
            match args.next() {
                Some(arg) => filled.push_str(&render_value(arg)),
                None => filled.push(c),
            }
        }
        filled
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => format!("\"{}\"", s),
        Value::Blob(b) => {
            let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
            format!("X'{}'", hex)
        }
    }
}
