//! Script fixtures shared by the migration tests.
//!
//! Every up script also sets `PRAGMA user_version` so tests can check which
//! scripts actually ran.

use crate::database::core::DatabaseConn;
use crate::database::migrate::source::MemoryScriptSource;
use tempfile::{tempdir, TempDir};

pub const SCHEMA_DIR: &str = "schema";

const V1_UP: &str =
    "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT); PRAGMA user_version = 1;";
const V1_DOWN: &str = "DROP TABLE users; PRAGMA user_version = 0;";
const V2_UP: &str = "ALTER TABLE users ADD COLUMN email TEXT; PRAGMA user_version = 2;";
const V2_DOWN: &str = "ALTER TABLE users DROP COLUMN email; PRAGMA user_version = 1;";
const V3_UP: &str = "CREATE INDEX idx_users_name ON users(name); PRAGMA user_version = 3;";
const V3_DOWN: &str = "DROP INDEX idx_users_name; PRAGMA user_version = 2;";

/// Scripts for versions 1 and 2
pub fn schema_v2() -> MemoryScriptSource {
    MemoryScriptSource::from_files([
        ("schema/1_init.up.sql", V1_UP),
        ("schema/1_init.down.sql", V1_DOWN),
        ("schema/2_add_email.up.sql", V2_UP),
        ("schema/2_add_email.down.sql", V2_DOWN),
    ])
}

/// Scripts for versions 1 to 3, plus an unrelated file
pub fn schema_v3() -> MemoryScriptSource {
    schema_v2()
        .with_file("schema/3_index.up.sql", V3_UP)
        .with_file("schema/3_index.down.sql", V3_DOWN)
        .with_file("schema/README.md", "not a migration")
}

/// Fresh database file inside a temporary directory; keep the directory alive
pub fn temp_db() -> (TempDir, DatabaseConn) {
    let dir = tempdir().unwrap();
    let db = DatabaseConn::open(&dir.path().join("test.db")).unwrap();
    (dir, db)
}
