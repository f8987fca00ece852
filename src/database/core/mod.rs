//! Core database infrastructure
//!
//! - `DatabaseConn`: SQLite connection wrapper with configuration and statement helpers
//! - `ParamQuery`: a statement plus positional arguments
//! - `files`: database file creation, existence checks and byte copies

mod connection;
pub mod files;

pub use connection::{DatabaseConn, ParamQuery};
pub use files::{create_db_file, is_file_exist, DATABASE_EXTENSION};
