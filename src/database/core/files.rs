//! Filesystem helpers for database files
//!
//! Creating an empty database file, checking for existence, and the byte-for-byte
//! copy used by backups.

use crate::error::{LazyDbError, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Extension (without the dot) every database and backup file must carry
pub const DATABASE_EXTENSION: &str = "db";

/// Check that `path` ends in `.db`
pub fn ensure_db_extension(path: &Path) -> Result<()> {
    match path.extension() {
        Some(ext) if ext == DATABASE_EXTENSION => Ok(()),
        _ => Err(LazyDbError::InvalidExtension {
            path: path.to_path_buf(),
        }),
    }
}

/// Create a new, empty database file without applying any schema.
///
/// Missing parent directories are created. An existing file is left untouched.
pub fn create_db_file(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(LazyDbError::EmptyPath);
    }

    ensure_db_extension(path)?;

    if is_file_exist(path) {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                LazyDbError::io(
                    format!("failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }
    }

    File::create(path).map_err(|e| {
        LazyDbError::io(
            format!("failed to create database file '{}'", path.display()),
            e,
        )
    })?;

    Ok(())
}

/// Whether something exists at `path`.
///
/// Any error other than "not found" (e.g. permission denied) also reports `false`.
pub fn is_file_exist(path: impl AsRef<Path>) -> bool {
    fs::metadata(path).is_ok()
}

/// Copy `src` to `dst` byte for byte, returning the number of bytes copied.
///
/// `src` must be a regular file; symlinks are rejected rather than followed.
/// The copy writes straight into `dst`, so an interrupted copy leaves a partial file.
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64> {
    let stat = fs::symlink_metadata(src)
        .map_err(|e| LazyDbError::io(format!("failed to stat '{}'", src.display()), e))?;

    if !stat.file_type().is_file() {
        return Err(LazyDbError::NotRegularFile {
            path: src.to_path_buf(),
        });
    }

    let mut src_file = File::open(src)
        .map_err(|e| LazyDbError::io(format!("failed to open '{}'", src.display()), e))?;
    let mut dst_file = File::create(dst)
        .map_err(|e| LazyDbError::io(format!("failed to create '{}'", dst.display()), e))?;

    io::copy(&mut src_file, &mut dst_file).map_err(|e| {
        LazyDbError::io(
            format!("failed to copy '{}' to '{}'", src.display(), dst.display()),
            e,
        )
    })
}
