//! Versioned script sources
//!
//! A script source is any hierarchy that can list the entries of a directory and
//! read a file's contents. Migration scripts live flat in one directory and carry
//! a numeric version prefix, e.g. `3_add_index.up.sql`.

use crate::error::{LazyDbError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// One entry of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub name: String,
    pub is_dir: bool,
}

/// A version-tagged script name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    pub version: u64,
    pub name: String,
}

impl ScriptEntry {
    /// Parse the `^\d+_` prefix of `name`; `None` for names without one
    pub fn parse(name: &str) -> Option<ScriptEntry> {
        let digits = name.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || name.as_bytes().get(digits) != Some(&b'_') {
            return None;
        }
        let version = name[..digits].parse().ok()?;
        Some(ScriptEntry {
            version,
            name: name.to_string(),
        })
    }
}

/// Read access to a tree of schema scripts
pub trait ScriptSource {
    /// List the entries directly under `directory`
    fn entries(&self, directory: &str) -> Result<Vec<SourceEntry>>;

    /// Read the script `name` inside `directory`
    fn read(&self, directory: &str, name: &str) -> Result<String>;
}

impl<S: ScriptSource + ?Sized> ScriptSource for &S {
    fn entries(&self, directory: &str) -> Result<Vec<SourceEntry>> {
        (**self).entries(directory)
    }

    fn read(&self, directory: &str, name: &str) -> Result<String> {
        (**self).read(directory, name)
    }
}

impl<S: ScriptSource + ?Sized> ScriptSource for Box<S> {
    fn entries(&self, directory: &str) -> Result<Vec<SourceEntry>> {
        (**self).entries(directory)
    }

    fn read(&self, directory: &str, name: &str) -> Result<String> {
        (**self).read(directory, name)
    }
}

/// Largest script version found in `directory`.
///
/// Entries without a version prefix are skipped and an empty directory yields 0.
/// A nested directory is a structural error. Whether the versions form a valid
/// migration chain is not checked here.
pub fn largest_version<S: ScriptSource + ?Sized>(source: &S, directory: &str) -> Result<u64> {
    let mut max_version = 0;

    for entry in source.entries(directory)? {
        if entry.is_dir {
            return Err(LazyDbError::InvalidDirectoryStructure {
                directory: directory.to_string(),
                entry: entry.name,
            });
        }

        if let Some(script) = ScriptEntry::parse(&entry.name) {
            max_version = max_version.max(script.version);
        }
    }

    Ok(max_version)
}

/// Scripts stored on disk under a root directory
#[derive(Debug, Clone)]
pub struct DirScriptSource {
    root: PathBuf,
}

impl DirScriptSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

impl ScriptSource for DirScriptSource {
    fn entries(&self, directory: &str) -> Result<Vec<SourceEntry>> {
        let path = self.root.join(directory);
        let read_dir = fs::read_dir(&path).map_err(|e| {
            LazyDbError::io(format!("failed to list '{}'", path.display()), e)
        })?;

        let mut entries = Vec::new();
        for item in read_dir {
            let item = item.map_err(|e| {
                LazyDbError::io(format!("failed to read entry of '{}'", path.display()), e)
            })?;
            let file_type = item.file_type().map_err(|e| {
                LazyDbError::io(format!("failed to stat '{}'", item.path().display()), e)
            })?;
            entries.push(SourceEntry {
                name: item.file_name().to_string_lossy().to_string(),
                is_dir: file_type.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read(&self, directory: &str, name: &str) -> Result<String> {
        let path = self.root.join(directory).join(name);
        fs::read_to_string(&path)
            .map_err(|e| LazyDbError::io(format!("failed to read '{}'", path.display()), e))
    }
}

/// Scripts held in memory, keyed by `/`-separated path.
///
/// Useful for test fixtures and for scripts compiled into the binary with
/// `include_str!`.
#[derive(Debug, Clone, Default)]
pub struct MemoryScriptSource {
    files: BTreeMap<String, String>,
}

impl MemoryScriptSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the file at `path`
    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.files
            .insert(path.trim_matches('/').to_string(), contents.to_string());
        self
    }

    /// Build a source from `(path, contents)` pairs
    pub fn from_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        files
            .into_iter()
            .fold(Self::new(), |source, (path, contents)| {
                source.with_file(path, contents)
            })
    }
}

impl ScriptSource for MemoryScriptSource {
    fn entries(&self, directory: &str) -> Result<Vec<SourceEntry>> {
        let prefix = format!("{}/", directory.trim_matches('/'));

        // BTreeMap keeps both the file paths and the derived entries ordered
        let mut entries: BTreeMap<&str, bool> = BTreeMap::new();
        for path in self.files.keys() {
            if let Some(rest) = path.strip_prefix(&prefix) {
                match rest.split_once('/') {
                    Some((dir, _)) => entries.insert(dir, true),
                    None => entries.insert(rest, false),
                };
            }
        }

        if entries.is_empty() {
            return Err(LazyDbError::io(
                format!("failed to list '{}'", directory),
                std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
            ));
        }

        Ok(entries
            .into_iter()
            .map(|(name, is_dir)| SourceEntry {
                name: name.to_string(),
                is_dir,
            })
            .collect())
    }

    fn read(&self, directory: &str, name: &str) -> Result<String> {
        let path = format!("{}/{}", directory.trim_matches('/'), name);
        self.files.get(&path).cloned().ok_or_else(|| {
            LazyDbError::io(
                format!("failed to read '{}'", path),
                std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            )
        })
    }
}
