//! Migration-state boundary and schema version probe

use crate::error::{LazyDbError, Result};
use serde::Serialize;
use std::fmt;

/// Where a migration should end up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The highest version the script source offers right now
    Latest,
    /// Exactly this version, migrating up or down as needed
    Version(u64),
}

impl Target {
    /// Map a requested version to a target; `0` means latest
    pub fn from_requested(version: u64) -> Self {
        match version {
            0 => Target::Latest,
            v => Target::Version(v),
        }
    }
}

/// Recorded migration state of one database.
///
/// `version` fails with [`LazyDbError::NilVersion`] when nothing was ever
/// recorded, and `apply` fails with [`LazyDbError::NoChange`] when the database
/// already sits at the target.
pub trait MigrationState {
    /// Current `(version, dirty)` pair
    fn version(&self) -> Result<(u64, bool)>;

    /// Migrate to `target`, returning the version reached
    fn apply(&self, target: Target) -> Result<u64>;
}

/// Applied schema version, keeping "never migrated" apart from "version 0"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "version", rename_all = "lowercase")]
pub enum CurrentVersion {
    /// No version has been recorded yet
    New,
    /// Version recorded by an earlier migration
    Recorded(u64),
}

impl CurrentVersion {
    pub fn is_new(&self) -> bool {
        matches!(self, CurrentVersion::New)
    }

    /// Numeric version, 0 for a new database
    pub fn version(&self) -> u64 {
        match self {
            CurrentVersion::New => 0,
            CurrentVersion::Recorded(v) => *v,
        }
    }
}

impl fmt::Display for CurrentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrentVersion::New => write!(f, "new"),
            CurrentVersion::Recorded(v) => write!(f, "v{}", v),
        }
    }
}

/// Read the applied schema version of `state`.
///
/// The dirty flag is not consulted; the runner refuses to migrate a dirty
/// database on its own.
pub fn current_version<M: MigrationState + ?Sized>(state: &M) -> Result<CurrentVersion> {
    match state.version() {
        Ok((version, _dirty)) => Ok(CurrentVersion::Recorded(version)),
        Err(LazyDbError::NilVersion) => Ok(CurrentVersion::New),
        Err(e) => Err(e),
    }
}
