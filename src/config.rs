use crate::database::core::files::ensure_db_extension;
use crate::error::{LazyDbError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default database file, relative to the working directory
pub const DEFAULT_DATABASE_PATH: &str = "data.db";

/// Default directory holding the migration scripts
pub const DEFAULT_SCRIPT_DIRECTORY: &str = "schema";

/// Target version meaning "highest available"
pub const LATEST_VERSION: u64 = 0;

/// Configuration file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "lazydb.toml";

/// Prefix of environment overrides, e.g. `LAZYDB_BACKUP_DIRECTORY=bk`
pub const ENV_PREFIX: &str = "LAZYDB";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LazyDbConfig {
    /// Path of the `.db` file
    pub database_path: String,

    /// Directory of the migration scripts inside the script source
    pub script_directory: String,

    /// Directory for pre-migration backups; empty disables backups
    pub backup_directory: String,

    /// Schema version `migrate` moves to; 0 means latest
    pub target_version: u64,
}

const EMPTY_CONFIG: &str = r#"### lazydb configuration file

### path of the sqlite database file (must end in .db)
# database_path = "data.db"

### directory containing the {version}_{title}.up.sql / .down.sql scripts
# script_directory = "schema"

### directory for automatic backups before migrations, empty to disable
# backup_directory = ""

### schema version to migrate to, 0 for the latest available
# target_version = 0
"#;

impl Default for LazyDbConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            script_directory: DEFAULT_SCRIPT_DIRECTORY.to_string(),
            backup_directory: String::new(),
            target_version: LATEST_VERSION,
        }
    }
}

impl LazyDbConfig {
    /// Load configuration from a TOML file and `LAZYDB_*` environment variables.
    ///
    /// With an explicit `path` that does not exist yet, a commented template is
    /// written there first. Without a path, `./lazydb.toml` is read when present.
    pub fn new(path: &Option<String>) -> Result<LazyDbConfig> {
        let file = match path {
            Some(p) => {
                if !Path::new(p).exists() {
                    std::fs::write(p, EMPTY_CONFIG).map_err(|e| {
                        LazyDbError::io(format!("unable to create config file {}", p), e)
                    })?;
                }
                Some(p.clone())
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Some(DEFAULT_CONFIG_FILE.to_string())
            }
            None => None,
        };

        Self::load(file.as_deref(), ENV_PREFIX)
    }

    fn load(file: Option<&str>, env_prefix: &str) -> Result<LazyDbConfig> {
        let mut builder = Config::builder();

        if let Some(file) = file {
            builder = builder.add_source(File::new(file, FileFormat::Toml));
        }

        // E.g., `LAZYDB_TARGET_VERSION=3 lazydb migrate` pins the schema version
        builder = builder.add_source(Environment::with_prefix(env_prefix).try_parsing(true));

        let settings = builder
            .build()
            .map_err(|e| LazyDbError::Config(format!("failed to build configuration: {}", e)))?;

        let config: LazyDbConfig = settings.try_deserialize().map_err(|e| {
            LazyDbError::Config(format!("failed to deserialize configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check the database path: non-empty and ending in `.db`.
    ///
    /// An empty script directory is accepted here; it only fails once a
    /// migration is attempted.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.is_empty() {
            return Err(LazyDbError::EmptyPath);
        }
        ensure_db_extension(Path::new(&self.database_path))
    }

    pub fn backup_enabled(&self) -> bool {
        !self.backup_directory.is_empty()
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let backup = if self.backup_enabled() {
            self.backup_directory.as_str()
        } else {
            "(disabled)"
        };
        let target = match self.target_version {
            LATEST_VERSION => "latest".to_string(),
            v => v.to_string(),
        };

        [
            format!("Database Path:      {}", self.database_path),
            format!("Script Directory:   {}", self.script_directory),
            format!("Backup Directory:   {}", backup),
            format!("Target Version:     {}", target),
        ]
        .join("\n")
    }
}
