use anyhow::{anyhow, Result};
use clap::Args;
use lazydb::{LazyDb, LazyDbConfig};

use super::OutputFormat;

/// Arguments for the Migrate command
#[derive(Args)]
pub struct MigrateArgs {
    /// Target schema version, 0 for the latest script (default: from config)
    #[clap(short, long)]
    pub to: Option<u64>,

    /// Back up the database into this directory before migrating
    #[clap(short, long)]
    pub backup_dir: Option<String>,
}

pub fn run(config: &LazyDbConfig, args: MigrateArgs, output_format: OutputFormat) -> Result<()> {
    let MigrateArgs { to, backup_dir } = args;

    let mut config = config.clone();
    if let Some(dir) = backup_dir {
        config.backup_directory = dir;
    }
    let target = to.unwrap_or(config.target_version);

    let mut db = LazyDb::new(config)?;
    db.connect()?;

    match db.migrate_to(target) {
        Ok(report) => {
            if !output_format.print_json(&report)? {
                if let Some(path) = &report.backup_path {
                    println!("backup: {}", path.display());
                }
                if report.changed() {
                    println!("migrated {} -> {}", report.from, report.to);
                } else {
                    println!("no change, database at {}", report.to);
                }
            }
            db.close()?;
            Ok(())
        }
        Err(failure) => {
            if let Some(path) = &failure.backup_path {
                eprintln!("backup: {}", path.display());
            }
            Err(anyhow!("migration failed: {}", failure.error))
        }
    }
}
