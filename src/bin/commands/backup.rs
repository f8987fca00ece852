use anyhow::Result;
use clap::Args;
use lazydb::{LazyDb, LazyDbConfig};
use serde::Serialize;
use std::path::PathBuf;

use super::OutputFormat;

/// Arguments for the Backup command
#[derive(Args)]
pub struct BackupArgs {
    /// Destination file, must end in .db
    #[clap(name = "DEST")]
    pub dest: PathBuf,
}

#[derive(Debug, Serialize)]
struct BackupInfo {
    source: String,
    dest: String,
    size_bytes: u64,
}

pub fn run(config: &LazyDbConfig, args: BackupArgs, output_format: OutputFormat) -> Result<()> {
    let mut db = LazyDb::new(config.clone())?;
    // connect only to checkpoint an existing file, never to create one
    if db.path().exists() {
        db.connect()?;
    }
    let size_bytes = db.backup_to(&args.dest)?;
    db.close()?;

    let info = BackupInfo {
        source: config.database_path.clone(),
        dest: args.dest.to_string_lossy().to_string(),
        size_bytes,
    };
    if !output_format.print_json(&info)? {
        println!(
            "copied {} to {} ({} bytes)",
            info.source, info.dest, info.size_bytes
        );
    }
    Ok(())
}
