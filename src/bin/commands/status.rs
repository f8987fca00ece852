use anyhow::Result;
use chrono::{DateTime, Local};
use lazydb::{CurrentVersion, LazyDb, LazyDbConfig};
use serde::Serialize;
use std::path::Path;

use super::OutputFormat;

#[derive(Debug, Serialize)]
struct StatusInfo {
    database_path: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<CurrentVersion>,
    latest_version: u64,
    pending: bool,
}

pub fn run(config: &LazyDbConfig, output_format: OutputFormat) -> Result<()> {
    let db = LazyDb::new(config.clone())?;
    let latest_version = db.latest_version()?;

    let path = Path::new(&config.database_path);
    let metadata = std::fs::metadata(path).ok();
    let modified = metadata
        .as_ref()
        .and_then(|m| m.modified().ok())
        .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string());

    // only open existing files, connecting would create an empty database
    let current = if metadata.is_some() {
        let mut db = db;
        db.connect()?;
        let current = db.current_version()?;
        db.close()?;
        Some(current)
    } else {
        None
    };

    let pending = match current {
        Some(CurrentVersion::Recorded(v)) => v < latest_version,
        _ => latest_version > 0,
    };

    let info = StatusInfo {
        database_path: config.database_path.clone(),
        exists: metadata.is_some(),
        size_bytes: metadata.as_ref().map(|m| m.len()),
        modified,
        current,
        latest_version,
        pending,
    };

    if output_format.print_json(&info)? {
        return Ok(());
    }

    println!("Database:        {}", info.database_path);
    match (&info.size_bytes, &info.modified) {
        (Some(size), Some(modified)) => {
            println!("Size:            {} bytes (modified {})", size, modified)
        }
        (Some(size), None) => println!("Size:            {} bytes", size),
        _ => println!("Size:            (not created)"),
    }
    match info.current {
        Some(current) => println!("Current version: {}", current),
        None => println!("Current version: -"),
    }
    println!("Latest version:  v{}", info.latest_version);
    if info.pending {
        println!("Run `lazydb migrate` to apply pending scripts.");
    }
    Ok(())
}
