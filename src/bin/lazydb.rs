use clap::{Parser, Subcommand};
use lazydb::LazyDbConfig;
use tracing::Level;

mod commands;

use commands::backup::BackupArgs;
use commands::migrate::MigrateArgs;
use commands::OutputFormat;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default ./lazydb.toml is used if present
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: text (default), json, json-pretty
    #[clap(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate the database schema, backing up the file first when it is behind.
    Migrate(MigrateArgs),

    /// Copy the database file to a destination.
    Backup(BackupArgs),

    /// Show current and latest schema versions.
    Status,

    /// Show the effective configuration.
    Config,
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // show info, warn and error events
            .with_max_level(Level::INFO)
            .init();
    }

    let config = match LazyDbConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Migrate(args) => commands::migrate::run(&config, args, cli.format),
        Commands::Backup(args) => commands::backup::run(&config, args, cli.format),
        Commands::Status => commands::status::run(&config, cli.format),
        Commands::Config => commands::config::run(&config, cli.format),
    };

    if let Err(e) = result {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(1);
    }
}
