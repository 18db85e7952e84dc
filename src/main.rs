//! Tasklock server
//!
//! Personal task tracker: ordered to-do items with optional time locks,
//! exposed as a REST API over SQLite.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tasklock::cli::{Cli, Command};
use tasklock::config::Config;
use tasklock::db::Database;
use tasklock::logging::{LogTarget, init_logging};
use tasklock::server::start_server;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_target: LogTarget = cli.log.parse()?;
    init_logging(&log_target, cli.verbose)?;

    let (mut config, config_path) = Config::resolve(cli.config.as_deref())?;

    // Override from CLI arguments
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.clone();
    }
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match config_path {
        Some(path) => info!("Config: {:?}", path),
        None => info!("Config: built-in defaults"),
    }

    match cli.command {
        Some(Command::Schema) => print_schema(&config)?,
        Some(Command::Serve) | None => run_server(config).await?,
    }

    Ok(())
}

/// Open the database and print the migration version and task columns.
fn print_schema(config: &Config) -> Result<()> {
    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path)?;
    let report = db.schema_report()?;

    println!("database: {}", config.server.db_path.display());
    println!("sqlite: {}", report.sqlite_version);
    match report.migration_version {
        Some(v) => println!("migration: V{}", v),
        None => println!("migration: none"),
    }
    for column in &report.columns {
        println!(
            "  {:<14} {:<8} {}{}",
            column.name,
            column.data_type,
            if column.nullable { "NULL" } else { "NOT NULL" },
            column
                .default_value
                .as_deref()
                .map(|d| format!(" DEFAULT {}", d))
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// Run the HTTP server until Ctrl-C.
async fn run_server(config: Config) -> Result<()> {
    config.ensure_db_dir()?;

    info!("Starting tasklock v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {:?}", config.server.db_path);
    info!(
        "Task rules: allow_unlock={}, atomic_reorder={}",
        config.tasks.allow_unlock, config.tasks.atomic_reorder
    );

    let db = Arc::new(Database::open(&config.server.db_path)?);
    info!("Database initialized successfully");

    let handle = start_server(Arc::clone(&db), &config).await?;
    info!("Server ready on http://{}", handle.addr());

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }

    handle.shutdown().await;
    info!("Server stopped");
    Ok(())
}
