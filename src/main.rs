//! Binary entry point: read the configuration, start file logging, open the
//! library database and hand control to the menu until the user exits.
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use reading_statistics::config::default_config_path;
use reading_statistics::{build_app, db, logging, run_app, Config};

/// Track books, series, authors and reading statistics in SQLite.
#[derive(Parser, Debug)]
#[command(name = "reading-statistics", version, about, long_about = None)]
struct Cli {
    /// Path to config.toml (default: ~/.reading-statistics/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    logging::init(&config)?;

    let conn = db::open(&config.database_path()?)?;
    let mut app = build_app(conn, config)?;
    run_app(&mut app)
}
