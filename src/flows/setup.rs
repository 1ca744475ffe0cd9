//! One-shot maintenance flows: create the tables, create the reporting views
//! and bulk-load a library file. None of them prompt.

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use super::{begin, commit, ensure_tables, FlowResult, Outcome, Prompter};
use crate::db::{create_tables, create_views, load_library, CORE_TABLES};
use crate::error::FlowError;

/// Create any missing table, then confirm all four pass `check_tables`.
pub fn create_database(conn: &mut Connection) -> FlowResult {
    let tx = begin(conn)?;
    create_tables(&tx)?;
    commit(tx)?;
    ensure_tables(conn, &CORE_TABLES)?;
    info!("tables ready");
    Ok(Outcome::Applied("Tables created.".into()))
}

pub fn create_reporting_views(conn: &mut Connection, path: &Path) -> FlowResult {
    ensure_tables(conn, &CORE_TABLES)?;
    let tx = begin(conn)?;
    let count = create_views(&tx, path).map_err(FlowError::Import)?;
    commit(tx)?;
    Ok(Outcome::Applied(format!("Created {count} view(s).")))
}

/// Import every record of the library file. A failing record rolls the
/// whole file back.
pub fn import_library(conn: &mut Connection, path: &Path) -> FlowResult {
    ensure_tables(conn, &CORE_TABLES)?;
    let tx = begin(conn)?;
    let count = load_library(&tx, path).map_err(FlowError::Import)?;
    commit(tx)?;
    Ok(Outcome::Applied(format!("Loaded {count} books.")))
}

fn report(io: &mut dyn Prompter, result: FlowResult) -> Result<()> {
    match result {
        Ok(outcome) => io.say(outcome.message()),
        Err(err) => {
            warn!(error = %err, "setup failed");
            io.say(&err.to_string())
        }
    }
}

pub fn database_setup(conn: &mut Connection, io: &mut dyn Prompter) -> Result<()> {
    report(io, create_database(conn))
}

pub fn views_setup(conn: &mut Connection, path: &Path, io: &mut dyn Prompter) -> Result<()> {
    report(io, create_reporting_views(conn, path))
}

pub fn load_json(conn: &mut Connection, path: &Path, io: &mut dyn Prompter) -> Result<()> {
    report(io, import_library(conn, path))
}
