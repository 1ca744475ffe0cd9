use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

use crate::error::TableProblem;

/// Names of the four core tables, in creation order.
pub const CORE_TABLES: [&str; 4] = ["authors", "series", "books", "statistics"];

/// Open (or create) the SQLite file at `path`. The parent directory is created
/// on demand so a fresh install only needs a writable home.
pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("failed to create data directory")?;
        }
    }

    let conn = Connection::open(path).context("failed to open SQLite database")?;
    info!(path = %path.display(), "opened library database");
    Ok(conn)
}

/// Throwaway database used by the test suites.
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().context("failed to open in-memory database")
}

/// Create the four tables if they are absent. Tables that already exist are
/// left untouched, even when their columns are wrong; `check_tables` is what
/// reports that case.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS authors (
            author_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )
    .context("failed to create authors table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS series (
            series_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            author_id INTEGER NOT NULL
        )",
        [],
    )
    .context("failed to create series table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS books (
            isbn INTEGER PRIMARY KEY,
            series_id INTEGER,
            series_index REAL,
            title TEXT
        )",
        [],
    )
    .context("failed to create books table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS statistics (
            isbn INTEGER PRIMARY KEY,
            chapters INTEGER,
            pages INTEGER,
            released TEXT,
            finished TEXT,
            speed INTEGER,
            time REAL
        )",
        [],
    )
    .context("failed to create statistics table")?;

    info!("library tables are in place");
    Ok(())
}

/// Probe each target and collect the ones SQLite cannot compile. A target is
/// either one of [`CORE_TABLES`], which expands to a select over every
/// required column, or any other query string used verbatim (handy for
/// checking that a view exists).
pub fn check_tables(conn: &Connection, targets: &[&str]) -> Vec<TableProblem> {
    targets
        .iter()
        .filter_map(|target| {
            let query = select_for(target);
            conn.prepare(query.as_ref())
                .err()
                .map(|err| TableProblem {
                    target: target.to_string(),
                    reason: err.to_string(),
                })
        })
        .collect()
}

fn select_for(target: &str) -> std::borrow::Cow<'_, str> {
    match target {
        "authors" => "SELECT author_id, name FROM authors".into(),
        "series" => "SELECT series_id, name, author_id FROM series".into(),
        "books" => "SELECT isbn, series_id, series_index, title FROM books".into(),
        "statistics" => {
            "SELECT isbn, chapters, pages, released, finished, speed, time FROM statistics".into()
        }
        other => other.into(),
    }
}
