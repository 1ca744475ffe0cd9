use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Error as SqlError, ErrorCode, OptionalExtension};
use tracing::debug;

use crate::models::Author;

/// Add an author unless the name is blank or already taken. The id is the
/// current maximum plus one; the read-then-write is fine for a single-user
/// tool but would race with a second writer.
pub fn insert_author(conn: &Connection, name: &str) -> Result<()> {
    if name.is_empty() || get_author_id(conn, name)?.is_some() {
        return Ok(());
    }

    let id = get_max_author_id(conn)? + 1;
    conn.execute(
        "INSERT INTO authors (author_id, name) VALUES (?1, ?2)",
        params![id, name],
    )
    .context("failed to insert author")?;
    debug!(id, name, "inserted author");
    Ok(())
}

/// Exact-match lookup. A blank name never matches.
pub fn get_author_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    if name.is_empty() {
        return Ok(None);
    }
    conn.query_row(
        "SELECT author_id FROM authors WHERE name = ?1 ORDER BY author_id LIMIT 1",
        params![name],
        |row| row.get(0),
    )
    .optional()
    .context("failed to look up author id")
}

/// Highest id in use, or 0 when the table is empty.
pub fn get_max_author_id(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT MAX(author_id) FROM authors", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .map(|max| max.unwrap_or(0))
    .context("failed to read highest author id")
}

/// Name for an id; `None` when the id is missing or unknown.
pub fn get_author_name(conn: &Connection, id: Option<i64>) -> Result<Option<String>> {
    let Some(id) = id else {
        return Ok(None);
    };
    conn.query_row(
        "SELECT name FROM authors WHERE author_id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
    .context("failed to look up author name")
}

/// Load the whole row, used by callers that want both halves at once.
pub fn get_author(conn: &Connection, id: i64) -> Result<Option<Author>> {
    conn.query_row(
        "SELECT author_id, name FROM authors WHERE author_id = ?1",
        params![id],
        |row| {
            Ok(Author {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
    .context("failed to load author")
}

/// Rename an author. Unknown ids are ignored.
pub fn update_author_name(conn: &Connection, id: i64, name: &str) -> Result<()> {
    if get_author_name(conn, Some(id))?.is_none() {
        return Ok(());
    }
    conn.execute(
        "UPDATE authors SET name = ?1 WHERE author_id = ?2",
        params![name, id],
    )
    .map_err(|err| map_unique_constraint(err, name))
    .context("failed to update author name")?;
    debug!(id, name, "renamed author");
    Ok(())
}

/// Author names are unique; turn SQLite's constraint code into a readable
/// message.
fn map_unique_constraint(err: SqlError, name: &str) -> anyhow::Error {
    if matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    ) {
        anyhow!("Author \"{name}\" already exists.")
    } else {
        err.into()
    }
}

/// Remove the row unconditionally. Callers check for linked series first.
pub fn delete_author_id(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM authors WHERE author_id = ?1", params![id])
        .context("failed to delete author")?;
    debug!(id, "deleted author");
    Ok(())
}

/// Number of series pointing at this author; 0 for a missing id.
pub fn get_authors_number_of_series(conn: &Connection, id: Option<i64>) -> Result<i64> {
    let Some(id) = id else {
        return Ok(0);
    };
    conn.query_row(
        "SELECT COUNT(*) FROM series WHERE author_id = ?1",
        params![id],
        |row| row.get(0),
    )
    .context("failed to count series of author")
}
