use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::models::Series;

/// Add a series under `author_id` unless that (name, author) pair already
/// exists. Ids follow the same max-plus-one scheme as authors.
pub fn insert_series(conn: &Connection, author_id: i64, name: &str) -> Result<()> {
    if name.is_empty() || get_series_id(conn, name, Some(author_id))?.is_some() {
        return Ok(());
    }

    let id = get_max_series_id(conn)? + 1;
    conn.execute(
        "INSERT INTO series (series_id, name, author_id) VALUES (?1, ?2, ?3)",
        params![id, name, author_id],
    )
    .context("failed to insert series")?;
    debug!(id, name, author_id, "inserted series");
    Ok(())
}

/// Resolve a series by its identity pair. Both halves are required.
pub fn get_series_id(conn: &Connection, name: &str, author_id: Option<i64>) -> Result<Option<i64>> {
    let Some(author_id) = author_id else {
        return Ok(None);
    };
    if name.is_empty() {
        return Ok(None);
    }
    conn.query_row(
        "SELECT series_id FROM series WHERE name = ?1 AND author_id = ?2
         ORDER BY series_id LIMIT 1",
        params![name, author_id],
        |row| row.get(0),
    )
    .optional()
    .context("failed to look up series id")
}

/// Highest series id in use, or 0 for an empty table.
pub fn get_max_series_id(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT MAX(series_id) FROM series", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .map(|max| max.unwrap_or(0))
    .context("failed to read highest series id")
}

/// Whole row by id.
pub fn get_series(conn: &Connection, id: i64) -> Result<Option<Series>> {
    conn.query_row(
        "SELECT series_id, name, author_id FROM series WHERE series_id = ?1",
        params![id],
        |row| {
            Ok(Series {
                id: row.get(0)?,
                name: row.get(1)?,
                author_id: row.get(2)?,
            })
        },
    )
    .optional()
    .context("failed to load series")
}

/// Name for an id; `None` when the id is missing or unknown.
pub fn get_series_name(conn: &Connection, id: Option<i64>) -> Result<Option<String>> {
    Ok(match id {
        Some(id) => get_series(conn, id)?.map(|series| series.name),
        None => None,
    })
}

/// Author the series belongs to.
pub fn get_series_author_id(conn: &Connection, id: Option<i64>) -> Result<Option<i64>> {
    Ok(match id {
        Some(id) => get_series(conn, id)?.map(|series| series.author_id),
        None => None,
    })
}

/// Books pointing at this series; 0 for a missing id.
pub fn get_series_number_of_books(conn: &Connection, id: Option<i64>) -> Result<i64> {
    let Some(id) = id else {
        return Ok(0);
    };
    conn.query_row(
        "SELECT COUNT(*) FROM books WHERE series_id = ?1",
        params![id],
        |row| row.get(0),
    )
    .context("failed to count books in series")
}

/// Move every series of one author to another.
pub fn update_authors_series(conn: &Connection, old_author_id: i64, new_author_id: i64) -> Result<()> {
    let moved = conn
        .execute(
            "UPDATE series SET author_id = ?1 WHERE author_id = ?2",
            params![new_author_id, old_author_id],
        )
        .context("failed to move series between authors")?;
    debug!(old_author_id, new_author_id, moved, "moved series to new author");
    Ok(())
}

/// Reassign a single series to another author.
pub fn update_series_author(conn: &Connection, id: i64, author_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE series SET author_id = ?1 WHERE series_id = ?2",
        params![author_id, id],
    )
    .context("failed to update series author")?;
    debug!(id, author_id, "changed series author");
    Ok(())
}

/// Rename in place. Uniqueness of the (name, author) pair is checked by the caller.
pub fn update_series_name(conn: &Connection, id: i64, name: &str) -> Result<()> {
    conn.execute(
        "UPDATE series SET name = ?1 WHERE series_id = ?2",
        params![name, id],
    )
    .context("failed to update series name")?;
    debug!(id, name, "renamed series");
    Ok(())
}

/// Remove the row unconditionally. Callers check for linked books first.
pub fn delete_series_id(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM series WHERE series_id = ?1", params![id])
        .context("failed to delete series")?;
    debug!(id, "deleted series");
    Ok(())
}
