use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use tracing::debug;

use crate::models::{Statistics, StatisticsFields};

/// Add reading figures for an ISBN unless a row already exists. The book row
/// itself is not required.
pub fn insert_statistics(conn: &Connection, isbn: i64, fields: &StatisticsFields) -> Result<()> {
    if get_statistics_isbn(conn, Some(isbn))?.is_some() {
        return Ok(());
    }
    conn.execute(
        "INSERT INTO statistics (isbn, chapters, pages, released, finished, speed, time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            isbn,
            fields.chapters,
            fields.pages,
            fields.released,
            fields.finished,
            fields.speed,
            fields.time
        ],
    )
    .context("failed to insert statistics")?;
    debug!(isbn, "inserted statistics");
    Ok(())
}

/// Whole statistics row by ISBN.
pub fn get_statistics(conn: &Connection, isbn: i64) -> Result<Option<Statistics>> {
    conn.query_row(
        "SELECT isbn, chapters, pages, released, finished, speed, time
         FROM statistics WHERE isbn = ?1",
        params![isbn],
        |row| {
            Ok(Statistics {
                isbn: row.get(0)?,
                fields: StatisticsFields {
                    chapters: row.get(1)?,
                    pages: row.get(2)?,
                    released: row.get(3)?,
                    finished: row.get(4)?,
                    speed: row.get(5)?,
                    time: row.get(6)?,
                },
            })
        },
    )
    .optional()
    .context("failed to load statistics")
}

/// Echo the ISBN back when a statistics row exists.
pub fn get_statistics_isbn(conn: &Connection, isbn: Option<i64>) -> Result<Option<i64>> {
    Ok(match isbn {
        Some(isbn) => get_statistics(conn, isbn)?.map(|stats| stats.isbn),
        None => None,
    })
}

fn field<T>(conn: &Connection, isbn: i64, pick: impl FnOnce(StatisticsFields) -> Option<T>) -> Result<Option<T>> {
    Ok(get_statistics(conn, isbn)?.and_then(|stats| pick(stats.fields)))
}

/// Chapter count.
pub fn get_statistics_chapters(conn: &Connection, isbn: i64) -> Result<Option<i64>> {
    field(conn, isbn, |f| f.chapters)
}

/// Page count.
pub fn get_statistics_pages(conn: &Connection, isbn: i64) -> Result<Option<i64>> {
    field(conn, isbn, |f| f.pages)
}

/// Release date as stored (`YYYY-MM-DD`).
pub fn get_statistics_released(conn: &Connection, isbn: i64) -> Result<Option<String>> {
    field(conn, isbn, |f| f.released)
}

/// Date the book was finished.
pub fn get_statistics_finished(conn: &Connection, isbn: i64) -> Result<Option<String>> {
    field(conn, isbn, |f| f.finished)
}

/// Reading speed in words per minute.
pub fn get_statistics_speed(conn: &Connection, isbn: i64) -> Result<Option<i64>> {
    field(conn, isbn, |f| f.speed)
}

/// Reading time in hours.
pub fn get_statistics_time(conn: &Connection, isbn: i64) -> Result<Option<f64>> {
    field(conn, isbn, |f| f.time)
}

/// Re-key a statistics row. Nothing happens when the new ISBN is taken.
pub fn update_statistics_isbn(conn: &Connection, old_isbn: i64, new_isbn: i64) -> Result<()> {
    if get_statistics_isbn(conn, Some(new_isbn))?.is_some() {
        return Ok(());
    }
    conn.execute(
        "UPDATE statistics SET isbn = ?1 WHERE isbn = ?2",
        params![new_isbn, old_isbn],
    )
    .context("failed to update statistics isbn")?;
    debug!(old_isbn, new_isbn, "re-keyed statistics");
    Ok(())
}

/// Column names are fixed strings chosen by the setters below, never user text.
fn set_column(conn: &Connection, isbn: i64, column: &str, value: &dyn ToSql) -> Result<()> {
    let sql = format!("UPDATE statistics SET {column} = ?1 WHERE isbn = ?2");
    conn.execute(&sql, params![value, isbn])
        .with_context(|| format!("failed to update statistics {column}"))?;
    debug!(isbn, column, "updated statistics");
    Ok(())
}

/// Set the chapter count.
pub fn update_statistics_chapters(conn: &Connection, isbn: i64, chapters: i64) -> Result<()> {
    set_column(conn, isbn, "chapters", &chapters)
}

/// Set the page count.
pub fn update_statistics_pages(conn: &Connection, isbn: i64, pages: i64) -> Result<()> {
    set_column(conn, isbn, "pages", &pages)
}

/// Set the release date.
pub fn update_statistics_released(conn: &Connection, isbn: i64, released: &str) -> Result<()> {
    set_column(conn, isbn, "released", &released)
}

/// Set the finish date.
pub fn update_statistics_finished(conn: &Connection, isbn: i64, finished: &str) -> Result<()> {
    set_column(conn, isbn, "finished", &finished)
}

/// Set the reading speed.
pub fn update_statistics_speed(conn: &Connection, isbn: i64, speed: i64) -> Result<()> {
    set_column(conn, isbn, "speed", &speed)
}

/// Set the reading time.
pub fn update_statistics_time(conn: &Connection, isbn: i64, time: f64) -> Result<()> {
    set_column(conn, isbn, "time", &time)
}

/// Drop the statistics row for one book. The book row is untouched.
pub fn delete_statistics_isbn(conn: &Connection, isbn: i64) -> Result<()> {
    conn.execute("DELETE FROM statistics WHERE isbn = ?1", params![isbn])
        .context("failed to delete statistics")?;
    debug!(isbn, "deleted statistics");
    Ok(())
}
