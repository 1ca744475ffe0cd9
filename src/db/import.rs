//! Loaders for the two declarative JSON files: view definitions and a whole
//! library of book records. Both refuse to run against a broken schema.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{debug, info};

use super::authors::{get_author_id, insert_author};
use super::books::insert_book;
use super::connection::{check_tables, CORE_TABLES};
use super::series::{get_series_id, insert_series};
use super::statistics::insert_statistics;
use crate::models::BookRecord;

/// Shape of the views file: `{"views": [{"name": "...", "view": "CREATE VIEW ..."}]}`.
#[derive(Debug, Deserialize)]
pub struct ViewDefinitions {
    pub views: Vec<ViewDefinition>,
}

#[derive(Debug, Deserialize)]
pub struct ViewDefinition {
    /// Label used in log lines only; the statement carries the real name.
    #[serde(default)]
    pub name: Option<String>,
    pub view: String,
}

/// Shape of the library file: `{"books": [BookRecord, ...]}`.
#[derive(Debug, Deserialize)]
pub struct Library {
    pub books: Vec<BookRecord>,
}

/// Execute every view definition from `path`. Returns how many ran.
pub fn create_views(conn: &Connection, path: &Path) -> Result<usize> {
    ensure_core_tables(conn)?;

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read views file {}", path.display()))?;
    let definitions: ViewDefinitions = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse views file {}", path.display()))?;

    for definition in &definitions.views {
        conn.execute_batch(&definition.view).with_context(|| {
            format!(
                "failed to create view {}",
                definition.name.as_deref().unwrap_or("<unnamed>")
            )
        })?;
        debug!(name = ?definition.name, "created view");
    }

    info!(count = definitions.views.len(), "created views");
    Ok(definitions.views.len())
}

/// Insert every record from the library file at `path`. Returns how many
/// records were processed, including ones without an ISBN.
pub fn load_library(conn: &Connection, path: &Path) -> Result<usize> {
    ensure_core_tables(conn)?;

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read library file {}", path.display()))?;
    let library: Library = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse library file {}", path.display()))?;

    for record in &library.books {
        import_record(conn, record)?;
    }

    info!(count = library.books.len(), "loaded library");
    Ok(library.books.len())
}

/// Author, then series under that author, then book and statistics. A step
/// whose linking id did not resolve is skipped; ids never leak from one
/// record to the next.
pub fn import_record(conn: &Connection, record: &BookRecord) -> Result<()> {
    let author_id = match record.author_name.as_deref() {
        Some(name) => {
            insert_author(conn, name)?;
            get_author_id(conn, name)?
        }
        None => None,
    };

    let series_id = match (record.series_name.as_deref(), author_id) {
        (Some(name), Some(author_id)) => {
            insert_series(conn, author_id, name)?;
            get_series_id(conn, name, Some(author_id))?
        }
        _ => None,
    };

    if let Some(isbn) = record.isbn {
        insert_book(
            conn,
            isbn,
            series_id,
            record.series_index,
            record.title.as_deref(),
        )?;
        insert_statistics(conn, isbn, &record.statistics_fields())?;
    }
    Ok(())
}

fn ensure_core_tables(conn: &Connection) -> Result<()> {
    let problems = check_tables(conn, &CORE_TABLES);
    if problems.is_empty() {
        return Ok(());
    }
    let listed: Vec<String> = problems.iter().map(ToString::to_string).collect();
    Err(anyhow!(
        "At least one table is corrupted. Please fix them manually:\n{}",
        listed.join("\n")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        create_tables, get_book_series_id, get_books_info, get_max_author_id,
        get_statistics_isbn, open_in_memory, BookFilter,
    };

    fn library() -> Connection {
        let conn = open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    const LIBRARY: &str = r#"{"books": [
        {"author_name": "Andy Weir", "series_name": "The Martian", "isbn": 9780804139021,
         "title": "The Martian", "series_index": 1, "chapters": 26, "pages": 384,
         "released": "2011-09-27", "finished": "2023-06-20", "speed": 150, "time": 8},
        {"author_name": null, "series_name": "Orphan", "isbn": 1111,
         "title": "Nobody's Book", "series_index": null, "chapters": null, "pages": 100,
         "released": null, "finished": null, "speed": null, "time": null},
        {"author_name": "Kit Frick", "series_name": null, "isbn": null, "title": null}
    ]}"#;

    #[test]
    fn library_load_links_what_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "library.json", LIBRARY);
        let conn = library();

        assert_eq!(load_library(&conn, &path).unwrap(), 3);
        assert_eq!(get_max_author_id(&conn).unwrap(), 2);
        assert_eq!(get_book_series_id(&conn, 9780804139021).unwrap(), Some(1));

        assert_eq!(get_book_series_id(&conn, 1111).unwrap(), None);
        assert_eq!(get_statistics_isbn(&conn, Some(1111)).unwrap(), Some(1111));

        let found = get_books_info(&conn, &BookFilter::default()).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn library_load_refuses_missing_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "library.json", LIBRARY);
        let conn = open_in_memory().unwrap();
        let err = load_library(&conn, &path).unwrap_err();
        assert!(err.to_string().starts_with("At least one table is corrupted."));
    }

    #[test]
    fn malformed_library_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "library.json", r#"{"books": [{"isbn": "abc"}]}"#);
        assert!(load_library(&library(), &path).is_err());
    }

    #[test]
    fn views_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "views.json",
            r#"{"views": [{"name": "Unread Series by Date",
                "view": "CREATE VIEW 'Unread Series by Date' AS SELECT s.name FROM series s"}]}"#,
        );
        let conn = library();
        let view_query = "SELECT * FROM 'Unread Series by Date'";
        assert_eq!(check_tables(&conn, &[view_query]).len(), 1);
        assert_eq!(create_views(&conn, &path).unwrap(), 1);
        assert!(check_tables(&conn, &[view_query]).is_empty());
    }
}
