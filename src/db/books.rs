use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::authors::{get_author_id, insert_author};
use super::series::{get_series_id, insert_series};
use crate::models::{Book, BookRecord};

/// Search parameters for [`get_books_info`]. Empty strings and a missing ISBN
/// match everything.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub isbn: Option<i64>,
    pub author: String,
    pub series: String,
    pub title: String,
}

/// Add a book unless the ISBN is already present. Missing optional columns
/// are written as NULL.
pub fn insert_book(
    conn: &Connection,
    isbn: i64,
    series_id: Option<i64>,
    series_index: Option<f64>,
    title: Option<&str>,
) -> Result<()> {
    if get_book_isbn(conn, Some(isbn))?.is_some() {
        return Ok(());
    }
    conn.execute(
        "INSERT INTO books (isbn, series_id, series_index, title) VALUES (?1, ?2, ?3, ?4)",
        params![isbn, series_id, series_index, title],
    )
    .context("failed to insert book")?;
    debug!(isbn, ?series_id, "inserted book");
    Ok(())
}

/// Every statistics row joined with its book, series and author, ordered by
/// release date. Author, series and title are case-insensitive substring
/// filters; the ISBN must match exactly when given.
pub fn get_books_info(conn: &Connection, filter: &BookFilter) -> Result<Vec<BookRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT st.isbn, a.name, s.name, b.series_index, b.title,
                    st.released, st.finished, st.chapters, st.pages, st.speed, st.time
             FROM statistics st
             LEFT JOIN books b ON b.isbn = st.isbn
             LEFT JOIN series s ON s.series_id = b.series_id
             LEFT JOIN authors a ON a.author_id = s.author_id
             WHERE (?1 IS NULL OR st.isbn = ?1)
               AND (?2 = '' OR a.name LIKE '%' || ?2 || '%' ESCAPE '\\')
               AND (?3 = '' OR s.name LIKE '%' || ?3 || '%' ESCAPE '\\')
               AND (?4 = '' OR b.title LIKE '%' || ?4 || '%' ESCAPE '\\')
             ORDER BY st.released, st.isbn",
        )
        .context("failed to prepare book search")?;

    let books = stmt
        .query_map(
            params![
                filter.isbn,
                escape_like(&filter.author),
                escape_like(&filter.series),
                escape_like(&filter.title)
            ],
            |row| {
                Ok(BookRecord {
                    isbn: row.get(0)?,
                    author_name: row.get(1)?,
                    series_name: row.get(2)?,
                    series_index: row.get(3)?,
                    title: row.get(4)?,
                    released: row.get(5)?,
                    finished: row.get(6)?,
                    chapters: row.get(7)?,
                    pages: row.get(8)?,
                    speed: row.get(9)?,
                    time: row.get(10)?,
                })
            },
        )
        .context("failed to search books")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect books")?;

    Ok(books)
}

/// Make user text match literally inside a `LIKE` pattern.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Whole row by ISBN.
pub fn get_book(conn: &Connection, isbn: i64) -> Result<Option<Book>> {
    conn.query_row(
        "SELECT isbn, series_id, series_index, title FROM books WHERE isbn = ?1",
        params![isbn],
        |row| {
            Ok(Book {
                isbn: row.get(0)?,
                series_id: row.get(1)?,
                series_index: row.get(2)?,
                title: row.get(3)?,
            })
        },
    )
    .optional()
    .context("failed to load book")
}

/// Echo the ISBN back when a book row exists.
pub fn get_book_isbn(conn: &Connection, isbn: Option<i64>) -> Result<Option<i64>> {
    Ok(match isbn {
        Some(isbn) => get_book(conn, isbn)?.map(|book| book.isbn),
        None => None,
    })
}

/// Series a book belongs to, if any.
pub fn get_book_series_id(conn: &Connection, isbn: i64) -> Result<Option<i64>> {
    Ok(get_book(conn, isbn)?.and_then(|book| book.series_id))
}

/// Position of the book within its series.
pub fn get_book_series_index(conn: &Connection, isbn: i64) -> Result<Option<f64>> {
    Ok(get_book(conn, isbn)?.and_then(|book| book.series_index))
}

/// Stored title; `None` for a missing book or a NULL title.
pub fn get_book_title(conn: &Connection, isbn: i64) -> Result<Option<String>> {
    Ok(get_book(conn, isbn)?.and_then(|book| book.title))
}

/// Re-key a book. Nothing happens when the new ISBN is already taken.
pub fn update_book_isbn(conn: &Connection, old_isbn: i64, new_isbn: i64) -> Result<()> {
    if get_book_isbn(conn, Some(new_isbn))?.is_some() {
        return Ok(());
    }
    conn.execute(
        "UPDATE books SET isbn = ?1 WHERE isbn = ?2",
        params![new_isbn, old_isbn],
    )
    .context("failed to update book isbn")?;
    debug!(old_isbn, new_isbn, "re-keyed book");
    Ok(())
}

/// Point a book at the series `series_name` written by `author_name`,
/// creating the author and the series when they do not exist yet.
pub fn update_book_series(
    conn: &Connection,
    isbn: i64,
    series_name: &str,
    author_name: &str,
) -> Result<()> {
    insert_author(conn, author_name)?;
    let author_id = get_author_id(conn, author_name)?;
    if let Some(author_id) = author_id {
        insert_series(conn, author_id, series_name)?;
    }
    let series_id = get_series_id(conn, series_name, author_id)?;

    conn.execute(
        "UPDATE books SET series_id = ?1 WHERE isbn = ?2",
        params![series_id, isbn],
    )
    .context("failed to update book series")?;
    debug!(isbn, ?series_id, "moved book to series");
    Ok(())
}

/// Overwrite the series index.
pub fn update_book_series_index(conn: &Connection, isbn: i64, series_index: f64) -> Result<()> {
    conn.execute(
        "UPDATE books SET series_index = ?1 WHERE isbn = ?2",
        params![series_index, isbn],
    )
    .context("failed to update series index")?;
    Ok(())
}

/// Overwrite the title.
pub fn update_book_title(conn: &Connection, isbn: i64, title: &str) -> Result<()> {
    conn.execute(
        "UPDATE books SET title = ?1 WHERE isbn = ?2",
        params![title, isbn],
    )
    .context("failed to update book title")?;
    Ok(())
}

/// Remove the row unconditionally. Callers check for statistics first.
pub fn delete_book_isbn(conn: &Connection, isbn: i64) -> Result<()> {
    conn.execute("DELETE FROM books WHERE isbn = ?1", params![isbn])
        .context("failed to delete book")?;
    debug!(isbn, "deleted book");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_tables, get_author_id, insert_statistics, open_in_memory};
    use crate::models::StatisticsFields;

    const ISBN: i64 = 123456789;

    fn library() -> Connection {
        let conn = open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_and_read_back_columns() {
        let conn = library();
        assert_eq!(get_book_isbn(&conn, Some(ISBN)).unwrap(), None);
        insert_book(&conn, ISBN, Some(11), Some(2.0), Some("Test Title")).unwrap();
        assert_eq!(get_book_isbn(&conn, Some(ISBN)).unwrap(), Some(ISBN));
        assert_eq!(get_book_series_id(&conn, ISBN).unwrap(), Some(11));
        assert_eq!(get_book_series_index(&conn, ISBN).unwrap(), Some(2.0));
        assert_eq!(get_book_title(&conn, ISBN).unwrap().as_deref(), Some("Test Title"));
        assert_eq!(get_book_isbn(&conn, None).unwrap(), None);
    }

    #[test]
    fn missing_fields_are_null() {
        let conn = library();
        insert_book(&conn, ISBN, None, None, None).unwrap();
        let book = get_book(&conn, ISBN).unwrap().unwrap();
        assert_eq!(book.series_id, None);
        assert_eq!(book.series_index, None);
        assert_eq!(book.title, None);
        let nulls: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM books WHERE series_id IS NULL AND title IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn duplicate_isbn_keeps_first_row() {
        let conn = library();
        insert_book(&conn, ISBN, None, None, Some("First")).unwrap();
        insert_book(&conn, ISBN, None, None, Some("Second")).unwrap();
        assert_eq!(get_book_title(&conn, ISBN).unwrap().as_deref(), Some("First"));
    }

    #[test]
    fn isbn_update_refuses_taken_key() {
        let conn = library();
        insert_book(&conn, ISBN, Some(2), Some(1.0), Some("Test Title")).unwrap();
        update_book_isbn(&conn, ISBN, 987654321).unwrap();
        assert_eq!(get_book_isbn(&conn, Some(ISBN)).unwrap(), None);
        assert_eq!(get_book_isbn(&conn, Some(987654321)).unwrap(), Some(987654321));

        insert_book(&conn, ISBN, None, None, Some("Other")).unwrap();
        update_book_isbn(&conn, 987654321, ISBN).unwrap();
        assert_eq!(get_book_title(&conn, ISBN).unwrap().as_deref(), Some("Other"));
    }

    #[test]
    fn series_update_creates_author_and_series() {
        let conn = library();
        insert_book(&conn, ISBN, None, Some(1.0), Some("Test Title")).unwrap();
        update_book_series(&conn, ISBN, "New Series", "New Author").unwrap();
        let author_id = get_author_id(&conn, "New Author").unwrap();
        assert!(author_id.is_some());
        let series_id = get_series_id(&conn, "New Series", author_id).unwrap();
        assert!(series_id.is_some());
        assert_eq!(get_book_series_id(&conn, ISBN).unwrap(), series_id);
    }

    #[test]
    fn index_title_and_delete() {
        let conn = library();
        insert_book(&conn, ISBN, Some(1), Some(1.0), Some("Old Title")).unwrap();
        update_book_series_index(&conn, ISBN, 3.5).unwrap();
        update_book_title(&conn, ISBN, "New Title").unwrap();
        assert_eq!(get_book_series_index(&conn, ISBN).unwrap(), Some(3.5));
        assert_eq!(get_book_title(&conn, ISBN).unwrap().as_deref(), Some("New Title"));
        delete_book_isbn(&conn, ISBN).unwrap();
        assert_eq!(get_book_isbn(&conn, Some(ISBN)).unwrap(), None);
    }

    fn seed_search(conn: &Connection) {
        crate::db::insert_author(conn, "Andy Weir").unwrap();
        crate::db::insert_series(conn, 1, "The Martian").unwrap();
        crate::db::insert_series(conn, 1, "Artemis").unwrap();
        insert_book(conn, 1, Some(1), Some(1.0), Some("The Martian")).unwrap();
        insert_book(conn, 2, Some(2), Some(1.0), Some("Artemis")).unwrap();
        insert_book(conn, 3, None, None, Some("100% Loose")).unwrap();
        let dated = |released: &str| StatisticsFields {
            released: Some(released.to_string()),
            ..StatisticsFields::default()
        };
        insert_statistics(conn, 2, &dated("2017-11-14")).unwrap();
        insert_statistics(conn, 1, &dated("2011-09-27")).unwrap();
        insert_statistics(conn, 3, &dated("2020-01-01")).unwrap();
    }

    #[test]
    fn search_orders_by_release_and_matches_substrings() {
        let conn = library();
        seed_search(&conn);

        let all = get_books_info(&conn, &BookFilter::default()).unwrap();
        let isbns: Vec<_> = all.iter().map(|b| b.isbn).collect();
        assert_eq!(isbns, vec![Some(1), Some(2), Some(3)]);

        let weir = get_books_info(
            &conn,
            &BookFilter {
                author: "weir".into(),
                ..BookFilter::default()
            },
        )
        .unwrap();
        assert_eq!(weir.len(), 2);
        assert_eq!(weir[0].author_name.as_deref(), Some("Andy Weir"));
        assert_eq!(weir[0].series_name.as_deref(), Some("The Martian"));

        let by_isbn = get_books_info(
            &conn,
            &BookFilter {
                isbn: Some(2),
                ..BookFilter::default()
            },
        )
        .unwrap();
        assert_eq!(by_isbn.len(), 1);
        assert_eq!(by_isbn[0].title.as_deref(), Some("Artemis"));
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let conn = library();
        seed_search(&conn);
        let percent = get_books_info(
            &conn,
            &BookFilter {
                title: "100%".into(),
                ..BookFilter::default()
            },
        )
        .unwrap();
        assert_eq!(percent.len(), 1);

        let underscore = get_books_info(
            &conn,
            &BookFilter {
                title: "_".into(),
                ..BookFilter::default()
            },
        )
        .unwrap();
        assert!(underscore.is_empty());
    }
}
