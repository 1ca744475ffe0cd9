use std::fmt;

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use super::{
    begin, commit, ensure_tables, guarded, optional_number, optional_text, run_flow, FlowResult,
    Outcome, Prompter, ISBN_ERROR, NUMBER_ERROR,
};
use crate::db::{
    delete_book_isbn, get_author_id, get_author_name, get_book, get_book_isbn, get_books_info,
    get_series_author_id, get_series_id, get_series_name, get_statistics_isbn, insert_author,
    insert_book, insert_series, insert_statistics, update_book_isbn, update_book_series,
    update_book_series_index, update_book_title, BookFilter, CORE_TABLES,
};
use crate::error::FlowError;
use crate::models::{show, show_real, StatisticsFields};

#[derive(Debug, Clone, Default)]
pub struct AddBookRequest {
    pub isbn: String,
    pub title: String,
    pub series: String,
    pub series_index: String,
    pub author: String,
    pub chapters: String,
    pub pages: String,
    pub released: String,
    pub finished: String,
    pub speed: String,
    pub time: String,
}

impl AddBookRequest {
    pub fn prompt(io: &mut dyn Prompter) -> Result<Self> {
        Ok(Self {
            isbn: io.ask("Book's ISBN: ")?,
            title: io.ask("Book's title: ")?,
            series: io.ask("Series name: ")?,
            series_index: io.ask("Series index: ")?,
            author: io.ask("Author's name: ")?,
            chapters: io.ask("Number of chapters: ")?,
            pages: io.ask("Number of pages: ")?,
            released: io.ask("Release date: ")?,
            finished: io.ask("Date when finished reading: ")?,
            speed: io.ask("Reading speed [w/m]: ")?,
            time: io.ask("Reading time [h]: ")?,
        })
    }

    fn others_empty(&self) -> bool {
        [
            &self.title,
            &self.series,
            &self.series_index,
            &self.author,
            &self.chapters,
            &self.pages,
            &self.released,
            &self.finished,
            &self.speed,
            &self.time,
        ]
        .iter()
        .all(|field| field.is_empty())
    }
}

/// Insert a book with its author, series and statistics in one go.
pub fn add_book(conn: &mut Connection, request: &AddBookRequest) -> FlowResult {
    if request.isbn.is_empty() {
        if request.others_empty() {
            return Ok(Outcome::Cancelled("Inputs were empty, cancelling.".into()));
        }
        return Err(FlowError::validation(
            "ISBN was empty while at least one other input was not, try again.",
        ));
    }

    let isbn: i64 = request
        .isbn
        .parse()
        .map_err(|_| FlowError::validation(NUMBER_ERROR))?;
    let series_index = optional_number::<f64>(&request.series_index, NUMBER_ERROR)?;
    let fields = StatisticsFields {
        chapters: optional_number(&request.chapters, NUMBER_ERROR)?,
        pages: optional_number(&request.pages, NUMBER_ERROR)?,
        released: optional_text(&request.released).map(str::to_string),
        finished: optional_text(&request.finished).map(str::to_string),
        speed: optional_number(&request.speed, NUMBER_ERROR)?,
        time: optional_number(&request.time, NUMBER_ERROR)?,
    };

    let tx = begin(conn)?;
    let author_id = match optional_text(&request.author) {
        Some(author) => {
            insert_author(&tx, author)?;
            get_author_id(&tx, author)?
        }
        None => None,
    };
    let series_id = match (optional_text(&request.series), author_id) {
        (Some(series), Some(author_id)) => {
            insert_series(&tx, author_id, series)?;
            get_series_id(&tx, series, Some(author_id))?
        }
        _ => None,
    };
    insert_book(&tx, isbn, series_id, series_index, optional_text(&request.title))?;
    insert_statistics(&tx, isbn, &fields)?;
    commit(tx)?;

    let in_books = get_book_isbn(conn, Some(isbn))?;
    let in_statistics = get_statistics_isbn(conn, Some(isbn))?;
    if in_books != Some(isbn) || in_statistics != Some(isbn) {
        return Err(FlowError::anomaly(format!(
            "Something went wrong. There's a mismatch between added ISBN numbers in tables:\nbooks:\t\t{}\nstatistics:\t{}",
            show(&in_books),
            show(&in_statistics)
        )));
    }

    info!(isbn, ?series_id, "added book");
    Ok(Outcome::Applied(format!("Added book with ISBN: {isbn}")))
}

pub fn add_book_flow(conn: &mut Connection, io: &mut dyn Prompter) -> Result<()> {
    guarded(conn, io, &CORE_TABLES, AddBookRequest::prompt, add_book)
}

#[derive(Debug, Clone, Default)]
pub struct GetBooksRequest {
    pub isbn: String,
    pub author: String,
    pub series: String,
    pub title: String,
}

impl GetBooksRequest {
    pub fn prompt(io: &mut dyn Prompter) -> Result<Self> {
        Ok(Self {
            isbn: io.ask("ISBN: ")?,
            author: io.ask("Author's name: ")?,
            series: io.ask("Series name: ")?,
            title: io.ask("Book's title: ")?,
        })
    }
}

/// Search the library. Every filled field narrows the result.
pub fn get_books(conn: &mut Connection, request: &GetBooksRequest) -> FlowResult {
    let GetBooksRequest {
        isbn,
        author,
        series,
        title,
    } = request;
    if isbn.is_empty() && author.is_empty() && series.is_empty() && title.is_empty() {
        return Ok(Outcome::Cancelled("Inputs were empty, cancelling.".into()));
    }

    let filter = BookFilter {
        isbn: optional_number(isbn, ISBN_ERROR)?,
        author: author.clone(),
        series: series.clone(),
        title: title.clone(),
    };
    let books = get_books_info(conn, &filter)?;
    if books.is_empty() {
        return Err(FlowError::validation(
            "No books found matching the inputs, try again.",
        ));
    }

    let mut message = format!("Found {} book(s):", books.len());
    for (i, book) in books.iter().enumerate() {
        message.push_str(&format!("\n\tBook #{}:\n{book}", i + 1));
    }
    Ok(Outcome::Applied(message))
}

pub fn get_books_flow(conn: &mut Connection, io: &mut dyn Prompter) -> Result<()> {
    guarded(conn, io, &CORE_TABLES, GetBooksRequest::prompt, get_books)
}

/// What Update Book shows before and after the change.
#[derive(Debug, Clone, PartialEq)]
pub struct BookSummary {
    pub isbn: i64,
    pub title: Option<String>,
    pub series: Option<String>,
    pub series_index: Option<f64>,
    pub author: Option<String>,
}

impl BookSummary {
    pub fn load(conn: &Connection, isbn: i64) -> Result<Option<Self>> {
        let Some(book) = get_book(conn, isbn)? else {
            return Ok(None);
        };
        let author_id = get_series_author_id(conn, book.series_id)?;
        Ok(Some(Self {
            isbn: book.isbn,
            title: book.title,
            series: get_series_name(conn, book.series_id)?,
            series_index: book.series_index,
            author: get_author_name(conn, author_id)?,
        }))
    }
}

impl fmt::Display for BookSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ISBN:\t\t{}", self.isbn)?;
        writeln!(f, "Title:\t\t{}", show(&self.title))?;
        writeln!(f, "Series name:\t{}", show(&self.series))?;
        writeln!(f, "Index:\t\t{}", show_real(&self.series_index))?;
        write!(f, "Author:\t\t{}", show(&self.author))
    }
}

/// Resolve the ISBN typed in the first phase of Update Book. `None` means
/// the input was empty.
pub fn find_book(conn: &Connection, raw: &str) -> std::result::Result<Option<BookSummary>, FlowError> {
    let Some(isbn) = optional_number::<i64>(raw, NUMBER_ERROR)? else {
        return Ok(None);
    };
    match BookSummary::load(conn, isbn)? {
        Some(summary) => Ok(Some(summary)),
        None => Err(missing_book(isbn)),
    }
}

fn missing_book(isbn: i64) -> FlowError {
    FlowError::validation(format!(
        "Book with ISBN {isbn} does NOT exist in the database, try again."
    ))
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBookRequest {
    /// Book being edited, already resolved.
    pub isbn: i64,
    pub new_isbn: String,
    pub new_title: String,
    pub new_series: String,
    pub new_series_index: String,
    pub new_author: String,
}

impl UpdateBookRequest {
    pub fn prompt(io: &mut dyn Prompter, isbn: i64) -> Result<Self> {
        Ok(Self {
            isbn,
            new_isbn: io.ask("New ISBN: ")?,
            new_title: io.ask("New title: ")?,
            new_series: io.ask("New series name: ")?,
            new_series_index: io.ask("New series index: ")?,
            new_author: io.ask("New author's name: ")?,
        })
    }
}

/// Apply every non-empty field to the book. A series move needs both a
/// series and an author, falling back to the current ones.
pub fn update_book(conn: &mut Connection, request: &UpdateBookRequest) -> FlowResult {
    let isbn = request.isbn;
    if [
        &request.new_isbn,
        &request.new_title,
        &request.new_series,
        &request.new_series_index,
        &request.new_author,
    ]
    .iter()
    .all(|field| field.is_empty())
    {
        return Err(FlowError::validation("Did not provide updated data, try again."));
    }

    let new_isbn = optional_number::<i64>(&request.new_isbn, NUMBER_ERROR)?;
    let new_index = optional_number::<f64>(&request.new_series_index, NUMBER_ERROR)?;

    let tx = begin(conn)?;
    let Some(current) = BookSummary::load(&tx, isbn)? else {
        return Err(missing_book(isbn));
    };
    if let Some(new_isbn) = new_isbn.filter(|&new| new != isbn) {
        if get_book_isbn(&tx, Some(new_isbn))?.is_some() {
            return Err(FlowError::validation(format!(
                "Book with ISBN {new_isbn} already exists in the database, try again."
            )));
        }
    }

    if !request.new_series.is_empty() || !request.new_author.is_empty() {
        let series = optional_text(&request.new_series).or(current.series.as_deref());
        let author = optional_text(&request.new_author).or(current.author.as_deref());
        let (Some(series), Some(author)) = (series, author) else {
            return Err(FlowError::validation(
                "Series and author are both needed to move the book, try again.",
            ));
        };
        update_book_series(&tx, isbn, series, author)?;
    }
    if let Some(title) = optional_text(&request.new_title) {
        update_book_title(&tx, isbn, title)?;
    }
    if let Some(index) = new_index {
        update_book_series_index(&tx, isbn, index)?;
    }
    let final_isbn = match new_isbn {
        Some(new_isbn) => {
            update_book_isbn(&tx, isbn, new_isbn)?;
            new_isbn
        }
        None => isbn,
    };
    commit(tx)?;

    let Some(updated) = BookSummary::load(conn, final_isbn)? else {
        return Err(FlowError::anomaly(format!(
            "Book with ISBN {final_isbn} is missing after the update."
        )));
    };
    info!(isbn, final_isbn, "updated book");
    Ok(Outcome::Applied(format!("\tUpdated data to:\n{updated}")))
}

/// Two phases: pick the book and show it, then ask for the new values.
/// A retryable error in either phase starts over from the ISBN prompt.
pub fn update_book_flow(conn: &mut Connection, io: &mut dyn Prompter) -> Result<()> {
    if let Err(err) = ensure_tables(conn, &["authors", "series", "books"]) {
        return io.say(&err.to_string());
    }
    run_flow(io, |io| {
        let raw = io.ask("Current ISBN: ")?;
        let current = match find_book(conn, &raw) {
            Ok(Some(current)) => current,
            Ok(None) => {
                return Ok(Ok(Outcome::Cancelled(
                    "Inputs were empty, cancelling.".into(),
                )))
            }
            Err(err) => return Ok(Err(err)),
        };
        io.say(&format!("\tCurrent data:\n{current}"))?;
        let request = UpdateBookRequest::prompt(&mut *io, current.isbn)?;
        Ok(update_book(conn, &request))
    })
}

#[derive(Debug, Clone, Default)]
pub struct DeleteBookRequest {
    pub isbn: String,
}

impl DeleteBookRequest {
    pub fn prompt(io: &mut dyn Prompter) -> Result<Self> {
        Ok(Self {
            isbn: io.ask("Book's ISBN: ")?,
        })
    }
}

/// Remove a book once its statistics are gone.
pub fn delete_book(conn: &mut Connection, request: &DeleteBookRequest) -> FlowResult {
    let Some(isbn) = optional_number::<i64>(&request.isbn, ISBN_ERROR)? else {
        return Ok(Outcome::Cancelled("Input was empty, cancelling.".into()));
    };

    let tx = begin(conn)?;
    if get_book_isbn(&tx, Some(isbn))?.is_none() {
        return Err(missing_book(isbn));
    }
    if get_statistics_isbn(&tx, Some(isbn))?.is_some() {
        return Err(FlowError::precondition(format!(
            "There are some statistics available for ISBN {isbn}, remove them first and try again."
        )));
    }
    delete_book_isbn(&tx, isbn)?;
    commit(tx)?;

    if get_book_isbn(conn, Some(isbn))?.is_some() {
        return Err(FlowError::anomaly(format!(
            "Book with ISBN \"{isbn}\" was NOT removed."
        )));
    }
    info!(isbn, "removed book");
    Ok(Outcome::Applied(format!("Book with ISBN \"{isbn}\" was removed.")))
}

pub fn delete_book_flow(conn: &mut Connection, io: &mut dyn Prompter) -> Result<()> {
    guarded(
        conn,
        io,
        &["books", "statistics"],
        DeleteBookRequest::prompt,
        delete_book,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        create_tables, delete_statistics_isbn, get_book_series_id, get_book_title,
        get_max_author_id, get_statistics, open_in_memory,
    };
    use crate::flows::ScriptedPrompter;

    const MARTIAN: i64 = 9780804139021;

    fn library() -> Connection {
        let conn = open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn martian() -> AddBookRequest {
        AddBookRequest {
            isbn: MARTIAN.to_string(),
            title: "The Martian".into(),
            series: "The Martian".into(),
            series_index: "1".into(),
            author: "Andy Weir".into(),
            chapters: "26".into(),
            pages: "384".into(),
            released: "2011-09-27".into(),
            finished: "2023-06-20".into(),
            speed: "150".into(),
            time: "8.5".into(),
        }
    }

    fn seeded() -> Connection {
        let mut conn = library();
        add_book(&mut conn, &martian()).unwrap();
        conn
    }

    #[test]
    fn add_book_round_trip() {
        let mut conn = library();
        let outcome = add_book(&mut conn, &martian()).unwrap();
        assert_eq!(
            outcome,
            Outcome::Applied(format!("Added book with ISBN: {MARTIAN}"))
        );
        assert_eq!(get_book_isbn(&conn, Some(MARTIAN)).unwrap(), Some(MARTIAN));
        assert_eq!(get_statistics_isbn(&conn, Some(MARTIAN)).unwrap(), Some(MARTIAN));
        assert_eq!(get_book_series_id(&conn, MARTIAN).unwrap(), Some(1));

        let stats = get_statistics(&conn, MARTIAN).unwrap().unwrap();
        assert_eq!(stats.fields.time, Some(8.5));
        assert_eq!(stats.fields.released.as_deref(), Some("2011-09-27"));
    }

    #[test]
    fn add_book_guards() {
        let mut conn = library();
        assert_eq!(
            add_book(&mut conn, &AddBookRequest::default()).unwrap(),
            Outcome::Cancelled("Inputs were empty, cancelling.".into())
        );

        let no_isbn = AddBookRequest {
            title: "Untitled".into(),
            ..AddBookRequest::default()
        };
        assert_eq!(
            add_book(&mut conn, &no_isbn).unwrap_err().to_string(),
            "ISBN was empty while at least one other input was not, try again."
        );
    }

    #[test]
    fn numeric_failure_leaves_store_untouched() {
        let mut conn = library();
        for broken in [
            AddBookRequest { isbn: "test".into(), ..martian() },
            AddBookRequest { chapters: "test".into(), ..martian() },
            AddBookRequest { time: "test".into(), ..martian() },
            AddBookRequest { series_index: "1,5".into(), ..martian() },
        ] {
            let err = add_book(&mut conn, &broken).unwrap_err();
            assert!(err.is_retryable());
            assert_eq!(err.to_string(), NUMBER_ERROR);
        }
        assert_eq!(get_max_author_id(&conn).unwrap(), 0);
        assert_eq!(get_book_isbn(&conn, Some(MARTIAN)).unwrap(), None);
    }

    #[test]
    fn add_book_without_author_skips_series() {
        let mut conn = library();
        let request = AddBookRequest {
            isbn: "1234".into(),
            series: "Orphan".into(),
            ..AddBookRequest::default()
        };
        add_book(&mut conn, &request).unwrap();
        assert_eq!(get_book_series_id(&conn, 1234).unwrap(), None);
        assert_eq!(get_statistics_isbn(&conn, Some(1234)).unwrap(), Some(1234));
    }

    #[test]
    fn get_books_by_isbn() {
        let mut conn = seeded();
        let outcome = get_books(
            &mut conn,
            &GetBooksRequest {
                isbn: MARTIAN.to_string(),
                ..GetBooksRequest::default()
            },
        )
        .unwrap();
        let message = outcome.message();
        assert!(message.starts_with("Found 1 book(s):\n\tBook #1:\nISBN:\t\t9780804139021\n"));
        assert!(message.contains("Author:\t\tAndy Weir"));
    }

    #[test]
    fn get_books_guards() {
        let mut conn = seeded();
        assert_eq!(
            get_books(&mut conn, &GetBooksRequest::default()).unwrap(),
            Outcome::Cancelled("Inputs were empty, cancelling.".into())
        );
        let bad = GetBooksRequest {
            isbn: "test".into(),
            ..GetBooksRequest::default()
        };
        assert_eq!(get_books(&mut conn, &bad).unwrap_err().to_string(), ISBN_ERROR);

        let nobody = GetBooksRequest {
            author: "Hugh".into(),
            ..GetBooksRequest::default()
        };
        assert_eq!(
            get_books(&mut conn, &nobody).unwrap_err().to_string(),
            "No books found matching the inputs, try again."
        );
    }

    #[test]
    fn update_book_applies_non_empty_fields() {
        let mut conn = seeded();
        let request = UpdateBookRequest {
            isbn: MARTIAN,
            new_isbn: "1111".into(),
            new_title: "Mark Watney".into(),
            new_series: "New Series".into(),
            new_author: "New Author".into(),
            ..UpdateBookRequest::default()
        };
        let outcome = update_book(&mut conn, &request).unwrap();
        assert_eq!(
            outcome.message(),
            "\tUpdated data to:\nISBN:\t\t1111\nTitle:\t\tMark Watney\nSeries name:\tNew Series\nIndex:\t\t1.0\nAuthor:\t\tNew Author"
        );
        assert_eq!(get_book_isbn(&conn, Some(MARTIAN)).unwrap(), None);
        // Statistics keep their own key.
        assert_eq!(get_statistics_isbn(&conn, Some(MARTIAN)).unwrap(), Some(MARTIAN));
    }

    #[test]
    fn update_book_guards() {
        let mut conn = seeded();
        insert_book(&conn, 1111, None, None, Some("Artemis")).unwrap();

        let empty = UpdateBookRequest {
            isbn: MARTIAN,
            ..UpdateBookRequest::default()
        };
        assert_eq!(
            update_book(&mut conn, &empty).unwrap_err().to_string(),
            "Did not provide updated data, try again."
        );

        let taken = UpdateBookRequest {
            new_isbn: "1111".into(),
            ..empty.clone()
        };
        assert_eq!(
            update_book(&mut conn, &taken).unwrap_err().to_string(),
            "Book with ISBN 1111 already exists in the database, try again."
        );

        let orphan = UpdateBookRequest {
            isbn: 1111,
            new_series: "Artemis".into(),
            ..UpdateBookRequest::default()
        };
        assert_eq!(
            update_book(&mut conn, &orphan).unwrap_err().to_string(),
            "Series and author are both needed to move the book, try again."
        );
        assert_eq!(get_book_title(&conn, MARTIAN).unwrap().as_deref(), Some("The Martian"));
    }

    #[test]
    fn interactive_update_shows_current_data() {
        let mut conn = seeded();
        let mut io = ScriptedPrompter::new([
            "test",
            "9780804139021",
            "", "Project Hail Mary", "", "", "",
        ]);
        update_book_flow(&mut conn, &mut io).unwrap();
        assert_eq!(io.said[0], NUMBER_ERROR);
        assert!(io.said[1].starts_with("\tCurrent data:\nISBN:\t\t9780804139021\nTitle:\t\tThe Martian\n"));
        assert!(io.last_said().unwrap().contains("Title:\t\tProject Hail Mary"));
    }

    #[test]
    fn delete_book_requires_statistics_gone() {
        let mut conn = seeded();
        let delete = |conn: &mut Connection, isbn: &str| {
            delete_book(conn, &DeleteBookRequest { isbn: isbn.into() })
        };

        assert_eq!(
            delete(&mut conn, "").unwrap(),
            Outcome::Cancelled("Input was empty, cancelling.".into())
        );
        assert_eq!(delete(&mut conn, "abc").unwrap_err().to_string(), ISBN_ERROR);
        assert_eq!(
            delete(&mut conn, "42").unwrap_err().to_string(),
            "Book with ISBN 42 does NOT exist in the database, try again."
        );

        let err = delete(&mut conn, &MARTIAN.to_string()).unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            format!("There are some statistics available for ISBN {MARTIAN}, remove them first and try again.")
        );

        delete_statistics_isbn(&conn, MARTIAN).unwrap();
        assert_eq!(
            delete(&mut conn, &MARTIAN.to_string()).unwrap(),
            Outcome::Applied(format!("Book with ISBN \"{MARTIAN}\" was removed."))
        );
        assert_eq!(get_book_isbn(&conn, Some(MARTIAN)).unwrap(), None);
    }
}
