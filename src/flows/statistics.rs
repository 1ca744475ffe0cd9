use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use super::{
    begin, commit, ensure_tables, guarded, optional_number, optional_text, run_flow, FlowResult,
    Outcome, Prompter, ISBN_ERROR, NUMBER_ERROR,
};
use crate::db::{
    delete_statistics_isbn, get_statistics, get_statistics_isbn, update_statistics_chapters,
    update_statistics_finished, update_statistics_isbn, update_statistics_pages,
    update_statistics_released, update_statistics_speed, update_statistics_time,
};
use crate::error::FlowError;
use crate::models::Statistics;

const TABLES: [&str; 1] = ["statistics"];

fn missing_statistics(isbn: i64) -> FlowError {
    FlowError::validation(format!(
        "Statistics for ISBN {isbn} do NOT exist in the database, try again."
    ))
}

/// Resolve the ISBN typed in the first phase of Update Statistics. `None`
/// means the input was empty.
pub fn find_statistics(
    conn: &Connection,
    raw: &str,
) -> std::result::Result<Option<Statistics>, FlowError> {
    let Some(isbn) = optional_number::<i64>(raw, NUMBER_ERROR)? else {
        return Ok(None);
    };
    match get_statistics(conn, isbn)? {
        Some(stats) => Ok(Some(stats)),
        None => Err(missing_statistics(isbn)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateStatisticsRequest {
    /// Row being edited, already resolved.
    pub isbn: i64,
    pub new_isbn: String,
    pub chapters: String,
    pub pages: String,
    pub released: String,
    pub finished: String,
    pub speed: String,
    pub time: String,
}

impl UpdateStatisticsRequest {
    pub fn prompt(io: &mut dyn Prompter, isbn: i64) -> Result<Self> {
        Ok(Self {
            isbn,
            new_isbn: io.ask("New ISBN: ")?,
            chapters: io.ask("Number of chapters: ")?,
            pages: io.ask("Number of pages: ")?,
            released: io.ask("Release date: ")?,
            finished: io.ask("Date when finished reading: ")?,
            speed: io.ask("Reading speed [w/m]: ")?,
            time: io.ask("Reading time [h]: ")?,
        })
    }

    fn is_empty(&self) -> bool {
        [
            &self.new_isbn,
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

/// Overwrite every non-empty column, re-keying the row last.
pub fn update_statistics(conn: &mut Connection, request: &UpdateStatisticsRequest) -> FlowResult {
    let isbn = request.isbn;
    if request.is_empty() {
        return Err(FlowError::validation("Did not provide updated data, try again."));
    }

    let new_isbn = optional_number::<i64>(&request.new_isbn, NUMBER_ERROR)?;
    let chapters = optional_number::<i64>(&request.chapters, NUMBER_ERROR)?;
    let pages = optional_number::<i64>(&request.pages, NUMBER_ERROR)?;
    let speed = optional_number::<i64>(&request.speed, NUMBER_ERROR)?;
    let time = optional_number::<f64>(&request.time, NUMBER_ERROR)?;

    let tx = begin(conn)?;
    if get_statistics_isbn(&tx, Some(isbn))?.is_none() {
        return Err(missing_statistics(isbn));
    }
    if let Some(new_isbn) = new_isbn.filter(|&new| new != isbn) {
        if get_statistics_isbn(&tx, Some(new_isbn))?.is_some() {
            return Err(FlowError::validation(format!(
                "Statistics for ISBN {new_isbn} already exist in the database, try again."
            )));
        }
    }

    if let Some(chapters) = chapters {
        update_statistics_chapters(&tx, isbn, chapters)?;
    }
    if let Some(pages) = pages {
        update_statistics_pages(&tx, isbn, pages)?;
    }
    if let Some(released) = optional_text(&request.released) {
        update_statistics_released(&tx, isbn, released)?;
    }
    if let Some(finished) = optional_text(&request.finished) {
        update_statistics_finished(&tx, isbn, finished)?;
    }
    if let Some(speed) = speed {
        update_statistics_speed(&tx, isbn, speed)?;
    }
    if let Some(time) = time {
        update_statistics_time(&tx, isbn, time)?;
    }
    let final_isbn = match new_isbn {
        Some(new_isbn) => {
            update_statistics_isbn(&tx, isbn, new_isbn)?;
            new_isbn
        }
        None => isbn,
    };
    commit(tx)?;

    let Some(updated) = get_statistics(conn, final_isbn)? else {
        return Err(FlowError::anomaly(format!(
            "Statistics for ISBN {final_isbn} are missing after the update."
        )));
    };
    info!(isbn, final_isbn, "updated statistics");
    Ok(Outcome::Applied(format!("\tUpdated data to:\n{updated}")))
}

pub fn update_statistics_flow(conn: &mut Connection, io: &mut dyn Prompter) -> Result<()> {
    if let Err(err) = ensure_tables(conn, &TABLES) {
        return io.say(&err.to_string());
    }
    run_flow(io, |io| {
        let raw = io.ask("Book's ISBN: ")?;
        let current = match find_statistics(conn, &raw) {
            Ok(Some(current)) => current,
            Ok(None) => return Ok(Ok(Outcome::Cancelled("ISBN was empty, cancelling.".into()))),
            Err(err) => return Ok(Err(err)),
        };
        io.say(&format!("\tCurrent data:\n{current}"))?;
        let request = UpdateStatisticsRequest::prompt(&mut *io, current.isbn)?;
        Ok(update_statistics(conn, &request))
    })
}

#[derive(Debug, Clone, Default)]
pub struct DeleteStatisticsRequest {
    pub isbn: String,
}

impl DeleteStatisticsRequest {
    pub fn prompt(io: &mut dyn Prompter) -> Result<Self> {
        Ok(Self {
            isbn: io.ask("Book's ISBN: ")?,
        })
    }
}

pub fn delete_statistics(conn: &mut Connection, request: &DeleteStatisticsRequest) -> FlowResult {
    let Some(isbn) = optional_number::<i64>(&request.isbn, ISBN_ERROR)? else {
        return Ok(Outcome::Cancelled("Input was empty, cancelling.".into()));
    };

    let tx = begin(conn)?;
    if get_statistics_isbn(&tx, Some(isbn))?.is_none() {
        return Err(missing_statistics(isbn));
    }
    delete_statistics_isbn(&tx, isbn)?;
    commit(tx)?;

    if get_statistics_isbn(conn, Some(isbn))?.is_some() {
        return Err(FlowError::anomaly(format!(
            "Statistics for ISBN \"{isbn}\" were NOT removed."
        )));
    }
    info!(isbn, "removed statistics");
    Ok(Outcome::Applied(format!(
        "Statistics for ISBN \"{isbn}\" were removed."
    )))
}

pub fn delete_statistics_flow(conn: &mut Connection, io: &mut dyn Prompter) -> Result<()> {
    guarded(
        conn,
        io,
        &TABLES,
        DeleteStatisticsRequest::prompt,
        delete_statistics,
    )
}
