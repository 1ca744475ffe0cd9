use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use super::{begin, commit, guarded, FlowResult, Outcome, Prompter};
use crate::db::{
    delete_series_id, get_author_id, get_series_id, get_series_number_of_books, insert_author,
    update_series_author, update_series_name,
};
use crate::error::FlowError;

#[derive(Debug, Clone, Default)]
pub struct UpdateSeriesRequest {
    pub old_series: String,
    pub old_author: String,
    /// Empty keeps the current name.
    pub new_series: String,
    /// Empty keeps the current author.
    pub new_author: String,
}

impl UpdateSeriesRequest {
    pub fn prompt(io: &mut dyn Prompter) -> Result<Self> {
        Ok(Self {
            old_series: io.ask("Series current name: ")?,
            old_author: io.ask("Author's current name: ")?,
            new_series: io.ask("Series new name: ")?,
            new_author: io.ask("Author's new name: ")?,
        })
    }
}

/// Rename a series, move it to another author, or both.
pub fn update_series(conn: &mut Connection, request: &UpdateSeriesRequest) -> FlowResult {
    let UpdateSeriesRequest {
        old_series,
        old_author,
        new_series,
        new_author,
    } = request;

    if (old_series.is_empty() && old_author.is_empty())
        || (new_series.is_empty() && new_author.is_empty())
    {
        return Ok(Outcome::Cancelled("Mandatory fields were empty, cancelling.".into()));
    }
    if old_series.is_empty() || old_author.is_empty() {
        return Err(FlowError::validation(
            "One of the mandatory fields was empty, try again.",
        ));
    }

    let tx = begin(conn)?;
    let old_author_id = get_author_id(&tx, old_author)?;
    let Some(series_id) = get_series_id(&tx, old_series, old_author_id)? else {
        return Err(FlowError::validation(format!(
            "Series \"{old_series}\" written by \"{old_author}\" does not exist in the database, try again."
        )));
    };

    let target_series = if new_series.is_empty() { old_series } else { new_series };
    let target_author = if new_author.is_empty() { old_author } else { new_author };
    let target_author_id = get_author_id(&tx, target_author)?;
    if get_series_id(&tx, target_series, target_author_id)?.is_some() {
        return Err(FlowError::validation(format!(
            "Series \"{target_series}\" written by \"{target_author}\" already exists in the database, try again."
        )));
    }

    let mut changes = Vec::new();
    if !new_series.is_empty() {
        update_series_name(&tx, series_id, new_series)?;
        changes.push(format!(
            "Updated series name from \"{old_series}\" to \"{new_series}\"."
        ));
    }
    if !new_author.is_empty() {
        insert_author(&tx, new_author)?;
        let Some(author_id) = get_author_id(&tx, new_author)? else {
            return Err(FlowError::anomaly(format!(
                "Author \"{new_author}\" could not be added."
            )));
        };
        update_series_author(&tx, series_id, author_id)?;
        changes.push(format!(
            "Updated author from \"{old_author}\" to \"{new_author}\"."
        ));
    }
    commit(tx)?;

    info!(series_id, %target_series, %target_author, "updated series");
    Ok(Outcome::Applied(changes.join("\n")))
}

pub fn update_series_flow(conn: &mut Connection, io: &mut dyn Prompter) -> Result<()> {
    guarded(
        conn,
        io,
        &["authors", "series"],
        UpdateSeriesRequest::prompt,
        update_series,
    )
}

#[derive(Debug, Clone, Default)]
pub struct DeleteSeriesRequest {
    pub series: String,
    pub author: String,
}

impl DeleteSeriesRequest {
    pub fn prompt(io: &mut dyn Prompter) -> Result<Self> {
        Ok(Self {
            series: io.ask("Series name: ")?,
            author: io.ask("Author's name: ")?,
        })
    }
}

/// Remove a series that no book points at.
pub fn delete_series(conn: &mut Connection, request: &DeleteSeriesRequest) -> FlowResult {
    let DeleteSeriesRequest { series, author } = request;

    if series.is_empty() && author.is_empty() {
        return Ok(Outcome::Cancelled("Inputs were empty, cancelling.".into()));
    }
    if series.is_empty() || author.is_empty() {
        return Err(FlowError::validation("One of the inputs was empty, try again."));
    }

    let tx = begin(conn)?;
    let author_id = get_author_id(&tx, author)?;
    let Some(series_id) = get_series_id(&tx, series, author_id)? else {
        return Err(FlowError::validation(format!(
            "Series \"{series}\" by \"{author}\" does NOT exist in the database, try again."
        )));
    };

    let books = get_series_number_of_books(&tx, Some(series_id))?;
    if books > 0 {
        return Err(FlowError::precondition(format!(
            "Could not remove series \"{series}\". There is/are still {books} book(s) connected to this series, unlink them first."
        )));
    }

    delete_series_id(&tx, series_id)?;
    commit(tx)?;

    if get_series_id(conn, series, author_id)?.is_some() {
        return Err(FlowError::anomaly(format!(
            "Series \"{series}\" by \"{author}\" was NOT removed."
        )));
    }
    info!(series_id, %series, %author, "removed series");
    Ok(Outcome::Applied(format!(
        "Series \"{series}\" by \"{author}\" was removed."
    )))
}

pub fn delete_series_flow(conn: &mut Connection, io: &mut dyn Prompter) -> Result<()> {
    guarded(
        conn,
        io,
        &["authors", "series", "books"],
        DeleteSeriesRequest::prompt,
        delete_series,
    )
}
