//! Interactive CRUD operations. Each flow is split in two: a prompt function
//! that fills an immutable request through a [`Prompter`], and a handler that
//! turns the request into a [`FlowResult`] without touching the terminal.
//! [`run_flow`] ties them together and re-prompts on retryable errors.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use rusqlite::{Connection, Transaction};
use serde::Deserialize;
use tracing::warn;

use crate::config::Config;
use crate::db::check_tables;
use crate::error::FlowError;

pub mod authors;
pub mod books;
pub mod series;
pub mod setup;
pub mod statistics;

/// Successful end states of a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The mutation was committed or the query answered.
    Applied(String),
    /// Every input was empty.
    Cancelled(String),
}

impl Outcome {
    pub fn message(&self) -> &str {
        match self {
            Outcome::Applied(message) | Outcome::Cancelled(message) => message,
        }
    }
}

pub type FlowResult = std::result::Result<Outcome, FlowError>;

/// Line-based conversation with the user.
pub trait Prompter {
    /// Show `label` and return the trimmed answer.
    fn ask(&mut self, label: &str) -> Result<String>;
    /// Print a block of text.
    fn say(&mut self, text: &str) -> Result<()>;
}

/// Reads answers from stdin and prints to stdout.
#[derive(Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn ask(&mut self, label: &str) -> Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{label}").context("failed to write prompt")?;
        stdout.flush().context("failed to flush prompt")?;

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read answer")?;
        if read == 0 {
            return Err(anyhow!("input closed"));
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, text: &str) -> Result<()> {
        println!("\n{text}\n");
        Ok(())
    }
}

/// Canned answers for tests. Running out of answers is an error, which ends
/// the flow the same way closing stdin would.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    /// Every prompt label and message, in order.
    pub transcript: Vec<String>,
    /// Only the messages passed to `say`.
    pub said: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
            said: Vec::new(),
        }
    }

    /// The last message printed, if any.
    pub fn last_said(&self) -> Option<&str> {
        self.said.last().map(String::as_str)
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, label: &str) -> Result<String> {
        self.transcript.push(label.to_string());
        let answer = self
            .answers
            .pop_front()
            .ok_or_else(|| anyhow!("no answer scripted for {label:?}"))?;
        Ok(answer.trim().to_string())
    }

    fn say(&mut self, text: &str) -> Result<()> {
        self.transcript.push(text.to_string());
        self.said.push(text.to_string());
        Ok(())
    }
}

/// Prompt, handle, print; repeat while the handler asks for another try.
pub fn run_flow<F>(io: &mut dyn Prompter, mut attempt: F) -> Result<()>
where
    F: FnMut(&mut dyn Prompter) -> Result<FlowResult>,
{
    loop {
        match attempt(&mut *io)? {
            Ok(outcome) => return io.say(outcome.message()),
            Err(err) if err.is_retryable() => io.say(&err.to_string())?,
            Err(err) => {
                if matches!(err, FlowError::Anomaly(_) | FlowError::Storage(_)) {
                    warn!(error = %err, "flow ended abnormally");
                }
                return io.say(&err.to_string());
            }
        }
    }
}

/// Schema pre-flight shared by every flow.
pub(crate) fn ensure_tables(conn: &Connection, tables: &[&str]) -> std::result::Result<(), FlowError> {
    let problems = check_tables(conn, tables);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(FlowError::Schema {
            checked: tables.len(),
            problems,
        })
    }
}

/// Run the schema check, then the prompt/handle loop. A broken schema is
/// reported once without prompting.
pub(crate) fn guarded<R, P, H>(
    conn: &mut Connection,
    io: &mut dyn Prompter,
    tables: &[&str],
    mut prompt: P,
    mut handle: H,
) -> Result<()>
where
    P: FnMut(&mut dyn Prompter) -> Result<R>,
    H: FnMut(&mut Connection, &R) -> FlowResult,
{
    if let Err(err) = ensure_tables(conn, tables) {
        return io.say(&err.to_string());
    }
    run_flow(io, |io| {
        let request = prompt(&mut *io)?;
        Ok(handle(conn, &request))
    })
}

/// Open the unit of work for one flow invocation.
pub(crate) fn begin(conn: &mut Connection) -> std::result::Result<Transaction<'_>, FlowError> {
    Ok(conn.transaction().context("failed to start transaction")?)
}

pub(crate) fn commit(tx: Transaction<'_>) -> std::result::Result<(), FlowError> {
    Ok(tx.commit().context("failed to commit changes")?)
}

/// Parse an optional number. Empty input means "unset", never zero.
pub(crate) fn optional_number<T: FromStr>(
    raw: &str,
    message: &str,
) -> std::result::Result<Option<T>, FlowError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| FlowError::validation(message))
}

/// Empty strings become `None`.
pub(crate) fn optional_text(raw: &str) -> Option<&str> {
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

pub(crate) const NUMBER_ERROR: &str = "Unable to convert some inputs to number, try again.";
pub(crate) const ISBN_ERROR: &str = "Unable to convert ISBN to number, try again.";

/// Every operation the menu can trigger. The menu file names these in
/// snake_case and serde resolves them while the menu loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowId {
    DatabaseSetup,
    ViewsSetup,
    LoadLibrary,
    AddBook,
    GetBooks,
    UpdateAuthor,
    UpdateSeries,
    UpdateBook,
    UpdateStatistics,
    DeleteAuthor,
    DeleteSeries,
    DeleteBook,
    DeleteStatistics,
}

impl FlowId {
    /// Static dispatch from menu entry to flow.
    pub fn run(self, conn: &mut Connection, config: &Config, io: &mut dyn Prompter) -> Result<()> {
        match self {
            FlowId::DatabaseSetup => setup::database_setup(conn, io),
            FlowId::ViewsSetup => setup::views_setup(conn, &config.views_path()?, io),
            FlowId::LoadLibrary => setup::load_json(conn, &config.library_path()?, io),
            FlowId::AddBook => books::add_book_flow(conn, io),
            FlowId::GetBooks => books::get_books_flow(conn, io),
            FlowId::UpdateAuthor => authors::update_author_flow(conn, io),
            FlowId::UpdateSeries => series::update_series_flow(conn, io),
            FlowId::UpdateBook => books::update_book_flow(conn, io),
            FlowId::UpdateStatistics => statistics::update_statistics_flow(conn, io),
            FlowId::DeleteAuthor => authors::delete_author_flow(conn, io),
            FlowId::DeleteSeries => series::delete_series_flow(conn, io),
            FlowId::DeleteBook => books::delete_book_flow(conn, io),
            FlowId::DeleteStatistics => statistics::delete_statistics_flow(conn, io),
        }
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FlowId::DatabaseSetup => "database setup",
            FlowId::ViewsSetup => "views setup",
            FlowId::LoadLibrary => "library import",
            FlowId::AddBook => "add book",
            FlowId::GetBooks => "book search",
            FlowId::UpdateAuthor => "author update",
            FlowId::UpdateSeries => "series update",
            FlowId::UpdateBook => "book update",
            FlowId::UpdateStatistics => "statistics update",
            FlowId::DeleteAuthor => "author removal",
            FlowId::DeleteSeries => "series removal",
            FlowId::DeleteBook => "book removal",
            FlowId::DeleteStatistics => "statistics removal",
        };
        f.write_str(label)
    }
}
