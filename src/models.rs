//! Domain models that mirror the SQLite schema and get passed between the
//! repository functions, the flows and the menu. They stay plain data holders;
//! every rule about how they relate lives in `db` and `flows`.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
/// A person who writes series. Names are unique across the table.
pub struct Author {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A named series. The same name may exist once per author.
pub struct Series {
    pub id: i64,
    pub name: String,
    pub author_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
/// Row of the `books` table. The ISBN is supplied by the user and doubles as
/// the key of the matching statistics row.
pub struct Book {
    pub isbn: i64,
    /// Series the book belongs to, if any.
    pub series_id: Option<i64>,
    /// Fractional position inside the series (1.0, 1.5, ...).
    pub series_index: Option<f64>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
/// Row of the `statistics` table.
pub struct Statistics {
    pub isbn: i64,
    pub fields: StatisticsFields,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// The nullable reading figures stored per ISBN. Split out from
/// [`Statistics`] so inserts can take them as one argument.
pub struct StatisticsFields {
    pub chapters: Option<i64>,
    pub pages: Option<i64>,
    /// Release date, stored as free text (the tool never interprets it).
    pub released: Option<String>,
    /// Date the book was finished, free text as well.
    pub finished: Option<String>,
    /// Words per minute.
    pub speed: Option<i64>,
    /// Hours spent reading.
    pub time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Denormalized view of one book: author and series names, the book columns
/// and every statistics column. Search results come back in this shape and
/// the bulk-import file stores its entries the same way.
pub struct BookRecord {
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub series_name: Option<String>,
    #[serde(default)]
    pub isbn: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub series_index: Option<f64>,
    #[serde(default)]
    pub chapters: Option<i64>,
    #[serde(default)]
    pub pages: Option<i64>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub finished: Option<String>,
    #[serde(default)]
    pub speed: Option<i64>,
    #[serde(default)]
    pub time: Option<f64>,
}

impl BookRecord {
    /// Pull the statistics half of the record out for an insert.
    pub fn statistics_fields(&self) -> StatisticsFields {
        StatisticsFields {
            chapters: self.chapters,
            pages: self.pages,
            released: self.released.clone(),
            finished: self.finished.clone(),
            speed: self.speed,
            time: self.time,
        }
    }
}

impl fmt::Display for BookRecord {
    /// Tab-aligned block printed for every Get Books match. Missing values
    /// render as `None` so the user can tell "unset" from an empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ISBN:\t\t{}", show(&self.isbn))?;
        writeln!(f, "Author:\t\t{}", show(&self.author_name))?;
        writeln!(f, "Series:\t\t{}", show(&self.series_name))?;
        writeln!(f, "Title:\t\t{}", show(&self.title))?;
        writeln!(f, "Series index:\t{}", show_real(&self.series_index))?;
        writeln!(f, "Chapters:\t{}", show(&self.chapters))?;
        writeln!(f, "Pages:\t\t{}", show(&self.pages))?;
        writeln!(f, "Released:\t{}", show(&self.released))?;
        writeln!(f, "Finished:\t{}", show(&self.finished))?;
        writeln!(f, "Speed:\t\t{}", show(&self.speed))?;
        write!(f, "Time:\t\t{}", show_real(&self.time))
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = &self.fields;
        writeln!(f, "ISBN:\t\t{}", self.isbn)?;
        writeln!(f, "Chapters:\t{}", show(&fields.chapters))?;
        writeln!(f, "Pages:\t\t{}", show(&fields.pages))?;
        writeln!(f, "Released:\t{}", show(&fields.released))?;
        writeln!(f, "Finished:\t{}", show(&fields.finished))?;
        writeln!(f, "Speed:\t\t{}", show(&fields.speed))?;
        write!(f, "Time:\t\t{}", show_real(&fields.time))
    }
}

/// Render an optional column value, falling back to `None`.
pub fn show<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "None".to_string(),
    }
}

/// Like [`show`], but REAL columns keep their fractional part (`1.0`, not `1`).
pub fn show_real(value: &Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:?}"),
        None => "None".to_string(),
    }
}
