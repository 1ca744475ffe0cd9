//! Error taxonomy for the flow layer. Repository functions only ever return
//! `anyhow::Result` with empty/`None` values for "not found"; the flows turn
//! those into one of the variants below and the driver prints them.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// One target that failed the pre-flight check in `check_tables`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableProblem {
    /// Table name or the raw query that was tried.
    pub target: String,
    /// SQLite's explanation, e.g. `no such table: authors`.
    pub reason: String,
}

impl fmt::Display for TableProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.reason)
    }
}

/// Everything a flow can fail with.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Required tables or columns are missing. Ends the flow.
    #[error("{}", schema_message(.checked, .problems))]
    Schema {
        /// How many targets the flow checked; picks the wording.
        checked: usize,
        problems: Vec<TableProblem>,
    },

    /// Bad input or a reference that does not resolve. The driver re-prompts.
    #[error("{0}")]
    Validation(String),

    /// Dependent rows exist. Reported once, no retry.
    #[error("{0}")]
    Precondition(String),

    /// Post-mutation verification disagreed with what was just written.
    #[error("{0}")]
    Anomaly(String),

    /// A bulk-import source could not be read, parsed or applied.
    #[error("Import failed: {0:#}")]
    Import(#[source] anyhow::Error),

    /// SQLite rejected a statement the repository issued.
    #[error("The database rejected the operation. Please fix it manually:\n{}", surface_error(.0))]
    Storage(#[from] anyhow::Error),
}

impl FlowError {
    /// Only validation failures send the user back to the prompt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlowError::Validation(_))
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        FlowError::Validation(message.into())
    }

    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        FlowError::Precondition(message.into())
    }

    pub(crate) fn anomaly(message: impl Into<String>) -> Self {
        FlowError::Anomaly(message.into())
    }
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &anyhow::Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

fn schema_message(checked: &usize, problems: &[TableProblem]) -> String {
    let header = if *checked == 1 {
        "Table corrupted. Please fix it manually:"
    } else {
        "At least one table is corrupted. Please fix them manually:"
    };
    let listed: Vec<String> = problems.iter().map(|p| format!("  {p}")).collect();
    format!("{header}\n{}", listed.join("\n"))
}

/// Failures while loading `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not locate home directory")]
    NoHome,
}
