//! Core library surface for the reading statistics tracker.
//!
//! `main.rs` only wires configuration, logging, the SQLite connection and the
//! menu shell together; everything it touches is re-exported here so the
//! integration tests can drive the same pieces.
pub mod config;
pub mod db;
pub mod error;
pub mod flows;
pub mod logging;
pub mod models;
pub mod ui;

pub use config::Config;
pub use error::{ConfigError, FlowError};
pub use flows::{FlowId, Outcome, Prompter, ScriptedPrompter};
pub use models::{Author, Book, BookRecord, Series, Statistics, StatisticsFields};
pub use ui::{build_app, run_app, App};
