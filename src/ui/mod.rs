//! Menu shell: a ratatui list over the bundled menu tree. Selecting a command
//! hands the terminal back to the flow for the length of one run.

mod app;
mod helpers;
mod menu;
mod terminal;

pub use app::{build_app, Action, App};
pub use menu::{load_menu, parse_menu, MenuEntry, MenuNode};
pub use terminal::run_app;
