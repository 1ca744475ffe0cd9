use std::io::{self, BufRead, Stdout, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use super::app::{Action, App};
use crate::flows::ConsolePrompter;

type Backend = Terminal<CrosstermBackend<Stdout>>;

/// Spin up the terminal backend, enter the draw loop, and keep processing input
/// until the user leaves the root menu.
pub fn run_app(app: &mut App) -> Result<()> {
    let mut terminal = setup_terminal()?;

    let result = loop {
        terminal
            .draw(|frame| app.draw(frame))
            .context("failed to draw frame")?;

        if !event::poll(Duration::from_millis(250)).context("event polling failed")? {
            continue;
        }
        let Event::Key(key_event) = event::read().context("failed to read event")? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }
        if key_event.modifiers.contains(KeyModifiers::CONTROL)
            && key_event.code == KeyCode::Char('c')
        {
            break Ok(());
        }

        match app.handle_key(key_event.code) {
            Action::None => {}
            Action::Quit => break Ok(()),
            Action::Run(flow) => {
                cleanup_terminal(&mut terminal)?;
                app.run_flow(flow, &mut ConsolePrompter);
                wait_for_enter()?;
                resume_terminal(&mut terminal)?;
            }
        }
    };

    cleanup_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Backend> {
    let mut stdout = io::stdout();
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("failed to create terminal backend")
}

/// Flows talk to plain stdin/stdout, so the menu steps aside while they run.
fn resume_terminal(terminal: &mut Backend) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)
        .context("failed to enter alternate screen")?;
    terminal.clear().context("failed to clear terminal")
}

fn wait_for_enter() -> Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "Press Enter to continue...").context("failed to write prompt")?;
    stdout.flush().context("failed to flush prompt")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(())
}

fn cleanup_terminal(terminal: &mut Backend) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal
        .show_cursor()
        .context("failed to restore cursor visibility")
}
