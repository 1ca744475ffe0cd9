use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;
use tracing::{error, info};

use crate::config::Config;
use crate::error::surface_error;
use crate::flows::{FlowId, Prompter};

use super::helpers::centered_rect;
use super::menu::{MenuEntry, MenuNode};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// What the terminal loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Run(FlowId),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Menu state plus the connection every flow borrows.
pub struct App {
    conn: Connection,
    config: Config,
    menu: MenuNode,
    /// Option indices leading from the root to the open submenu.
    path: Vec<usize>,
    /// Highlighted row; `options.len()` is the Exit/Return row.
    selected: usize,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(conn: Connection, config: Config, menu: MenuNode) -> Self {
        Self {
            conn,
            config,
            menu,
            path: Vec::new(),
            selected: 0,
            status: None,
        }
    }

    fn current(&self) -> &MenuNode {
        let mut node = &self.menu;
        for &index in &self.path {
            if let Some(MenuEntry::Menu(child)) = node.options.get(index) {
                node = child;
            }
        }
        node
    }

    fn parent(&self) -> Option<&MenuNode> {
        let (_, ancestors) = self.path.split_last()?;
        let mut node = &self.menu;
        for &index in ancestors {
            if let Some(MenuEntry::Menu(child)) = node.options.get(index) {
                node = child;
            }
        }
        Some(node)
    }

    /// Label of the row below the options.
    pub fn last_option(&self) -> String {
        match self.parent() {
            Some(parent) => format!("Return to {} menu", parent.title),
            None => "Exit".to_string(),
        }
    }

    pub fn title(&self) -> &str {
        &self.current().title
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Digits jump, arrows wrap, Enter activates, `q`/Esc go back.
    pub fn handle_key(&mut self, code: KeyCode) -> Action {
        let rows = self.current().options.len() + 1;
        match code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let digit = c as usize - '0' as usize;
                if (1..=rows).contains(&digit) {
                    self.selected = digit - 1;
                }
                Action::None
            }
            KeyCode::Down => {
                self.selected = (self.selected + 1) % rows;
                Action::None
            }
            KeyCode::Up => {
                self.selected = (self.selected + rows - 1) % rows;
                Action::None
            }
            KeyCode::Enter => self.activate(),
            KeyCode::Char('q') | KeyCode::Esc => self.back(),
            _ => Action::None,
        }
    }

    fn activate(&mut self) -> Action {
        match self.current().options.get(self.selected) {
            None => self.back(),
            Some(MenuEntry::Menu(_)) => {
                self.path.push(self.selected);
                self.selected = 0;
                self.status = None;
                Action::None
            }
            Some(MenuEntry::Command { command, .. }) => Action::Run(*command),
        }
    }

    fn back(&mut self) -> Action {
        match self.path.pop() {
            Some(index) => {
                self.selected = index;
                self.status = None;
                Action::None
            }
            None => Action::Quit,
        }
    }

    /// Run a flow against the owned connection, remembering how it ended for
    /// the footer.
    pub fn run_flow(&mut self, flow: FlowId, io: &mut dyn Prompter) {
        info!(?flow, "running flow");
        match flow.run(&mut self.conn, &self.config, io) {
            Ok(()) => self.set_status(format!("Finished {flow}."), StatusKind::Info),
            Err(err) => {
                error!(?flow, error = %err, "flow aborted");
                self.set_status(surface_error(&err), StatusKind::Error);
            }
        }
    }

    fn set_status(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        self.draw_menu(frame, centered_rect(70, 80, content_area));
        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }
    }

    fn draw_menu(&self, frame: &mut Frame, area: Rect) {
        let node = self.current();
        let block = Block::default().borders(Borders::ALL);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);
        if inner.height < 3 {
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(inner);

        let header = Paragraph::new(vec![
            Line::from(Span::styled(
                node.title.clone(),
                Style::default().add_modifier(Modifier::REVERSED),
            )),
            Line::from(""),
            Line::from(Span::styled(
                node.subtitle.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ]);
        frame.render_widget(header, chunks[0]);

        let mut items: Vec<ListItem> = node
            .options
            .iter()
            .enumerate()
            .map(|(i, entry)| ListItem::new(format!("{} - {}", i + 1, entry.title())))
            .collect();
        items.push(ListItem::new(format!(
            "{} - {}",
            node.options.len() + 1,
            self.last_option()
        )));

        let list = List::new(items).highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let instructions = Line::from(vec![
            Span::styled("[↑↓]", key_style),
            Span::raw(" Navigate   "),
            Span::styled("[1-9]", key_style),
            Span::raw(" Jump   "),
            Span::styled("[Enter]", key_style),
            Span::raw(" Select   "),
            Span::styled("[q]", key_style),
            Span::raw(" Back"),
        ]);

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }
}

/// Convenience for `main`: bundled menu plus an open connection.
pub fn build_app(conn: Connection, config: Config) -> Result<App> {
    Ok(App::new(conn, config, super::menu::load_menu()?))
}
