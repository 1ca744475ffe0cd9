//! Declarative menu tree. The JSON is embedded at compile time; command
//! leaves name a [`FlowId`] so unknown commands fail while loading.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::flows::FlowId;

const MENU_JSON: &str = include_str!("../../assets/menu.json");

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MenuNode {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub options: Vec<MenuEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MenuEntry {
    Menu(MenuNode),
    Command { title: String, command: FlowId },
}

impl MenuEntry {
    pub fn title(&self) -> &str {
        match self {
            MenuEntry::Menu(node) => &node.title,
            MenuEntry::Command { title, .. } => title,
        }
    }
}

/// Parse the bundled menu.
pub fn load_menu() -> Result<MenuNode> {
    parse_menu(MENU_JSON)
}

pub fn parse_menu(raw: &str) -> Result<MenuNode> {
    serde_json::from_str(raw).context("failed to parse menu definition")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands(node: &MenuNode, found: &mut Vec<FlowId>) {
        for entry in &node.options {
            match entry {
                MenuEntry::Menu(child) => commands(child, found),
                MenuEntry::Command { command, .. } => found.push(*command),
            }
        }
    }

    #[test]
    fn bundled_menu_reaches_every_flow() {
        let menu = load_menu().unwrap();
        assert_eq!(menu.title, "Reading Statistics");

        let mut found = Vec::new();
        commands(&menu, &mut found);
        assert_eq!(found.len(), 13);
        assert!(found.contains(&FlowId::LoadLibrary));
        assert!(found.contains(&FlowId::DeleteStatistics));
    }

    #[test]
    fn unknown_command_is_rejected() {
        let raw = r#"{"title": "Main", "options": [
            {"title": "Oops", "type": "command", "command": "format_disk"}
        ]}"#;
        assert!(parse_menu(raw).is_err());
    }
}
