use std::path::PathBuf;

use serde_json::Value;

use crate::error::ConsoleError;

/// An entry of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    CreateTable,
    DeleteTable,
    InsertRecord,
    DeleteRecord,
    UpdateRecord,
    ListRecords,
    StartServer,
    Exit,
}

impl MenuItem {
    /// Menu entries in display order; entry `n` is shown as `n + 1`.
    pub const ALL: [MenuItem; 8] = [
        MenuItem::CreateTable,
        MenuItem::DeleteTable,
        MenuItem::InsertRecord,
        MenuItem::DeleteRecord,
        MenuItem::UpdateRecord,
        MenuItem::ListRecords,
        MenuItem::StartServer,
        MenuItem::Exit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuItem::CreateTable => "Create Table",
            MenuItem::DeleteTable => "Delete Table",
            MenuItem::InsertRecord => "Insert Record",
            MenuItem::DeleteRecord => "Delete Record",
            MenuItem::UpdateRecord => "Update Record",
            MenuItem::ListRecords => "List Records",
            MenuItem::StartServer => "Start Server",
            MenuItem::Exit => "Exit",
        }
    }

    /// Resolve a menu answer: its number (`"3"`) or its label, ignoring case.
    pub fn parse(answer: &str) -> Result<MenuItem, ConsoleError> {
        choose(&Self::ALL, Self::label, answer)
    }
}

/// An entry of the menu shown while the console is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerAction {
    StopServer,
    ShowStatus,
}

impl ServerAction {
    pub const ALL: [ServerAction; 2] = [ServerAction::StopServer, ServerAction::ShowStatus];

    pub fn label(self) -> &'static str {
        match self {
            ServerAction::StopServer => "Stop Server",
            ServerAction::ShowStatus => "Show Server Status",
        }
    }

    pub fn parse(answer: &str) -> Result<ServerAction, ConsoleError> {
        choose(&Self::ALL, Self::label, answer)
    }
}

fn choose<T: Copy>(
    items: &[T],
    label: impl Fn(T) -> &'static str,
    answer: &str,
) -> Result<T, ConsoleError> {
    let answer = answer.trim();
    if let Ok(n) = answer.parse::<usize>() {
        if let Some(item) = n.checked_sub(1).and_then(|i| items.get(i).copied()) {
            return Ok(item);
        }
    }
    items
        .iter()
        .copied()
        .find(|item| label(*item).eq_ignore_ascii_case(answer))
        .ok_or_else(|| ConsoleError::UnknownChoice(answer.to_string()))
}

/// A fully answered console operation, ready to execute.
#[derive(Debug, PartialEq)]
pub enum Command {
    CreateTable {
        name: String,
        columns: String,
    },
    DeleteTable {
        name: String,
    },
    InsertRecord {
        table: String,
        record: Value,
    },
    DeleteRecord {
        table: String,
        id: String,
    },
    UpdateRecord {
        table: String,
        id: String,
        patch: Value,
    },
    ListRecords {
        table: String,
        filter: Option<String>,
    },
    StartServer {
        socket: PathBuf,
    },
    Exit,
}
