//! Question-and-answer input for the menu operations.

use jsondb_core::api::JsonDb;
use jsondb_core::error::SchemaError;
use jsondb_core::types::Column;
use jsondb_server::config;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::{Map, Value};

use crate::coerce::coerce;
use crate::commands::{Command, MenuItem};
use crate::error::ConsoleError;

/// A source of answers to console questions.
pub trait Prompter {
    /// Ask one question. `None` means the user gave up (Ctrl-C / Ctrl-D).
    fn ask(&mut self, message: &str) -> Result<Option<String>, ConsoleError>;
}

/// Terminal prompter backed by a rustyline editor with history.
pub struct LinePrompter {
    editor: DefaultEditor,
}

impl LinePrompter {
    pub fn new() -> Result<Self, ConsoleError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Prompter for LinePrompter {
    fn ask(&mut self, message: &str) -> Result<Option<String>, ConsoleError> {
        match self.editor.readline(&format!("{message} ")) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Ask every question `item` needs and build the command to execute.
///
/// Record operations look the table's columns up first so that each column
/// gets its own typed question.
pub fn read_command(
    item: MenuItem,
    prompter: &mut dyn Prompter,
    db: &JsonDb,
) -> Result<Command, ConsoleError> {
    let cmd = match item {
        MenuItem::CreateTable => Command::CreateTable {
            name: ask_table(prompter, "Enter table name:")?,
            columns: ask(
                prompter,
                "Enter column names and data types (e.g. \"name:string,age:number\"):",
            )?,
        },
        MenuItem::DeleteTable => Command::DeleteTable {
            name: ask_table(prompter, "Table name to delete:")?,
        },
        MenuItem::InsertRecord => {
            let table = ask_table(prompter, "Table name to add data to:")?;
            let columns = columns_of(db, &table)?;
            let mut record = Map::new();
            for column in &columns {
                let answer = ask(
                    prompter,
                    &format!("Enter value for {} ({}):", column.name, column.column_type),
                )?;
                record.insert(column.name.clone(), coerce(&column.column_type, &answer));
            }
            Command::InsertRecord {
                table,
                record: Value::Object(record),
            }
        }
        MenuItem::DeleteRecord => Command::DeleteRecord {
            table: ask_table(prompter, "Table name to delete record from:")?,
            id: ask(prompter, "Record ID to delete:")?.trim().to_string(),
        },
        MenuItem::UpdateRecord => {
            let table = ask_table(prompter, "Table name to update record in:")?;
            let id = ask(prompter, "Record ID to update:")?.trim().to_string();
            let columns = columns_of(db, &table)?;
            let mut patch = Map::new();
            for column in &columns {
                let answer = ask(
                    prompter,
                    &format!(
                        "Enter new value for {} ({}) (leave empty to skip):",
                        column.name, column.column_type
                    ),
                )?;
                if !answer.is_empty() {
                    patch.insert(column.name.clone(), coerce(&column.column_type, &answer));
                }
            }
            Command::UpdateRecord {
                table,
                id,
                patch: Value::Object(patch),
            }
        }
        MenuItem::ListRecords => {
            let table = ask_table(prompter, "Table name to list records:")?;
            let filter = ask(
                prompter,
                "Filters (e.g. \"name==yunus,age>25,email:contains:gmail\", empty for none):",
            )?;
            Command::ListRecords {
                table,
                filter: (!filter.trim().is_empty()).then_some(filter),
            }
        }
        MenuItem::StartServer => {
            let default = config::default_socket_path(db.root());
            let answer = ask(
                prompter,
                &format!("Socket path (empty for {}):", default.display()),
            )?;
            let answer = answer.trim();
            Command::StartServer {
                socket: if answer.is_empty() {
                    default
                } else {
                    answer.into()
                },
            }
        }
        MenuItem::Exit => Command::Exit,
    };
    Ok(cmd)
}

fn ask(prompter: &mut dyn Prompter, message: &str) -> Result<String, ConsoleError> {
    prompter.ask(message)?.ok_or(ConsoleError::Cancelled)
}

fn ask_table(prompter: &mut dyn Prompter, message: &str) -> Result<String, ConsoleError> {
    Ok(ask(prompter, message)?.trim().to_string())
}

fn columns_of(db: &JsonDb, table: &str) -> Result<Vec<Column>, ConsoleError> {
    match db.get_columns(table)? {
        Some(columns) => Ok(columns),
        None => Err(ConsoleError::Db(
            SchemaError::TableNotFound(table.to_string()).into(),
        )),
    }
}

#[cfg(test)]
pub mod scripted {
    use std::collections::VecDeque;

    use super::*;

    /// Replays canned answers and records every question asked.
    pub struct ScriptedPrompter {
        answers: VecDeque<String>,
        pub asked: Vec<String>,
    }

    impl ScriptedPrompter {
        pub fn new<I, S>(answers: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                answers: answers.into_iter().map(Into::into).collect(),
                asked: Vec::new(),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn ask(&mut self, message: &str) -> Result<Option<String>, ConsoleError> {
            self.asked.push(message.to_string());
            Ok(self.answers.pop_front())
        }
    }
}
