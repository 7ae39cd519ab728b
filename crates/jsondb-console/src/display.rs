use jsondb_core::api::filter::to_display_string;
use jsondb_core::types::{Column, ID_FIELD, Record};
use serde_json::json;

use crate::commands::{MenuItem, ServerAction};
use crate::executor::CommandResult;

/// Output mode for rendering command results.
pub enum OutputMode {
    /// Human-readable output.
    Pretty,
    /// Machine-parseable JSON (one JSON object per result on stdout).
    Json,
}

/// Render a command result to stdout in the given mode.
///
/// Returns `true` to continue execution, `false` to signal exit.
pub fn render(result: &CommandResult, mode: &OutputMode) -> bool {
    match result {
        CommandResult::Ok(msg) => match mode {
            OutputMode::Pretty => print_ok(msg),
            OutputMode::Json => println!("{}", json!({"ok": true, "message": msg})),
        },
        CommandResult::Inserted { table, id } => match mode {
            OutputMode::Pretty => println!("Record added to '{table}' with id {id}."),
            OutputMode::Json => println!("{}", json!({"ok": true, "table": table, "id": id})),
        },
        CommandResult::Records {
            table,
            columns,
            records,
        } => match mode {
            OutputMode::Pretty => {
                println!("Table: {table}");
                print!("{}", format_records(columns, records));
            }
            OutputMode::Json => println!(
                "{}",
                json!({
                    "table": table,
                    "columns": columns,
                    "records": records,
                    "count": records.len(),
                })
            ),
        },
        CommandResult::Exit => {
            if let OutputMode::Pretty = mode {
                println!("Exiting...");
            }
            return false;
        }
    }
    true
}

/// Render an error in the given mode (always to stderr).
pub fn render_error(err: &dyn std::fmt::Display, mode: &OutputMode) {
    match mode {
        OutputMode::Pretty => print_error(err),
        OutputMode::Json => {
            eprintln!("{}", json!({"error": err.to_string()}));
        }
    }
}

/// Print the numbered main menu.
pub fn print_menu() {
    println!();
    println!("Select an operation:");
    for (i, item) in MenuItem::ALL.iter().enumerate() {
        println!("  {}) {}", i + 1, item.label());
    }
}

/// Print the menu offered while the server runs.
pub fn print_server_menu() {
    println!();
    println!("Server is running:");
    for (i, action) in ServerAction::ALL.iter().enumerate() {
        println!("  {}) {}", i + 1, action.label());
    }
}

/// Print a success message.
pub fn print_ok(msg: &str) {
    println!("{msg}");
}

/// Print an error message to stderr.
pub fn print_error(err: &dyn std::fmt::Display) {
    eprintln!("Error: {err}");
}

/// Lay records out as an aligned text table: `id` first, then the declared
/// columns in order, then any undeclared fields in the order they first
/// appear. Fields a record lacks print empty.
pub fn format_records(columns: &[Column], records: &[Record]) -> String {
    if records.is_empty() {
        return "No records.\n".to_string();
    }

    let mut headers = vec![ID_FIELD];
    headers.extend(
        columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| *name != ID_FIELD),
    );
    for record in records {
        for field in record.keys() {
            if !headers.contains(&field.as_str()) {
                headers.push(field.as_str());
            }
        }
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            headers
                .iter()
                .map(|h| r.get(*h).map(to_display_string).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_row(&mut out, headers.iter().map(|h| h.to_string()), &widths);
    push_row(&mut out, widths.iter().map(|w| "-".repeat(*w)), &widths);
    for row in rows {
        push_row(&mut out, row.into_iter(), &widths);
    }
    out.push_str(&format!("({} record(s))\n", records.len()));
    out
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect();
    out.push_str(line.join(" | ").trim_end());
    out.push('\n');
}
