//! The `examkit history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::grader::scaled_score;
use examkit_core::history::{HistoryStore, JsonFileBackend};

use super::{format_duration, load_settings, OutputFormat};

pub fn execute(clear: bool, format: OutputFormat, config_path: Option<PathBuf>) -> Result<()> {
    let settings = load_settings(config_path.as_deref())?;
    let mut store = HistoryStore::open(JsonFileBackend::new(&settings.history_path))?;

    if clear {
        let removed = store.entries().len();
        store.clear()?;
        println!("Cleared {removed} session(s).");
        return Ok(());
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(store.entries())?);
        return Ok(());
    }

    if store.history().is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Date (UTC)", "Mode", "Score", "Points", "Time"]);
    for (idx, entry) in store.entries().iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(entry.timestamp.format("%Y-%m-%d %H:%M")),
            Cell::new(entry.mode),
            Cell::new(format!("{}/{}", entry.score, entry.total_questions)),
            Cell::new(format!(
                "{}/10",
                scaled_score(entry.score, entry.total_questions, 10)
            )),
            Cell::new(format_duration(entry.time_spent)),
        ]);
    }
    println!("{table}");

    Ok(())
}
