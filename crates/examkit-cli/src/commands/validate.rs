//! The `examkit validate` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::distribution::{max_feasible_total, CategoryCounts};
use examkit_core::model::{Difficulty, QuestionType};
use examkit_core::parser::{load_pool_path, validate_pool};

pub fn execute(pool_path: PathBuf) -> Result<()> {
    let pool = load_pool_path(&pool_path)?;
    println!("Pool: {} ({} questions)", pool_path.display(), pool.len());

    let mut table = Table::new();
    let mut header = vec!["Difficulty".to_string()];
    header.extend(QuestionType::ALL.iter().map(|t| t.code().to_string()));
    header.push("Total".to_string());
    table.set_header(header);

    for tier in Difficulty::ALL {
        let in_tier: Vec<_> = pool.iter().filter(|q| q.difficulty == tier).collect();
        let mut row = vec![Cell::new(format!("{} ({})", tier.code(), tier.localized_label()))];
        for question_type in QuestionType::ALL {
            let count = in_tier
                .iter()
                .filter(|q| q.question_type == question_type)
                .count();
            row.push(Cell::new(count));
        }
        row.push(Cell::new(in_tier.len()));
        table.add_row(row);
    }
    println!("{table}");

    let max = max_feasible_total(&CategoryCounts::from_pool(&pool));
    println!("Standard mode supports up to {max} questions.");

    let warnings = validate_pool(&pool);
    for w in &warnings {
        let prefix = w
            .question_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Pool valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
