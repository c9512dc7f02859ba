//! The `examkit export` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use comfy_table::{Cell, Table};

use examkit_core::compose_matrix;
use examkit_core::distribution::TierMatrix;
use examkit_core::model::{Difficulty, ExamDocument};
use examkit_core::parser::load_pool_path;

use super::{load_settings, make_rng};

/// Flags of `examkit export`.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub title: String,
    pub matrix: Option<TierMatrix>,
    pub count: Option<usize>,
    pub minutes: Option<u64>,
    pub seed: Option<u64>,
    pub output: Option<PathBuf>,
}

pub fn execute(
    pool_path: PathBuf,
    options: ExportOptions,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let settings = load_settings(config_path.as_deref())?;
    let total = options.count.unwrap_or(settings.default_count);
    let matrix = options.matrix.unwrap_or_else(|| TierMatrix::auto_fill(total));
    let minutes = options.minutes.unwrap_or(settings.default_duration_minutes);
    if minutes == 0 {
        anyhow::bail!("session length must be at least one minute");
    }

    let pool = load_pool_path(&pool_path)?;
    let available = TierMatrix::from_pool(&pool);

    let mut table = Table::new();
    table.set_header(vec!["Tier", "Requested", "Available"]);
    for tier in Difficulty::ALL {
        table.add_row(vec![
            Cell::new(format!("{} ({})", tier.code(), tier.localized_label())),
            Cell::new(matrix.get(tier)),
            Cell::new(available.get(tier)),
        ]);
    }
    println!("{table}");

    let mut rng = make_rng(options.seed);
    let questions = compose_matrix(&pool, &matrix, &mut rng)?;
    let document = ExamDocument::new(options.title, minutes, Utc::now(), questions);

    let path = options.output.unwrap_or_else(|| PathBuf::from(document.file_name()));
    let json = serde_json::to_string_pretty(&document)?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write exam to {}", path.display()))?;

    tracing::info!(
        title = %document.title,
        questions = document.question_count,
        path = %path.display(),
        "exported exam"
    );
    println!(
        "Wrote \"{}\" ({} question(s), {} min) to {}",
        document.title,
        document.question_count,
        document.duration,
        path.display()
    );

    Ok(())
}
