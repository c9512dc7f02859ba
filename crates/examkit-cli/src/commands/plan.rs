//! The `examkit plan` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};
use serde::Serialize;

use examkit_core::distribution::{compute_distribution, CategoryCounts, Quotas};
use examkit_core::model::{Category, ClampNotice, ExamConfig, ExamMode};
use examkit_core::parser::load_pool_path;
use examkit_core::{available_for, ComposeError};

use super::{load_settings, ExamArgs, OutputFormat};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanSummary {
    config: ExamConfig,
    available: usize,
    granted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    counts: Option<CategoryCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quotas: Option<Quotas>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clamp: Option<ClampNotice>,
}

pub fn execute(
    pool_path: PathBuf,
    exam: ExamArgs,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let settings = load_settings(config_path.as_deref())?;
    let config = exam.resolve(&settings)?;
    let pool = load_pool_path(&pool_path)?;

    let summary = match config.mode {
        ExamMode::Standard => {
            let counts = CategoryCounts::from_pool(&pool);
            let distribution = compute_distribution(&counts, config.requested_count)?;
            PlanSummary {
                available: distribution.max_feasible,
                granted: distribution.granted(),
                counts: Some(counts),
                quotas: Some(distribution.quotas),
                clamp: distribution.clamp,
                config,
            }
        }
        ExamMode::Custom => {
            let available = available_for(&pool, &config);
            if available == 0 {
                return Err(ComposeError::NoMatchingQuestions.into());
            }
            let requested = config.requested_count;
            let granted = requested.min(available);
            PlanSummary {
                available,
                granted,
                counts: None,
                quotas: None,
                clamp: (requested > granted).then_some(ClampNotice { requested, granted }),
                config,
            }
        }
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} exam, {} min, {} of {} requested question(s)",
        summary.config.mode,
        summary.config.duration_secs / 60,
        summary.granted,
        summary.config.requested_count
    );

    if let (Some(counts), Some(quotas)) = (&summary.counts, &summary.quotas) {
        let mut table = Table::new();
        table.set_header(vec!["Category", "Share", "Available", "Quota"]);
        for (category, name, share) in [
            (Category::Recall, "Recall (NB)", "50%"),
            (Category::Comprehension, "Comprehension (TH)", "30%"),
            (Category::Application, "Application (VD+VDC)", "20%"),
        ] {
            table.add_row(vec![
                Cell::new(name),
                Cell::new(share),
                Cell::new(counts.get(category)),
                Cell::new(quotas.get(category)),
            ]);
        }
        println!("{table}");
        println!("Largest exam this pool supports: {}", summary.available);
    } else {
        println!(
            "{} question(s) match difficulty {} and types {}",
            summary.available,
            summary.config.difficulty_filter,
            summary
                .config
                .type_filter
                .iter()
                .map(|t| t.code())
                .collect::<Vec<_>>()
                .join(",")
        );
    }

    if let Some(clamp) = summary.clamp {
        println!("Note: {clamp}");
    }

    Ok(())
}
