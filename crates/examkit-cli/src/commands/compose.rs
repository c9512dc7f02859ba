//! The `examkit compose` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use examkit_core::compose_exam;
use examkit_core::model::ComposedExam;
use examkit_core::parser::load_pool_path;

use super::{format_duration, load_settings, make_rng, render_question, ExamArgs, OutputFormat};

pub fn execute(
    pool_path: PathBuf,
    exam: ExamArgs,
    seed: Option<u64>,
    format: OutputFormat,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let settings = load_settings(config_path.as_deref())?;
    let config = exam.resolve(&settings)?;
    let pool = load_pool_path(&pool_path)?;

    let mut rng = make_rng(seed);
    let exam = compose_exam(&pool, &config, &mut rng)?;
    if let Some(clamp) = &exam.clamp {
        eprintln!("Note: {clamp}");
    }

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&exam)?,
        OutputFormat::Text => render_text(&exam),
    };

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write exam to {}", path.display()))?;
            println!("Wrote {} question(s) to {}", exam.len(), path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn render_text(exam: &ComposedExam) -> String {
    let breakdown: Vec<String> = exam
        .tier_breakdown()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(tier, count)| format!("{} {count}", tier.code()))
        .collect();

    let mut out = format!(
        "{} exam: {} question(s), {} ({})\n\n",
        exam.config.mode,
        exam.len(),
        format_duration(exam.config.duration_secs),
        breakdown.join(", ")
    );
    for (idx, question) in exam.questions.iter().enumerate() {
        out.push_str(&render_question(idx + 1, question));
        out.push('\n');
    }
    out
}
