//! The `examkit grade` command.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use comfy_table::{Cell, Table};
use serde_json::Value;

use examkit_core::grade_session;
use examkit_core::grader::Verdict;
use examkit_core::history::{HistoryStore, JsonFileBackend, SessionResult};
use examkit_core::model::ComposedExam;

use super::{load_settings, OutputFormat};

pub fn execute(
    exam_path: PathBuf,
    answers_path: PathBuf,
    time_spent: u64,
    record: bool,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let exam = load_exam(&exam_path)?;
    let answers = load_answers(&answers_path)?;
    let report = grade_session(&exam, &answers);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            let mut table = Table::new();
            table.set_header(vec!["#", "Question", "Answer", "Correct", "Result"]);
            for (idx, outcome) in report.outcomes.iter().enumerate() {
                let verdict = match outcome.verdict {
                    Verdict::Correct => "correct",
                    Verdict::Incorrect => "incorrect",
                    Verdict::Ungraded => "ungraded",
                };
                table.add_row(vec![
                    Cell::new(idx + 1),
                    Cell::new(&outcome.question_id),
                    Cell::new(outcome.submitted.as_deref().unwrap_or("-")),
                    Cell::new(outcome.expected.as_deref().unwrap_or("-")),
                    Cell::new(verdict),
                ]);
            }
            println!("{table}");
            println!(
                "Score: {}/{} correct, {}/10 ({}%)",
                report.score_raw, report.total_questions, report.display_score, report.percentage
            );
            let ungraded = report.total_questions - report.scorable;
            if ungraded > 0 {
                println!("{ungraded} question(s) need manual grading.");
            }
        }
    }

    if record {
        let settings = load_settings(config_path.as_deref())?;
        let time_spent = time_spent.min(exam.config.duration_secs);
        let result = SessionResult::from_report(&report, exam.config.mode, time_spent, Utc::now());
        let mut store = HistoryStore::open(JsonFileBackend::new(&settings.history_path))?;
        store.append(result)?;
        eprintln!("Recorded session in {}", settings.history_path.display());
    }

    Ok(())
}

fn load_exam(path: &Path) -> Result<ComposedExam> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse exam JSON: {}", path.display()))
}

/// Answers are an object of question id → answer. Numbers and booleans are
/// taken as their text form; null means unanswered.
fn load_answers(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answers: {}", path.display()))?;
    let raw: HashMap<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answers JSON: {}", path.display()))?;

    let mut answers = HashMap::with_capacity(raw.len());
    for (id, value) in raw {
        let answer = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => anyhow::bail!("answer for {id} must be a string in {}", path.display()),
        };
        answers.insert(id, answer);
    }
    Ok(answers)
}
