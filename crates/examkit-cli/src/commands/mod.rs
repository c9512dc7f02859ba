//! Subcommand implementations and the helpers they share.

pub mod compose;
pub mod export;
pub mod grade;
pub mod history;
pub mod init;
pub mod plan;
pub mod take;
pub mod validate;

use std::path::Path;

use anyhow::Result;
use clap::{Args, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use examkit_core::config::{load_config_from, ExamkitConfig};
use examkit_core::model::{DifficultyFilter, ExamConfig, ExamMode, QuestionRecord, QuestionType};

/// How a command prints its result.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Options shared by every command that composes an exam.
#[derive(Args, Debug, Clone, Default)]
pub struct ExamArgs {
    /// Number of questions
    #[arg(long, conflicts_with = "preset")]
    pub count: Option<usize>,

    /// Time preset in minutes (e.g. 45 → 30 questions)
    #[arg(long)]
    pub preset: Option<u64>,

    /// Session length in minutes
    #[arg(long)]
    pub minutes: Option<u64>,

    /// Mode: standard (50/30/20 ratio) or custom (free filter)
    #[arg(long)]
    pub mode: Option<ExamMode>,

    /// Custom mode difficulty: ALL, NB, TH, VD or VDC
    #[arg(long, default_value = "ALL")]
    pub difficulty: DifficultyFilter,

    /// Custom mode types, comma-separated (MCQ,Essay,TF,SA)
    #[arg(long, value_delimiter = ',')]
    pub types: Vec<QuestionType>,
}

impl ExamArgs {
    /// Turn command-line options into an engine request.
    ///
    /// An explicit count wins over a preset, a preset over the configured
    /// default. The same holds for the duration.
    pub fn resolve(&self, settings: &ExamkitConfig) -> Result<ExamConfig> {
        let preset_count = match self.preset {
            Some(minutes) => Some(settings.preset_count(minutes).ok_or_else(|| {
                let known: Vec<String> = settings
                    .presets
                    .iter()
                    .map(|p| p.minutes.to_string())
                    .collect();
                anyhow::anyhow!(
                    "no preset for {minutes} minutes (available: {})",
                    known.join(", ")
                )
            })?),
            None => None,
        };

        let count = self
            .count
            .or(preset_count)
            .unwrap_or(settings.default_count);
        let minutes = self
            .minutes
            .or(self.preset)
            .unwrap_or(settings.default_duration_minutes);
        if minutes == 0 {
            anyhow::bail!("session length must be at least one minute");
        }
        let duration_secs = minutes * 60;

        let config = match self.mode.unwrap_or(settings.default_mode) {
            ExamMode::Standard => {
                if self.difficulty != DifficultyFilter::All || !self.types.is_empty() {
                    tracing::warn!("difficulty and type filters only apply in custom mode");
                }
                ExamConfig::standard(count, duration_secs)
            }
            ExamMode::Custom => {
                let types = if self.types.is_empty() {
                    QuestionType::ALL.to_vec()
                } else {
                    self.types.clone()
                };
                ExamConfig::custom(self.difficulty, types, count, duration_secs)
            }
        };
        Ok(config)
    }
}

/// Load the examkit config from `--config` or the default locations.
pub fn load_settings(path: Option<&Path>) -> Result<ExamkitConfig> {
    load_config_from(path)
}

/// Seeded when asked, otherwise from OS entropy.
pub fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Render one question with its options for the terminal.
pub fn render_question(number: usize, question: &QuestionRecord) -> String {
    let mut out = format!(
        "{number}. [{}] {}\n",
        question.difficulty.code(),
        question.content
    );
    for (label, text) in question.labeled_options() {
        out.push_str(&format!("   {label}. {text}\n"));
    }
    out
}

/// `m:ss` for a number of seconds.
pub fn format_duration(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
