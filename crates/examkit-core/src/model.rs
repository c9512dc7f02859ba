//! Core data model types for examkit.
//!
//! These are the fundamental types the engine works with: questions as they
//! sit in a pool, the configuration of a composition request, and the
//! composed exam handed to the grader.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Largest number of options a question may carry (labels `A`..=`Z`).
pub const MAX_OPTIONS: usize = 26;

/// A single question in a pool.
///
/// Records are created once by ingestion and never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    /// Unique identifier within a pool snapshot.
    pub id: String,
    /// Display text. Opaque to the engine, may embed markup.
    pub content: String,
    /// Kind of question.
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Ordered choices, only meaningful for multiple choice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Canonical correct label or value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    /// Rationale text shown after grading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuestionRecord {
    /// Create a question with no options, answer, or explanation.
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        question_type: QuestionType,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            question_type,
            difficulty,
            options: Vec::new(),
            correct_answer: None,
            explanation: None,
        }
    }

    /// Builder-style setter for the option list.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style setter for the correct answer.
    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.correct_answer = Some(answer.into());
        self
    }

    /// Whether this question takes part in automatic scoring.
    pub fn is_scorable(&self) -> bool {
        self.question_type == QuestionType::MultipleChoice && self.correct_answer.is_some()
    }

    /// Label of the option at `idx`.
    ///
    /// An embedded `"X."` prefix wins; otherwise the label is positional.
    pub fn option_label(&self, idx: usize) -> Option<char> {
        let option = self.options.get(idx)?;
        Some(embedded_label(option).unwrap_or_else(|| positional_label(idx)))
    }

    /// Text of the option at `idx` with any embedded label stripped.
    pub fn option_text(&self, idx: usize) -> Option<&str> {
        let option = self.options.get(idx)?;
        Some(strip_label(option))
    }

    /// All options as `(label, text)` pairs.
    pub fn labeled_options(&self) -> Vec<(char, &str)> {
        self.options
            .iter()
            .enumerate()
            .map(|(idx, option)| {
                let label = embedded_label(option).unwrap_or_else(|| positional_label(idx));
                (label, strip_label(option))
            })
            .collect()
    }
}

/// Positional option label: 0 → `A`, 1 → `B`, ...
///
/// Indices past `Z` saturate at `Z`; ingestion rejects such pools.
pub fn positional_label(idx: usize) -> char {
    let offset = idx.min(MAX_OPTIONS - 1) as u8;
    (b'A' + offset) as char
}

fn embedded_label(option: &str) -> Option<char> {
    let mut chars = option.chars();
    match (chars.next(), chars.next()) {
        (Some(c), Some('.')) if c.is_ascii_uppercase() => Some(c),
        _ => None,
    }
}

fn strip_label(option: &str) -> &str {
    if embedded_label(option).is_some() {
        option[2..].trim_start()
    } else {
        option
    }
}

/// Kinds of question the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "MCQ", alias = "MultipleChoice")]
    MultipleChoice,
    #[serde(rename = "Essay")]
    Essay,
    #[serde(rename = "TF", alias = "TrueFalse")]
    TrueFalse,
    #[serde(rename = "SA", alias = "ShortAnswer")]
    ShortAnswer,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::MultipleChoice,
        QuestionType::Essay,
        QuestionType::TrueFalse,
        QuestionType::ShortAnswer,
    ];

    /// Short code used in pool documents.
    pub fn code(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "MCQ",
            QuestionType::Essay => "Essay",
            QuestionType::TrueFalse => "TF",
            QuestionType::ShortAnswer => "SA",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple choice"),
            QuestionType::Essay => write!(f, "essay"),
            QuestionType::TrueFalse => write!(f, "true/false"),
            QuestionType::ShortAnswer => write!(f, "short answer"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' ' | '/'))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "mcq" | "mc" | "multiplechoice" => Ok(QuestionType::MultipleChoice),
            "essay" => Ok(QuestionType::Essay),
            "tf" | "truefalse" => Ok(QuestionType::TrueFalse),
            "sa" | "shortanswer" => Ok(QuestionType::ShortAnswer),
            _ => Err(format!("unknown question type: {}", s.trim())),
        }
    }
}

/// The four ordered difficulty tiers.
///
/// Ordering follows declaration order, so sorting by `Difficulty` yields
/// Recall, Comprehension, Application, HighApplication.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Difficulty {
    #[default]
    #[serde(rename = "NB", alias = "Recall")]
    Recall,
    #[serde(rename = "TH", alias = "Comprehension")]
    Comprehension,
    #[serde(rename = "VD", alias = "Application")]
    Application,
    #[serde(rename = "VDC", alias = "HighApplication")]
    HighApplication,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Recall,
        Difficulty::Comprehension,
        Difficulty::Application,
        Difficulty::HighApplication,
    ];

    /// Domain code (NB/TH/VD/VDC).
    pub fn code(self) -> &'static str {
        match self {
            Difficulty::Recall => "NB",
            Difficulty::Comprehension => "TH",
            Difficulty::Application => "VD",
            Difficulty::HighApplication => "VDC",
        }
    }

    /// Localized label as it appears in source documents.
    pub fn localized_label(self) -> &'static str {
        match self {
            Difficulty::Recall => "Nhận biết",
            Difficulty::Comprehension => "Thông hiểu",
            Difficulty::Application => "Vận dụng",
            Difficulty::HighApplication => "Vận dụng cao",
        }
    }

    /// Ratio category: Application and HighApplication share one bucket.
    pub fn category(self) -> Category {
        match self {
            Difficulty::Recall => Category::Recall,
            Difficulty::Comprehension => Category::Comprehension,
            Difficulty::Application | Difficulty::HighApplication => Category::Application,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Recall => write!(f, "recall"),
            Difficulty::Comprehension => write!(f, "comprehension"),
            Difficulty::Application => write!(f, "application"),
            Difficulty::HighApplication => write!(f, "high application"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(tier) = Difficulty::ALL
            .into_iter()
            .find(|d| d.localized_label().to_lowercase() == trimmed.to_lowercase())
        {
            return Ok(tier);
        }
        let key: String = trimmed
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "nb" | "recall" => Ok(Difficulty::Recall),
            "th" | "comprehension" => Ok(Difficulty::Comprehension),
            "vd" | "application" => Ok(Difficulty::Application),
            "vdc" | "highapplication" => Ok(Difficulty::HighApplication),
            _ => Err(format!("unknown difficulty: {trimmed}")),
        }
    }
}

/// The three ratio buckets used by standard mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Recall,
    Comprehension,
    /// Application and HighApplication combined.
    Application,
}

/// How an exam is composed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamMode {
    /// Fixed 50/30/20 ratio across the three categories.
    #[default]
    Standard,
    /// Free difficulty/type filter, no ratio.
    Custom,
}

impl fmt::Display for ExamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamMode::Standard => write!(f, "Standard"),
            ExamMode::Custom => write!(f, "Custom"),
        }
    }
}

impl FromStr for ExamMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "exam" => Ok(ExamMode::Standard),
            "custom" | "practice" => Ok(ExamMode::Custom),
            other => Err(format!("unknown exam mode: {other}")),
        }
    }
}

/// Difficulty filter for custom mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DifficultyFilter {
    #[default]
    All,
    Only(Difficulty),
}

impl DifficultyFilter {
    pub fn matches(self, difficulty: Difficulty) -> bool {
        match self {
            DifficultyFilter::All => true,
            DifficultyFilter::Only(tier) => tier == difficulty,
        }
    }
}

impl fmt::Display for DifficultyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyFilter::All => write!(f, "ALL"),
            DifficultyFilter::Only(tier) => write!(f, "{}", tier.code()),
        }
    }
}

impl FromStr for DifficultyFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(DifficultyFilter::All)
        } else {
            s.parse().map(DifficultyFilter::Only)
        }
    }
}

impl TryFrom<String> for DifficultyFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DifficultyFilter> for String {
    fn from(filter: DifficultyFilter) -> Self {
        filter.to_string()
    }
}

/// Parameters of a single composition request.
///
/// Built by the caller before composing; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamConfig {
    pub mode: ExamMode,
    /// Custom mode only.
    #[serde(default)]
    pub difficulty_filter: DifficultyFilter,
    /// Custom mode only. An empty set matches nothing.
    #[serde(default = "all_types")]
    pub type_filter: BTreeSet<QuestionType>,
    /// Desired number of questions.
    pub requested_count: usize,
    /// Session time budget.
    pub duration_secs: u64,
}

fn all_types() -> BTreeSet<QuestionType> {
    QuestionType::ALL.into_iter().collect()
}

impl ExamConfig {
    /// A standard-mode request.
    pub fn standard(requested_count: usize, duration_secs: u64) -> Self {
        Self {
            mode: ExamMode::Standard,
            difficulty_filter: DifficultyFilter::All,
            type_filter: all_types(),
            requested_count,
            duration_secs,
        }
    }

    /// A custom-mode request.
    pub fn custom<I>(
        difficulty_filter: DifficultyFilter,
        types: I,
        requested_count: usize,
        duration_secs: u64,
    ) -> Self
    where
        I: IntoIterator<Item = QuestionType>,
    {
        Self {
            mode: ExamMode::Custom,
            difficulty_filter,
            type_filter: types.into_iter().collect(),
            requested_count,
            duration_secs,
        }
    }

    /// Whether a question passes the custom-mode filter.
    pub fn matches(&self, question: &QuestionRecord) -> bool {
        self.difficulty_filter.matches(question.difficulty)
            && self.type_filter.contains(&question.question_type)
    }
}

/// Signal that a request was reduced to what the pool can supply.
///
/// Not a failure: the exam is still produced, but the caller should tell the
/// user that fewer questions were granted than asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClampNotice {
    pub requested: usize,
    pub granted: usize,
}

impl fmt::Display for ClampNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requested {} questions, only {} available",
            self.requested, self.granted
        )
    }
}

/// A titled exam written out for distribution.
///
/// Serialized as `{title, duration, createdAt, questionCount, questions}`
/// with `duration` in minutes. The `questions` array makes the document a
/// valid pool file in its own right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDocument {
    pub title: String,
    /// Session length in minutes.
    pub duration: u64,
    pub created_at: DateTime<Utc>,
    pub question_count: usize,
    pub questions: Vec<QuestionRecord>,
}

impl ExamDocument {
    pub fn new(
        title: impl Into<String>,
        duration_minutes: u64,
        created_at: DateTime<Utc>,
        questions: Vec<QuestionRecord>,
    ) -> Self {
        Self {
            title: title.into(),
            duration: duration_minutes,
            created_at,
            question_count: questions.len(),
            questions,
        }
    }

    /// File name derived from the title, whitespace runs replaced by `_`.
    pub fn file_name(&self) -> String {
        let stem = self.title.split_whitespace().collect::<Vec<_>>().join("_");
        if stem.is_empty() {
            "exam.json".to_string()
        } else {
            format!("{stem}.json")
        }
    }
}

/// An ordered, deduplicated selection of questions for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedExam {
    /// Configuration the exam was composed from.
    pub config: ExamConfig,
    /// Questions in presentation order.
    pub questions: Vec<QuestionRecord>,
    /// Present when fewer questions were granted than requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clamp: Option<ClampNotice>,
}

impl ComposedExam {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&QuestionRecord> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Number of questions per difficulty tier, in tier order.
    pub fn tier_breakdown(&self) -> Vec<(Difficulty, usize)> {
        Difficulty::ALL
            .into_iter()
            .map(|tier| {
                let count = self.questions.iter().filter(|q| q.difficulty == tier).count();
                (tier, count)
            })
            .collect()
    }
}
