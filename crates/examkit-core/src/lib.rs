//! examkit-core — exam composition, grading and session history.
//!
//! This crate holds the engine behind examkit. It turns a tagged question
//! pool into a timed exam, either under a fixed 50/30/20 difficulty ratio or
//! a free filter, and can draw an explicit per-tier matrix for export.
//! Submitted answers are graded and finished sessions go to a newest-first
//! log.

pub mod composer;
pub mod config;
pub mod distribution;
pub mod error;
pub mod grader;
pub mod history;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod session;

pub use composer::{available_for, compose_exam, compose_matrix};
pub use distribution::{compute_distribution, CategoryCounts, Distribution, Quotas, TierMatrix};
pub use error::{ComposeError, PoolError, SessionError};
pub use grader::{grade_session, GradeReport, QuestionOutcome, Verdict};
pub use history::{
    append_history, HistoryBackend, HistoryStore, JsonFileBackend, MemoryBackend, SessionHistory,
    SessionResult,
};
pub use model::{
    Category, ClampNotice, ComposedExam, Difficulty, DifficultyFilter, ExamConfig, ExamDocument,
    ExamMode, QuestionRecord, QuestionType,
};
pub use normalize::{answers_match, normalize_answer};
pub use session::{ExamSession, SessionPhase};
