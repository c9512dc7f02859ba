//! Engine error types.
//!
//! These represent ordinary boundary conditions of a data-driven system
//! (an empty filter, a pool too thin for the ratio) and are returned as
//! values so callers can surface them to the user.

use thiserror::Error;

use crate::distribution::CategoryCounts;
use crate::model::Difficulty;

/// Errors returned by distribution and composition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// Custom-mode filter matched no questions.
    #[error("no questions match the selected difficulty and types")]
    NoMatchingQuestions,

    /// Standard-mode ratio cannot be satisfied for any positive total.
    #[error("pool cannot satisfy the 50/30/20 ratio ({counts})")]
    InsufficientPool { counts: CategoryCounts },

    /// A request for zero questions.
    #[error("requested question count must be at least 1")]
    EmptyRequest,

    /// A tier matrix asks for more questions of one tier than the pool has.
    #[error("not enough {} ({tier}) questions: need {needed}, have {available}", .tier.code())]
    TierShortage {
        tier: Difficulty,
        needed: usize,
        available: usize,
    },
}

/// Errors raised while normalizing a raw pool document.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The document is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither a bare array nor an object with a `questions` array.
    #[error("expected an array of questions or an object with a `questions` array")]
    UnrecognizedShape,

    /// An entry in the question list is not an object.
    #[error("question #{index} is not an object")]
    NotAnObject { index: usize },

    /// A field holds a value of the wrong kind.
    #[error("question {id}: field `{field}` {expected}")]
    InvalidField {
        id: String,
        field: &'static str,
        expected: &'static str,
    },

    /// Neither `content` nor `text` was supplied.
    #[error("question {id}: missing `content`")]
    MissingContent { id: String },

    /// Difficulty label is not a known tier.
    #[error("question {id}: unknown difficulty `{value}`")]
    UnknownDifficulty { id: String, value: String },

    /// Type label is not a known question type.
    #[error("question {id}: unknown type `{value}`")]
    UnknownType { id: String, value: String },

    /// More options than there are labels.
    #[error("question {id}: {count} options exceeds the A-Z label space")]
    TooManyOptions { id: String, count: usize },

    /// Two questions share an id.
    #[error("duplicate question id: {0}")]
    DuplicateId(String),
}

/// Errors raised by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The operation is not valid in the current phase.
    #[error("cannot {action} while the session is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    /// The answer refers to a question outside the running exam.
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(String),

    /// Practice mode locks an answer once given.
    #[error("question {0} has already been answered")]
    AnswerLocked(String),

    #[error(transparent)]
    Compose(#[from] ComposeError),
}
