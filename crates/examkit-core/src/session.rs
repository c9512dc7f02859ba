//! Exam session state machine.
//!
//! A session moves `Idle → Composing → Running → Grading → Completed`.
//! Composing and Grading are the synchronous steps inside [`ExamSession::start`]
//! and [`ExamSession::submit`]; the observable states are Idle, Running and
//! Completed. Starting a new exam from any state discards whatever was in
//! flight.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;

use crate::composer::compose_exam;
use crate::error::SessionError;
use crate::grader::{grade_session, GradeReport};
use crate::history::SessionResult;
use crate::model::{ClampNotice, ComposedExam, ExamConfig, ExamMode, QuestionRecord};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Composing,
    Running,
    Grading,
    Completed,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Composing => "composing",
            SessionPhase::Running => "running",
            SessionPhase::Grading => "grading",
            SessionPhase::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An exam in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningExam {
    exam: ComposedExam,
    answers: HashMap<String, String>,
    flagged: BTreeSet<String>,
    started_at: DateTime<Utc>,
}

impl RunningExam {
    pub fn exam(&self) -> &ComposedExam {
        &self.exam
    }

    /// Answers recorded so far, keyed by question id.
    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }

    /// Questions marked for review.
    pub fn flagged(&self) -> &BTreeSet<String> {
        &self.flagged
    }

    pub fn is_flagged(&self, question_id: &str) -> bool {
        self.flagged.contains(question_id)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whole seconds elapsed since the start, never negative.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_seconds().max(0) as u64
    }

    /// Seconds left in the time budget.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        self.exam
            .config
            .duration_secs
            .saturating_sub(self.elapsed_secs(now))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs(now) == 0
    }

    /// Wall-clock instant the time budget runs out.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        let budget = i64::try_from(self.exam.config.duration_secs).ok()?;
        self.started_at.checked_add_signed(TimeDelta::try_seconds(budget)?)
    }
}

/// A graded exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedExam {
    exam: ComposedExam,
    answers: HashMap<String, String>,
    report: GradeReport,
    result: SessionResult,
}

impl CompletedExam {
    pub fn exam(&self) -> &ComposedExam {
        &self.exam
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }

    pub fn report(&self) -> &GradeReport {
        &self.report
    }

    /// Summary ready to append to the history log.
    pub fn result(&self) -> &SessionResult {
        &self.result
    }
}

/// A single-actor exam session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExamSession {
    #[default]
    Idle,
    Running(RunningExam),
    Completed(CompletedExam),
}

impl ExamSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        match self {
            ExamSession::Idle => SessionPhase::Idle,
            ExamSession::Running(_) => SessionPhase::Running,
            ExamSession::Completed(_) => SessionPhase::Completed,
        }
    }

    pub fn running(&self) -> Option<&RunningExam> {
        match self {
            ExamSession::Running(running) => Some(running),
            _ => None,
        }
    }

    pub fn completed(&self) -> Option<&CompletedExam> {
        match self {
            ExamSession::Completed(completed) => Some(completed),
            _ => None,
        }
    }

    /// Seconds left on the countdown, or `None` when not running.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<u64> {
        self.running().map(|running| running.remaining_secs(now))
    }

    /// Whether a running session has used up its time budget.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.running().is_some_and(|running| running.is_expired(now))
    }

    /// Compose a new exam and start running it.
    ///
    /// On a composition error the current state is left untouched. Returns
    /// the clamp notice, if the request was reduced.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        pool: &[QuestionRecord],
        config: &ExamConfig,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<Option<ClampNotice>, SessionError> {
        tracing::debug!(from = %self.phase(), to = %SessionPhase::Composing, "session transition");
        let exam = compose_exam(pool, config, rng)?;
        let clamp = exam.clamp;

        tracing::debug!(
            to = %SessionPhase::Running,
            questions = exam.len(),
            duration_secs = config.duration_secs,
            "session transition"
        );
        *self = ExamSession::Running(RunningExam {
            exam,
            answers: HashMap::new(),
            flagged: BTreeSet::new(),
            started_at: now,
        });
        Ok(clamp)
    }

    /// Record an answer for a question in the running exam.
    ///
    /// In custom (practice) mode an answer cannot be changed once given.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        answer: impl Into<String>,
    ) -> Result<(), SessionError> {
        let phase = self.phase();
        let ExamSession::Running(running) = self else {
            return Err(SessionError::InvalidTransition {
                action: "record an answer",
                phase: phase.as_str(),
            });
        };

        if running.exam.question(question_id).is_none() {
            return Err(SessionError::UnknownQuestion(question_id.to_string()));
        }
        if running.exam.config.mode == ExamMode::Custom
            && running.answers.contains_key(question_id)
        {
            return Err(SessionError::AnswerLocked(question_id.to_string()));
        }

        running
            .answers
            .insert(question_id.to_string(), answer.into());
        Ok(())
    }

    /// Flip the review mark on a question. Returns whether it is now flagged.
    ///
    /// Flags never affect grading and are allowed in either mode.
    pub fn toggle_flag(&mut self, question_id: &str) -> Result<bool, SessionError> {
        let phase = self.phase();
        let ExamSession::Running(running) = self else {
            return Err(SessionError::InvalidTransition {
                action: "flag a question",
                phase: phase.as_str(),
            });
        };
        if running.exam.question(question_id).is_none() {
            return Err(SessionError::UnknownQuestion(question_id.to_string()));
        }
        if running.flagged.remove(question_id) {
            Ok(false)
        } else {
            running.flagged.insert(question_id.to_string());
            Ok(true)
        }
    }

    /// Grade whatever has been recorded and complete the session.
    ///
    /// Valid at any time while running, including with no answers at all.
    /// Time spent is capped at the session's budget.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<SessionResult, SessionError> {
        let running = match std::mem::take(self) {
            ExamSession::Running(running) => running,
            other => {
                let phase = other.phase();
                *self = other;
                return Err(SessionError::InvalidTransition {
                    action: "submit",
                    phase: phase.as_str(),
                });
            }
        };

        tracing::debug!(
            to = %SessionPhase::Grading,
            answered = running.answers.len(),
            "session transition"
        );
        let report = grade_session(&running.exam, &running.answers);
        let time_spent = running
            .elapsed_secs(now)
            .min(running.exam.config.duration_secs);
        let result = SessionResult::from_report(&report, running.exam.config.mode, time_spent, now);

        tracing::info!(
            score = report.score_raw,
            total = report.total_questions,
            display_score = report.display_score,
            time_spent,
            "session completed"
        );
        *self = ExamSession::Completed(CompletedExam {
            exam: running.exam,
            answers: running.answers,
            report,
            result: result.clone(),
        });
        Ok(result)
    }

    /// Start again with the same configuration, reshuffled.
    pub fn retry<R: Rng + ?Sized>(
        &mut self,
        pool: &[QuestionRecord],
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<Option<ClampNotice>, SessionError> {
        let phase = self.phase();
        let ExamSession::Completed(completed) = self else {
            return Err(SessionError::InvalidTransition {
                action: "retry",
                phase: phase.as_str(),
            });
        };
        let config = completed.exam.config.clone();
        self.start(pool, &config, rng, now)
    }

    /// Discard everything and return to idle.
    pub fn reset(&mut self) {
        *self = ExamSession::Idle;
    }
}
