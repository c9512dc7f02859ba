//! The `examkit take` command.
//!
//! Runs an exam session in the terminal. Answers are read line by line from
//! stdin; a deadline on the tokio clock submits automatically when the time
//! budget runs out.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::time::{timeout_at, Instant};

use examkit_core::grader::Verdict;
use examkit_core::history::{HistoryBackend, HistoryStore, JsonFileBackend, SessionResult};
use examkit_core::model::{ExamMode, QuestionRecord};
use examkit_core::normalize::answers_match;
use examkit_core::parser::load_pool_path;
use examkit_core::session::{ExamSession, RunningExam};
use examkit_core::SessionError;

use super::{format_duration, load_settings, make_rng, render_question, ExamArgs};

const SUBMIT_COMMAND: &str = ":submit";
const FLAG_COMMAND: &str = ":flag";

pub async fn execute(
    pool_path: PathBuf,
    exam: ExamArgs,
    seed: Option<u64>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let settings = load_settings(config_path.as_deref())?;
    let config = exam.resolve(&settings)?;
    let pool = load_pool_path(&pool_path)?;
    let mut rng = make_rng(seed);

    // A history file that cannot be read fails here, before any answers.
    let mut store = HistoryStore::open(JsonFileBackend::new(&settings.history_path))?;

    let mut session = ExamSession::new();
    if let Some(clamp) = session.start(&pool, &config, &mut rng, Utc::now())? {
        println!("Note: {clamp}");
    }

    let input = BufReader::new(tokio::io::stdin());
    run_session(&mut session, input, &mut std::io::stdout(), &mut store).await?;
    tracing::debug!(path = %settings.history_path.display(), "history updated");

    Ok(())
}

/// What to do after one prompt.
enum Step {
    Next,
    Again,
    Finish,
    TimeUp,
}

/// Drive a running session from `input` until it is submitted, then record
/// the result in `store`.
///
/// Questions are asked in order, followed by one more pass over the ones
/// still flagged. The session submits when the input ends, on `:submit`, or
/// once its time budget runs out on the tokio clock.
pub async fn run_session<R, W, B>(
    session: &mut ExamSession,
    input: R,
    out: &mut W,
    store: &mut HistoryStore<B>,
) -> Result<SessionResult>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    B: HistoryBackend,
{
    let running = session.running().context("session is not running")?;
    let exam = running.exam().clone();
    let budget = running.remaining_secs(Utc::now());
    let deadline = Instant::now() + Duration::from_secs(budget);
    let mut lines = input.lines();

    writeln!(
        out,
        "{} exam: {} question(s), {} on the clock.",
        exam.config.mode,
        exam.len(),
        format_duration(budget)
    )?;
    writeln!(
        out,
        "Type an option letter and press Enter. An empty line skips, \
         {FLAG_COMMAND} marks a question for review, {SUBMIT_COMMAND} finishes early."
    )?;

    let mut pass: Vec<usize> = (0..exam.len()).collect();
    let mut revisited = false;
    let mut timed_out = false;
    'exam: loop {
        for idx in std::mem::take(&mut pass) {
            loop {
                let question = &exam.questions[idx];
                match ask(session, idx + 1, question, &mut lines, deadline, out).await? {
                    Step::Next => break,
                    Step::Again => continue,
                    Step::Finish => break 'exam,
                    Step::TimeUp => {
                        timed_out = true;
                        break 'exam;
                    }
                }
            }
        }
        if revisited {
            break;
        }
        revisited = true;

        // Practice answers are final, so answered flags are not revisited.
        let locked = exam.config.mode == ExamMode::Custom;
        let running = session.running().context("session is not running")?;
        pass = (0..exam.len())
            .filter(|&idx| {
                let id = &exam.questions[idx].id;
                running.is_flagged(id) && !(locked && running.answers().contains_key(id))
            })
            .collect();
        if pass.is_empty() {
            break;
        }
        writeln!(out, "\nRevisiting {} flagged question(s).", pass.len())?;
    }

    let now = Utc::now();
    let submitted_at = if timed_out {
        writeln!(out, "\nTime is up, submitting.")?;
        // The tokio deadline has passed, so the whole budget was used.
        session
            .running()
            .and_then(RunningExam::deadline)
            .map_or(now, |deadline| now.max(deadline))
    } else {
        now
    };

    let result = session.submit(submitted_at)?;
    print_summary(session, &result, out)?;

    store.append(result.clone())?;
    writeln!(
        out,
        "\nSaved to history ({} session(s)).",
        store.entries().len()
    )?;
    Ok(result)
}

async fn ask<R, W>(
    session: &mut ExamSession,
    number: usize,
    question: &QuestionRecord,
    lines: &mut Lines<R>,
    deadline: Instant,
    out: &mut W,
) -> Result<Step>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let remaining = deadline.saturating_duration_since(Instant::now()).as_secs();
    let flagged = session
        .running()
        .is_some_and(|running| running.is_flagged(&question.id));
    let marker = if flagged { " (flagged)" } else { "" };
    writeln!(out, "\n[{} left]{marker}", format_duration(remaining))?;
    write!(out, "{}> ", render_question(number, question))?;
    out.flush()?;

    let line = match timeout_at(deadline, lines.next_line()).await {
        Err(_) => return Ok(Step::TimeUp),
        Ok(Ok(Some(line))) => line,
        Ok(Ok(None)) => return Ok(Step::Finish),
        Ok(Err(e)) => return Err(e).context("failed to read answer"),
    };

    let answer = line.trim();
    match answer {
        "" => return Ok(Step::Next),
        SUBMIT_COMMAND => return Ok(Step::Finish),
        FLAG_COMMAND => {
            let now_flagged = session.toggle_flag(&question.id)?;
            if now_flagged {
                writeln!(out, "Flagged for review.")?;
            } else {
                writeln!(out, "Flag removed.")?;
            }
            return Ok(Step::Again);
        }
        _ => {}
    }

    match session.record_answer(&question.id, answer) {
        Ok(()) => {}
        Err(SessionError::AnswerLocked(_)) => {
            writeln!(out, "Already answered, practice answers are final.")?;
            return Ok(Step::Next);
        }
        Err(e) => return Err(e.into()),
    }

    // Practice mode gives feedback right away.
    let mode = session.running().map(|running| running.exam().config.mode);
    if mode == Some(ExamMode::Custom) {
        let expected = question
            .correct_answer
            .as_deref()
            .filter(|_| question.is_scorable());
        if let Some(expected) = expected {
            if answers_match(answer, expected) {
                writeln!(out, "Correct.")?;
            } else {
                writeln!(out, "Incorrect. Answer: {expected}")?;
            }
        }
        if let Some(explanation) = &question.explanation {
            writeln!(out, "  {explanation}")?;
        }
    }

    Ok(Step::Next)
}

fn print_summary<W: Write>(
    session: &ExamSession,
    result: &SessionResult,
    out: &mut W,
) -> Result<()> {
    let completed = session.completed().context("session did not complete")?;
    let report = completed.report();

    writeln!(
        out,
        "\nScore: {}/{} correct, {}/10 ({}%) in {}",
        report.score_raw,
        report.total_questions,
        report.display_score,
        report.percentage,
        format_duration(result.time_spent)
    )?;

    let missed: Vec<_> = report
        .outcomes
        .iter()
        .zip(completed.exam().questions.iter())
        .enumerate()
        .filter(|(_, (outcome, _))| outcome.verdict == Verdict::Incorrect)
        .collect();
    if !missed.is_empty() {
        writeln!(out, "\nReview:")?;
        for (idx, (outcome, question)) in missed {
            writeln!(
                out,
                "  {}. your answer {}, correct {}",
                idx + 1,
                outcome.submitted.as_deref().unwrap_or("-"),
                outcome.expected.as_deref().unwrap_or("-")
            )?;
            if let Some(explanation) = &question.explanation {
                writeln!(out, "     {explanation}")?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use examkit_core::history::MemoryBackend;
    use examkit_core::model::{Difficulty, DifficultyFilter, ExamConfig, QuestionType};
    use examkit_core::session::SessionPhase;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn pool() -> Vec<QuestionRecord> {
        let tiers = [
            (Difficulty::Recall, 10),
            (Difficulty::Comprehension, 6),
            (Difficulty::Application, 4),
        ];
        let mut pool = Vec::new();
        for (tier, count) in tiers {
            for i in 0..count {
                pool.push(
                    QuestionRecord::new(
                        format!("{}-{i}", tier.code()),
                        "Pick one",
                        QuestionType::MultipleChoice,
                        tier,
                    )
                    .with_options(["A. yes", "B. no"])
                    .with_answer("A"),
                );
            }
        }
        pool
    }

    fn started(config: &ExamConfig) -> ExamSession {
        let mut session = ExamSession::new();
        session
            .start(&pool(), config, &mut ChaCha8Rng::seed_from_u64(1), Utc::now())
            .unwrap();
        session
    }

    #[tokio::test(start_paused = true)]
    async fn submits_when_the_countdown_runs_out() {
        let mut session = started(&ExamConfig::standard(5, 120));
        let mut store = HistoryStore::open(MemoryBackend::default()).unwrap();
        // The writer half stays open, so no line ever arrives.
        let (_writer, reader) = tokio::io::duplex(64);
        let mut out = Vec::new();

        let result = run_session(&mut session, BufReader::new(reader), &mut out, &mut store)
            .await
            .unwrap();

        assert_eq!(session.phase(), SessionPhase::Completed);
        assert_eq!(result.time_spent, 120);
        assert_eq!(result.score, 0);
        assert_eq!(store.entries(), &[result]);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Time is up, submitting."));
        assert!(text.contains("Saved to history (1 session(s))."));
    }

    #[tokio::test]
    async fn flagged_questions_are_asked_again() {
        // Standard 2 draws one NB then one TH question.
        let mut session = started(&ExamConfig::standard(2, 600));
        let mut store = HistoryStore::open(MemoryBackend::default()).unwrap();
        let input: &[u8] = b":flag\n\nB\nA\n";
        let mut out = Vec::new();

        let result = run_session(&mut session, input, &mut out, &mut store)
            .await
            .unwrap();

        assert_eq!(result.score, 1);
        assert_eq!(result.total_questions, 2);
        assert_eq!(store.entries().len(), 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Flagged for review."));
        assert!(text.contains("Revisiting 1 flagged question(s)."));
        assert!(text.contains("(flagged)"));
        assert!(!text.contains("Time is up"));
    }

    #[tokio::test]
    async fn practice_answers_stay_locked_on_revisit() {
        let config = ExamConfig::custom(
            DifficultyFilter::Only(Difficulty::Recall),
            QuestionType::ALL,
            1,
            600,
        );
        let mut session = started(&config);
        let mut store = HistoryStore::open(MemoryBackend::default()).unwrap();
        // Flag, answer, then nothing is left to revisit.
        let input: &[u8] = b":flag\nB\n";
        let mut out = Vec::new();

        let result = run_session(&mut session, input, &mut out, &mut store)
            .await
            .unwrap();

        assert_eq!(result.score, 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Incorrect. Answer: A"));
        assert!(!text.contains("Revisiting"));
    }
}
