//! Session grading.
//!
//! Only multiple-choice questions with a stored correct answer are scored
//! automatically. The display score is taken over the whole exam, so
//! ungraded questions count toward the denominator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{ComposedExam, QuestionRecord, QuestionType};
use crate::normalize::answers_match;

/// Grading outcome for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
    /// Excluded from automatic scoring.
    Ungraded,
}

/// Per-question result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub question_id: String,
    /// Raw answer as submitted, if any.
    pub submitted: Option<String>,
    /// Stored correct answer, if any.
    pub expected: Option<String>,
    pub verdict: Verdict,
}

impl QuestionOutcome {
    pub fn is_correct(&self) -> bool {
        self.verdict == Verdict::Correct
    }
}

/// Aggregate result of grading a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
    /// Outcomes in exam order.
    pub outcomes: Vec<QuestionOutcome>,
    /// Number of correct multiple-choice questions.
    pub score_raw: usize,
    /// Number of questions in the exam.
    pub total_questions: usize,
    /// Number of questions eligible for automatic scoring.
    pub scorable: usize,
    /// Score on a 10-point scale.
    pub display_score: usize,
    /// Score as a whole percentage.
    pub percentage: usize,
}

impl GradeReport {
    /// Correctness flag per question, in exam order.
    pub fn per_question_correct(&self) -> Vec<bool> {
        self.outcomes.iter().map(QuestionOutcome::is_correct).collect()
    }

    /// Number of questions that received any answer.
    pub fn answered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.submitted.is_some()).count()
    }
}

/// Grade `answers` (question id → raw answer) against a composed exam.
///
/// Missing answers are incorrect, never an error. Answers for ids outside
/// the exam are ignored.
pub fn grade_session(exam: &ComposedExam, answers: &HashMap<String, String>) -> GradeReport {
    let outcomes: Vec<QuestionOutcome> = exam
        .questions
        .iter()
        .map(|question| grade_question(question, answers.get(&question.id)))
        .collect();

    let score_raw = outcomes.iter().filter(|o| o.is_correct()).count();
    let scorable = exam.questions.iter().filter(|q| q.is_scorable()).count();
    let total_questions = exam.len();

    let ignored = answers
        .keys()
        .filter(|id| exam.question(id).is_none())
        .count();
    if ignored > 0 {
        tracing::debug!(ignored, "answers for questions outside the exam were ignored");
    }
    tracing::debug!(score_raw, total_questions, scorable, "graded session");

    GradeReport {
        outcomes,
        score_raw,
        total_questions,
        scorable,
        display_score: scaled_score(score_raw, total_questions, 10),
        percentage: scaled_score(score_raw, total_questions, 100),
    }
}

fn grade_question(question: &QuestionRecord, submitted: Option<&String>) -> QuestionOutcome {
    let verdict = match (question.question_type, &question.correct_answer) {
        (QuestionType::MultipleChoice, Some(expected)) => match submitted {
            Some(answer) if answers_match(answer, expected) => Verdict::Correct,
            _ => Verdict::Incorrect,
        },
        _ => Verdict::Ungraded,
    };

    QuestionOutcome {
        question_id: question.id.clone(),
        submitted: submitted.cloned(),
        expected: question.correct_answer.clone(),
        verdict,
    }
}

/// `round(score / total * scale)`, half-up, zero for an empty exam.
pub fn scaled_score(score: usize, total: usize, scale: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (2 * score * scale + total) / (2 * total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, ExamConfig};

    fn mcq(id: &str, answer: &str) -> QuestionRecord {
        QuestionRecord::new(id, "?", QuestionType::MultipleChoice, Difficulty::Recall)
            .with_options(["A. 1", "B. 2", "C. 3", "D. 4"])
            .with_answer(answer)
    }

    fn exam(questions: Vec<QuestionRecord>) -> ComposedExam {
        ComposedExam {
            config: ExamConfig::standard(questions.len().max(1), 600),
            questions,
            clamp: None,
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn five_question_scenario() {
        let exam = exam(vec![
            mcq("q1", "A"),
            mcq("q2", "B"),
            mcq("q3", "C"),
            mcq("q4", "D"),
            mcq("q5", "A"),
        ]);
        let submitted = answers(&[("q1", "a."), ("q2", "B"), ("q3", "X"), ("q5", "a")]);

        let report = grade_session(&exam, &submitted);
        assert_eq!(
            report.per_question_correct(),
            vec![true, true, false, false, true]
        );
        assert_eq!(report.score_raw, 3);
        assert_eq!(report.display_score, 6);
        assert_eq!(report.percentage, 60);
        assert_eq!(report.answered(), 4);
        assert_eq!(report.outcomes[3].verdict, Verdict::Incorrect);
    }

    #[test]
    fn no_answers_grades_zero() {
        let exam = exam(vec![mcq("q1", "A"), mcq("q2", "B")]);
        let report = grade_session(&exam, &HashMap::new());
        assert_eq!(report.score_raw, 0);
        assert_eq!(report.display_score, 0);
        assert_eq!(report.per_question_correct(), vec![false, false]);
    }

    #[test]
    fn non_mcq_questions_are_ungraded_but_count_in_denominator() {
        let essay = QuestionRecord::new(
            "e1",
            "Discuss",
            QuestionType::Essay,
            Difficulty::Application,
        )
        .with_answer("anything");
        let short = QuestionRecord::new(
            "s1",
            "Name it",
            QuestionType::ShortAnswer,
            Difficulty::Comprehension,
        );
        let exam = exam(vec![mcq("q1", "A"), essay, short, mcq("q2", "B")]);
        let submitted = answers(&[("q1", "A"), ("e1", "anything"), ("q2", "B")]);

        let report = grade_session(&exam, &submitted);
        assert_eq!(report.score_raw, 2);
        assert_eq!(report.scorable, 2);
        assert_eq!(report.total_questions, 4);
        assert_eq!(report.outcomes[1].verdict, Verdict::Ungraded);
        assert_eq!(report.outcomes[2].verdict, Verdict::Ungraded);
        // 2 / 4 * 10 = 5
        assert_eq!(report.display_score, 5);
    }

    #[test]
    fn mcq_without_answer_key_is_ungraded() {
        let q = QuestionRecord::new("q1", "?", QuestionType::MultipleChoice, Difficulty::Recall);
        let report = grade_session(&exam(vec![q]), &answers(&[("q1", "A")]));
        assert_eq!(report.outcomes[0].verdict, Verdict::Ungraded);
        assert_eq!(report.score_raw, 0);
    }

    #[test]
    fn grading_ignores_answer_order_and_foreign_ids() {
        let exam = exam(vec![mcq("q1", "A"), mcq("q2", "B")]);
        let forward = answers(&[("q1", "A"), ("q2", "B"), ("zz", "C")]);
        let backward = answers(&[("zz", "C"), ("q2", "B"), ("q1", "A")]);
        assert_eq!(grade_session(&exam, &forward), grade_session(&exam, &backward));
        assert_eq!(grade_session(&exam, &forward).score_raw, 2);
    }

    #[test]
    fn empty_exam_scores_zero() {
        let report = grade_session(&exam(vec![]), &HashMap::new());
        assert_eq!(report.total_questions, 0);
        assert_eq!(report.display_score, 0);
        assert_eq!(report.percentage, 0);
    }

    #[test]
    fn scaled_score_rounds_half_up() {
        assert_eq!(scaled_score(1, 4, 10), 3); // 2.5
        assert_eq!(scaled_score(1, 3, 10), 3); // 3.33
        assert_eq!(scaled_score(2, 3, 10), 7); // 6.67
        assert_eq!(scaled_score(3, 3, 10), 10);
    }
}
