//! Exam composition.
//!
//! Selects and orders a subset of a question pool according to an
//! [`ExamConfig`]. Composition is a pure function of the pool, the config and
//! the injected random source: calling again with a fresh source reshuffles,
//! calling again with an identically seeded source replays.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::distribution::{compute_distribution, max_feasible_total, CategoryCounts, TierMatrix};
use crate::error::ComposeError;
use crate::model::{
    Category, ClampNotice, ComposedExam, Difficulty, ExamConfig, ExamMode, QuestionRecord,
};

/// Compose an exam from `pool`.
///
/// Custom mode shuffles the filtered candidates and keeps take-order.
/// Standard mode shuffles each ratio bucket independently, takes its quota,
/// then stable-sorts the selection by ascending difficulty tier.
///
/// Requests larger than what the pool supports produce the largest feasible
/// exam with [`ComposedExam::clamp`] set.
pub fn compose_exam<R: Rng + ?Sized>(
    pool: &[QuestionRecord],
    config: &ExamConfig,
    rng: &mut R,
) -> Result<ComposedExam, ComposeError> {
    if config.requested_count == 0 {
        return Err(ComposeError::EmptyRequest);
    }

    let exam = match config.mode {
        ExamMode::Custom => compose_custom(pool, config, rng)?,
        ExamMode::Standard => compose_standard(pool, config, rng)?,
    };

    if let Some(clamp) = &exam.clamp {
        tracing::info!(
            mode = %config.mode,
            requested = clamp.requested,
            granted = clamp.granted,
            "request clamped to available questions"
        );
    }
    tracing::debug!(
        mode = %config.mode,
        questions = exam.len(),
        "composed exam"
    );

    Ok(exam)
}

/// How many questions a request could be granted at most.
///
/// Standard mode reports the ratio bottleneck, custom mode the number of
/// questions matching the filter.
pub fn available_for(pool: &[QuestionRecord], config: &ExamConfig) -> usize {
    let candidates = unique_by_id(pool.iter());
    match config.mode {
        ExamMode::Standard => max_feasible_total(&CategoryCounts::from_pool(candidates)),
        ExamMode::Custom => candidates.into_iter().filter(|q| config.matches(q)).count(),
    }
}

fn compose_custom<R: Rng + ?Sized>(
    pool: &[QuestionRecord],
    config: &ExamConfig,
    rng: &mut R,
) -> Result<ComposedExam, ComposeError> {
    let mut candidates = unique_by_id(pool.iter().filter(|q| config.matches(q)));
    if candidates.is_empty() {
        return Err(ComposeError::NoMatchingQuestions);
    }

    candidates.shuffle(rng);

    let requested = config.requested_count;
    let granted = requested.min(candidates.len());
    let clamp = (requested > granted).then_some(ClampNotice { requested, granted });

    Ok(ComposedExam {
        config: config.clone(),
        questions: candidates.into_iter().take(granted).cloned().collect(),
        clamp,
    })
}

fn compose_standard<R: Rng + ?Sized>(
    pool: &[QuestionRecord],
    config: &ExamConfig,
    rng: &mut R,
) -> Result<ComposedExam, ComposeError> {
    let mut buckets: [(Category, Vec<&QuestionRecord>); 3] = [
        (Category::Recall, Vec::new()),
        (Category::Comprehension, Vec::new()),
        (Category::Application, Vec::new()),
    ];
    for question in unique_by_id(pool.iter()) {
        let slot = match question.difficulty.category() {
            Category::Recall => 0,
            Category::Comprehension => 1,
            Category::Application => 2,
        };
        buckets[slot].1.push(question);
    }

    let counts = CategoryCounts::new(buckets[0].1.len(), buckets[1].1.len(), buckets[2].1.len());
    let distribution = compute_distribution(&counts, config.requested_count)?;
    tracing::debug!(
        %counts,
        max_feasible = distribution.max_feasible,
        recall = distribution.quotas.recall,
        comprehension = distribution.quotas.comprehension,
        application = distribution.quotas.application,
        "standard distribution"
    );

    let mut selected: Vec<&QuestionRecord> = Vec::with_capacity(distribution.granted());
    for (category, bucket) in buckets.iter_mut() {
        bucket.shuffle(&mut *rng);
        let quota = distribution.quotas.get(*category);
        selected.extend(bucket.iter().take(quota).copied());
    }

    // Stable: within a tier the shuffled selection order survives.
    selected.sort_by_key(|q| q.difficulty);

    Ok(ComposedExam {
        config: config.clone(),
        questions: selected.into_iter().cloned().collect(),
        clamp: distribution.clamp,
    })
}

/// Draw exactly the per-tier counts of `matrix` from `pool`.
///
/// Every tier is checked before anything is drawn, in tier order, and the
/// first short tier is reported. The result lists the tiers from NB to VDC,
/// each tier in shuffled order. No clamping happens here.
pub fn compose_matrix<R: Rng + ?Sized>(
    pool: &[QuestionRecord],
    matrix: &TierMatrix,
    rng: &mut R,
) -> Result<Vec<QuestionRecord>, ComposeError> {
    if matrix.total() == 0 {
        return Err(ComposeError::EmptyRequest);
    }

    let candidates = unique_by_id(pool.iter());
    let available = TierMatrix::from_pool(candidates.iter().copied());
    for tier in Difficulty::ALL {
        let needed = matrix.get(tier);
        if needed > available.get(tier) {
            return Err(ComposeError::TierShortage {
                tier,
                needed,
                available: available.get(tier),
            });
        }
    }

    let mut selected = Vec::with_capacity(matrix.total());
    for tier in Difficulty::ALL {
        let mut bucket: Vec<&QuestionRecord> = candidates
            .iter()
            .copied()
            .filter(|q| q.difficulty == tier)
            .collect();
        bucket.shuffle(&mut *rng);
        selected.extend(bucket.into_iter().take(matrix.get(tier)).cloned());
    }

    tracing::debug!(%matrix, questions = selected.len(), "composed matrix exam");
    Ok(selected)
}

/// Keep the first occurrence of every id.
fn unique_by_id<'a, I>(questions: I) -> Vec<&'a QuestionRecord>
where
    I: Iterator<Item = &'a QuestionRecord>,
{
    let mut seen = HashSet::new();
    questions.filter(|q| seen.insert(q.id.as_str())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, DifficultyFilter, QuestionType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    fn pool(
        recall: usize,
        comprehension: usize,
        application: usize,
        high: usize,
    ) -> Vec<QuestionRecord> {
        let mut pool = Vec::new();
        let tiers = [
            (Difficulty::Recall, recall, "nb"),
            (Difficulty::Comprehension, comprehension, "th"),
            (Difficulty::Application, application, "vd"),
            (Difficulty::HighApplication, high, "vdc"),
        ];
        for (tier, count, prefix) in tiers {
            for i in 0..count {
                pool.push(
                    QuestionRecord::new(
                        format!("{prefix}-{i}"),
                        format!("question {prefix} {i}"),
                        QuestionType::MultipleChoice,
                        tier,
                    )
                    .with_answer("A"),
                );
            }
        }
        pool
    }

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn standard_mode_fills_quotas_in_tier_order() {
        let pool = pool(10, 6, 2, 2);
        let exam = compose_exam(&pool, &ExamConfig::standard(20, 1800), &mut rng(7)).unwrap();

        assert_eq!(exam.len(), 20);
        assert!(exam.clamp.is_none());
        assert!(exam
            .questions
            .windows(2)
            .all(|w| w[0].difficulty <= w[1].difficulty));

        let breakdown = exam.tier_breakdown();
        assert_eq!(breakdown[0], (Difficulty::Recall, 10));
        assert_eq!(breakdown[1], (Difficulty::Comprehension, 6));
        assert_eq!(breakdown[2].1 + breakdown[3].1, 4);
    }

    #[test]
    fn standard_mode_clamps_to_bottleneck() {
        let pool = pool(10, 6, 4, 0);
        let exam = compose_exam(&pool, &ExamConfig::standard(40, 1800), &mut rng(1)).unwrap();
        assert_eq!(exam.len(), 20);
        assert_eq!(
            exam.clamp,
            Some(ClampNotice {
                requested: 40,
                granted: 20
            })
        );
    }

    #[test]
    fn standard_mode_insufficient_pool() {
        let pool = pool(3, 0, 0, 0);
        let err = compose_exam(&pool, &ExamConfig::standard(5, 600), &mut rng(1)).unwrap_err();
        assert!(matches!(err, ComposeError::InsufficientPool { .. }));
    }

    #[test]
    fn custom_mode_no_matches() {
        let pool = pool(5, 5, 5, 5);
        let config = ExamConfig::custom(
            DifficultyFilter::Only(Difficulty::Application),
            [QuestionType::Essay],
            5,
            600,
        );
        let err = compose_exam(&pool, &config, &mut rng(1)).unwrap_err();
        assert_eq!(err, ComposeError::NoMatchingQuestions);
    }

    #[test]
    fn custom_mode_empty_type_filter_matches_nothing() {
        let pool = pool(5, 5, 5, 5);
        let config = ExamConfig::custom(DifficultyFilter::All, [], 5, 600);
        let err = compose_exam(&pool, &config, &mut rng(1)).unwrap_err();
        assert_eq!(err, ComposeError::NoMatchingQuestions);
    }

    #[test]
    fn custom_mode_filters_and_clamps() {
        let pool = pool(5, 5, 3, 2);
        let config = ExamConfig::custom(
            DifficultyFilter::Only(Difficulty::Application),
            [QuestionType::MultipleChoice],
            10,
            600,
        );
        let exam = compose_exam(&pool, &config, &mut rng(3)).unwrap();
        assert_eq!(exam.len(), 3);
        assert!(exam
            .questions
            .iter()
            .all(|q| q.difficulty == Difficulty::Application));
        assert_eq!(
            exam.clamp,
            Some(ClampNotice {
                requested: 10,
                granted: 3
            })
        );
    }

    #[test]
    fn zero_request_is_rejected() {
        let pool = pool(5, 5, 5, 5);
        let err = compose_exam(&pool, &ExamConfig::standard(0, 600), &mut rng(1)).unwrap_err();
        assert_eq!(err, ComposeError::EmptyRequest);
    }

    #[test]
    fn duplicate_ids_never_repeat() {
        let mut pool = pool(4, 4, 4, 0);
        let dup = pool[0].clone();
        pool.push(dup.clone());
        pool.push(dup);
        let config = ExamConfig::custom(DifficultyFilter::All, QuestionType::ALL, 100, 600);
        let exam = compose_exam(&pool, &config, &mut rng(11)).unwrap();

        let ids: HashSet<&str> = exam.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), exam.len());
        assert_eq!(exam.len(), 12);
    }

    #[test]
    fn same_seed_replays_different_seed_reshuffles() {
        let pool = pool(20, 20, 20, 0);
        let config = ExamConfig::custom(DifficultyFilter::All, QuestionType::ALL, 30, 600);
        let a = compose_exam(&pool, &config, &mut rng(42)).unwrap();
        let b = compose_exam(&pool, &config, &mut rng(42)).unwrap();
        let c = compose_exam(&pool, &config, &mut rng(43)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.questions, c.questions);
    }

    #[test]
    fn shuffle_is_not_biased_toward_either_end() {
        let pool = pool(3, 0, 0, 0);
        let config = ExamConfig::custom(DifficultyFilter::All, QuestionType::ALL, 3, 600);
        let mut rng = rng(2024);
        let mut seen: HashMap<Vec<String>, usize> = HashMap::new();
        for _ in 0..6000 {
            let exam = compose_exam(&pool, &config, &mut rng).unwrap();
            let order = exam.questions.iter().map(|q| q.id.clone()).collect();
            *seen.entry(order).or_default() += 1;
        }
        assert_eq!(seen.len(), 6, "every permutation should appear");
        for (order, count) in &seen {
            assert!(
                (800..=1200).contains(count),
                "permutation {order:?} drawn {count} times"
            );
        }
    }

    #[test]
    fn available_for_reports_limits() {
        let pool = pool(10, 6, 4, 0);
        assert_eq!(available_for(&pool, &ExamConfig::standard(1, 60)), 20);

        let config = ExamConfig::custom(
            DifficultyFilter::Only(Difficulty::Comprehension),
            QuestionType::ALL,
            1,
            60,
        );
        assert_eq!(available_for(&pool, &config), 6);
    }

    #[test]
    fn matrix_draws_exact_tier_counts() {
        let pool = pool(10, 8, 5, 3);
        let matrix = TierMatrix::new(4, 3, 2, 1);
        let questions = compose_matrix(&pool, &matrix, &mut rng(5)).unwrap();

        assert_eq!(questions.len(), 10);
        assert_eq!(TierMatrix::from_pool(&questions), matrix);
        assert!(questions.windows(2).all(|w| w[0].difficulty <= w[1].difficulty));
        let ids: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), 10);

        let again = compose_matrix(&pool, &matrix, &mut rng(5)).unwrap();
        assert_eq!(again, questions);
    }

    #[test]
    fn matrix_reports_first_short_tier() {
        let pool = pool(10, 2, 5, 0);
        let err = compose_matrix(&pool, &TierMatrix::new(4, 3, 2, 1), &mut rng(1)).unwrap_err();
        assert_eq!(
            err,
            ComposeError::TierShortage {
                tier: Difficulty::Comprehension,
                needed: 3,
                available: 2
            }
        );
        assert_eq!(
            err.to_string(),
            "not enough TH (comprehension) questions: need 3, have 2"
        );

        let err = compose_matrix(&pool, &TierMatrix::new(0, 0, 0, 1), &mut rng(1)).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::TierShortage {
                tier: Difficulty::HighApplication,
                available: 0,
                ..
            }
        ));
    }

    #[test]
    fn matrix_counts_duplicates_once() {
        let mut pool = pool(1, 0, 0, 0);
        pool.push(pool[0].clone());
        let err = compose_matrix(&pool, &TierMatrix::new(2, 0, 0, 0), &mut rng(1)).unwrap_err();
        assert!(matches!(err, ComposeError::TierShortage { available: 1, .. }));
        assert_eq!(
            compose_matrix(&pool, &TierMatrix::default(), &mut rng(1)),
            Err(ComposeError::EmptyRequest)
        );
    }
}
