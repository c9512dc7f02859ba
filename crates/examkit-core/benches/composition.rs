use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use examkit_core::distribution::{compute_distribution, CategoryCounts};
use examkit_core::model::{Difficulty, DifficultyFilter, ExamConfig, QuestionRecord, QuestionType};
use examkit_core::{compose_exam, grade_session};

fn make_pool(per_tier: usize) -> Vec<QuestionRecord> {
    let mut pool = Vec::with_capacity(per_tier * Difficulty::ALL.len());
    for tier in Difficulty::ALL {
        for i in 0..per_tier {
            pool.push(
                QuestionRecord::new(
                    format!("{}-{i}", tier.code()),
                    "Bench question",
                    QuestionType::MultipleChoice,
                    tier,
                )
                .with_options(["A. one", "B. two", "C. three", "D. four"])
                .with_answer(["A", "B", "C", "D"][i % 4]),
            );
        }
    }
    pool
}

fn bench_distribution(c: &mut Criterion) {
    let counts = CategoryCounts::new(500, 300, 200);
    c.bench_function("compute_distribution", |b| {
        b.iter(|| compute_distribution(black_box(&counts), black_box(800)))
    });
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose_exam");

    for per_tier in [50, 1_000] {
        let pool = make_pool(per_tier);
        let standard = ExamConfig::standard(40, 3_600);
        let custom = ExamConfig::custom(
            DifficultyFilter::Only(Difficulty::Comprehension),
            QuestionType::ALL,
            40,
            3_600,
        );

        group.bench_function(format!("standard/{}", pool.len()), |b| {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            b.iter(|| compose_exam(black_box(&pool), black_box(&standard), &mut rng))
        });
        group.bench_function(format!("custom/{}", pool.len()), |b| {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            b.iter(|| compose_exam(black_box(&pool), black_box(&custom), &mut rng))
        });
    }

    group.finish();
}

fn bench_grade(c: &mut Criterion) {
    let pool = make_pool(100);
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let Ok(exam) = compose_exam(&pool, &ExamConfig::standard(50, 3_600), &mut rng) else {
        return;
    };
    let answers: HashMap<String, String> = exam
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| (q.id.clone(), if i % 3 == 0 { "b." } else { "A" }.to_string()))
        .collect();

    c.bench_function("grade_session/50", |b| {
        b.iter(|| grade_session(black_box(&exam), black_box(&answers)))
    });
}

criterion_group!(benches, bench_distribution, bench_compose, bench_grade);
criterion_main!(benches);
