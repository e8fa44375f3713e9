use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use fuzzydedup::{
    combine, BlockingStrategy, Deduplicator, HybridCache, Metric, SimilarityPair, SimilarityWeights,
};

const NAMES: [&str; 8] = [
    "Кабель ВВГнг 3x2.5",
    "Масло сливочное 82.5%",
    "ООО Рога и Копыта",
    "Иванов Иван Иванович",
    "Гвозди строительные 100мм",
    "Провод ПВС 2x0.75",
    "Саморез по дереву 4.2x76",
    "Краска фасадная белая",
];

fn catalog(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let base = NAMES[i % NAMES.len()];
            match i % 3 {
                0 => base.to_string(),
                1 => base.to_lowercase(),
                _ => format!("{base} {}", i / NAMES.len()),
            }
        })
        .collect()
}

fn bench_metrics(c: &mut Criterion) {
    let (a, b) = ("Кабель ВВГнг 3x2.5 медный", "кабель ВВГ-нг 3х2,5 медн.");
    for metric in [Metric::Levenshtein, Metric::JaroWinkler, Metric::Lcs, Metric::Phonetic] {
        c.bench_function(&format!("metric_{}", metric.name()), |bench| {
            bench.iter(|| black_box(metric.score(black_box(a), black_box(b))));
        });
    }
}

fn bench_combine(c: &mut Criterion) {
    let weights = SimilarityWeights::default();
    c.bench_function("hybrid_combine", |b| {
        b.iter(|| black_box(combine(black_box("Иванов Иван"), black_box("Иваноф Иван"), &weights)));
    });
}

fn bench_batch(c: &mut Criterion) {
    let items = catalog(200);
    let pairs: Vec<SimilarityPair> = items
        .windows(2)
        .map(|w| SimilarityPair::new(w[0].as_str(), w[1].as_str()))
        .collect();

    c.bench_function("cache_batch_199_pairs_cold", |b| {
        b.iter_batched(
            || HybridCache::new(SimilarityWeights::default(), 10_000).expect("cache"),
            |cache| black_box(cache.batch_similarity(&pairs).expect("batch")),
            BatchSize::SmallInput,
        );
    });
}

fn bench_dedup(c: &mut Criterion) {
    let items = catalog(1_000);
    for strategy in [BlockingStrategy::ExactPrefix, BlockingStrategy::FuzzyPrefix] {
        c.bench_function(&format!("dedup_1000_{strategy:?}"), |b| {
            b.iter_batched(
                || {
                    let cache = HybridCache::new(SimilarityWeights::default(), 100_000).expect("cache");
                    Deduplicator::new(Arc::new(cache)).with_strategy(strategy)
                },
                |dedup| black_box(dedup.find_duplicates(&items)),
                BatchSize::SmallInput,
            );
        });
    }
}

criterion_group!(benches, bench_metrics, bench_combine, bench_batch, bench_dedup);
criterion_main!(benches);
