// Performance benchmarks for the pairing sub-score and composite math.
// Validates that scoring a candidate list stays cheap enough to run inline
// on every pairing request rather than needing a background precompute.

use cellar_intelligence::domain::{Wine, WineType};
use cellar_intelligence::pairing::dish::{parse_free_text, Dish};
use cellar_intelligence::pairing::scoring::{composite, compute_sub_scores, ScoreWeights};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn sample_wine(i: usize) -> Wine {
    let mut wine = Wine::new(
        format!("Sample Wine {i}"),
        "Domaine Example",
        "Burgundy",
        "France",
        if i % 2 == 0 { WineType::Red } else { WineType::White },
    );
    wine.tasting_notes = Some("dark cherry, earth, firm tannin, bright acidity".to_string());
    wine.style = Some("bold".to_string());
    wine
}

fn sample_dish() -> Dish {
    parse_free_text("grilled ribeye with a peppercorn crust and roasted root vegetables")
}

fn bench_compute_sub_scores(c: &mut Criterion) {
    let wine = sample_wine(0);
    let dish = sample_dish();

    c.bench_function("compute_sub_scores", |b| {
        b.iter(|| {
            let result = compute_sub_scores(black_box(&wine), black_box(&dish));
            black_box(result)
        })
    });
}

fn bench_composite(c: &mut Criterion) {
    let wine = sample_wine(0);
    let dish = sample_dish();
    let sub_scores = compute_sub_scores(&wine, &dish);
    let weights = ScoreWeights::default();

    c.bench_function("composite", |b| {
        b.iter(|| {
            let result = composite(black_box(&sub_scores), black_box(weights));
            black_box(result)
        })
    });
}

fn bench_candidate_pool_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidate_pool_scoring");
    let dish = sample_dish();
    let weights = ScoreWeights::default();

    for size in [10, 50, 200, 1_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        let wines: Vec<_> = (0..*size).map(sample_wine).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                for wine in &wines {
                    let sub_scores = compute_sub_scores(black_box(wine), black_box(&dish));
                    black_box(composite(&sub_scores, weights));
                }
            })
        });
    }

    group.finish();
}

fn bench_free_text_dish_parsing(c: &mut Criterion) {
    let phrases = [
        "grilled salmon with lemon butter",
        "spicy szechuan beef with chili oil",
        "roasted winter squash and sage risotto",
        "aged cheddar and charcuterie board",
    ];

    let mut group = c.benchmark_group("free_text_dish_parsing");
    for phrase in phrases {
        group.bench_function(phrase, |b| {
            b.iter(|| black_box(parse_free_text(black_box(phrase))))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_compute_sub_scores,
    bench_composite,
    bench_candidate_pool_scoring,
    bench_free_text_dish_parsing,
);
criterion_main!(benches);
