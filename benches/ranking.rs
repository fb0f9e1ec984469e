//! Benchmarks for the derived result views over large detection results

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use planscan::models::{DetectedElement, DetectedElements};
use planscan::{DetectionResult, ElementCategory};
use std::hint::black_box;

fn synthetic_result(per_category: usize) -> DetectionResult {
    let build = |kind: &str| -> Vec<DetectedElement> {
        (0..per_category)
            .map(|i| {
                let x = i as f64;
                DetectedElement {
                    kind: kind.to_string(),
                    // Repeating pattern with plenty of ties
                    confidence: ((i * 37) % 100) as f64 / 100.0,
                    bbox: [x, x, x + 40.0, x + 12.0],
                    contour: vec![[x, x], [x + 40.0, x], [x + 40.0, x + 12.0], [x, x + 12.0]],
                }
            })
            .collect()
    };

    DetectionResult {
        id: "bench".to_string(),
        filename: "floorplan.png".to_string(),
        elements: DetectedElements {
            walls: build("Wall"),
            windows: build("Window"),
            doors: build("Door"),
        },
        image_url: "/api/floorplan/images/bench_detected.jpg".to_string(),
    }
}

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranked");
    for size in [100, 1_000, 10_000] {
        let result = synthetic_result(size);
        group.bench_with_input(BenchmarkId::from_parameter(size * 3), &result, |b, result| {
            b.iter(|| black_box(result.ranked().len()))
        });
    }
    group.finish();
}

fn bench_summaries(c: &mut Criterion) {
    let result = synthetic_result(10_000);
    c.bench_function("mean_confidence_all_categories", |b| {
        b.iter(|| {
            ElementCategory::ALL
                .iter()
                .map(|&category| black_box(&result).mean_confidence(category))
                .sum::<f64>()
        })
    });
}

fn bench_export(c: &mut Criterion) {
    let result = synthetic_result(1_000);
    c.bench_function("to_pretty_json_3000", |b| {
        b.iter(|| black_box(&result).to_pretty_json().map(|json| json.len()))
    });
}

criterion_group!(benches, bench_ranking, bench_summaries, bench_export);
criterion_main!(benches);
