use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use tenantguard::facts::HandlerFact;
use tenantguard::pipeline::{analyze, with_worker_pool};
use tenantguard::testkit::{fixture_config, fixture_handlers, fixture_schema};
use tenantguard::{classify, evaluate, AccessPointExtractor, FactsDocument, SourceUnit};

/// The fixture handlers repeated `copies` times, spread over one document
/// per copy.
fn scaled_units(copies: usize) -> Vec<SourceUnit> {
    let mut units: Vec<SourceUnit> = (0..copies)
        .map(|i| {
            let file = format!("routes_{i}.py");
            let handlers: Vec<HandlerFact> = fixture_handlers()
                .into_iter()
                .map(|mut h| {
                    h.location.file = file.clone();
                    h
                })
                .collect();
            SourceUnit::new(
                format!("facts/routes_{i}.json"),
                FactsDocument {
                    source: Some(file),
                    schema: Vec::new(),
                    handlers,
                },
            )
        })
        .collect();
    units.push(SourceUnit::new(
        "facts/models.json",
        FactsDocument {
            source: None,
            schema: fixture_schema(),
            handlers: Vec::new(),
        },
    ));
    units
}

fn bench_evaluate(c: &mut Criterion) {
    let config = fixture_config();
    let schema = classify(&fixture_schema(), &config.schema).unwrap();
    let extractor = AccessPointExtractor::new(&schema, &config);
    let points: Vec<_> = fixture_handlers()
        .iter()
        .flat_map(|h| extractor.extract_handler(h).unwrap())
        .collect();

    let mut group = c.benchmark_group("evaluate");
    group.throughput(Throughput::Elements(points.len() as u64));
    group.bench_function("fixture_access_points", |b| {
        b.iter(|| {
            for point in &points {
                black_box(evaluate(black_box(point), &schema).unwrap());
            }
        })
    });
    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let config = fixture_config();
    let mut group = c.benchmark_group("analyze");

    for copies in [1, 10, 100] {
        let units = scaled_units(copies);
        group.throughput(Throughput::Elements((copies * 11) as u64));
        group.bench_with_input(BenchmarkId::new("sequential", copies), &units, |b, units| {
            b.iter(|| with_worker_pool(1, || black_box(analyze(units, &[], &config).unwrap())))
        });
        group.bench_with_input(BenchmarkId::new("parallel", copies), &units, |b, units| {
            b.iter(|| black_box(analyze(units, &[], &config).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_analyze);
criterion_main!(benches);
