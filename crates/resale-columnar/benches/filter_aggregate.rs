use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use resale_columnar::{
    ColumnStore, ExecutionMode, QueryEngine, ResultCacheConfig, SaleRecord, Statistic,
    StoreOptions,
};
use std::time::Duration;

const TOWNS: [&str; 10] = [
    "BEDOK",
    "BUKIT PANJANG",
    "CLEMENTI",
    "CHOA CHU KANG",
    "HOUGANG",
    "JURONG WEST",
    "PASIR RIS",
    "TAMPINES",
    "WOODLANDS",
    "YISHUN",
];

fn bench_rows() -> usize {
    std::env::var("RESALE_BENCH_ROWS")
        .ok()
        .and_then(|v| v.replace('_', "").parse::<usize>().ok())
        .filter(|&v| (10_000..=10_000_000).contains(&v))
        .unwrap_or(1_000_000)
}

fn build_engine(rows: usize, compress: bool) -> QueryEngine {
    let records = (0..rows).map(|i| {
        Ok(SaleRecord::new(
            format!("{}-{:02}", 2014 + (i / 7) % 10, i % 12 + 1),
            TOWNS[(i * 31) % TOWNS.len()],
            45.0 + ((i * 13) % 110) as f64,
            200_000.0 + ((i * 7_919) % 900_000) as f64,
        ))
    });
    // Benchmarks measure the computation, not cache hits.
    let options = StoreOptions {
        cache: ResultCacheConfig { max_entries: 0 },
        ..StoreOptions::default()
    };
    let mut store = ColumnStore::ingest(options, records).unwrap();
    if compress {
        store.compress();
    }
    QueryEngine::new(store)
}

fn bench_filter_aggregate(c: &mut Criterion) {
    let rows = bench_rows();
    let engine = build_engine(rows, false);
    let compressed = build_engine(rows, true);

    let mut group = c.benchmark_group("filter_aggregate");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(rows as u64));

    group.bench_with_input(BenchmarkId::new("filter", rows), &rows, |b, _| {
        b.iter(|| {
            let selected = engine.filter("TAMPINES", "2014-01", "2023-12", 80.0).unwrap();
            black_box(selected);
        })
    });

    group.bench_with_input(BenchmarkId::new("filter_compressed", rows), &rows, |b, _| {
        b.iter(|| {
            let selected = compressed
                .filter("TAMPINES", "2014-01", "2023-12", 80.0)
                .unwrap();
            black_box(selected);
        })
    });

    let selected = engine.filter("TAMPINES", "2014-01", "2023-12", 80.0).unwrap();
    for (label, mode) in [
        ("sequential", ExecutionMode::Sequential),
        ("parallel", ExecutionMode::Parallel),
    ] {
        group.bench_with_input(
            BenchmarkId::new(format!("std_dev_{label}"), selected.len()),
            &selected,
            |b, selected| {
                b.iter(|| {
                    let result = engine
                        .aggregate_with_mode(selected, Statistic::StandardDeviation, mode)
                        .unwrap();
                    black_box(result);
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_filter_aggregate);
criterion_main!(benches);
