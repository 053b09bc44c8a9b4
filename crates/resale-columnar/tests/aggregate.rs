use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use resale_columnar::{
    ColumnStore, ExecutionMode, QueryEngine, RowSet, SaleRecord, Statistic, StoreOptions,
};

fn synthetic_engine(rows: usize, chunk_rows: usize, parallel_threshold: usize) -> QueryEngine {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let towns = ["ANG MO KIO", "BEDOK", "HOUGANG", "TAMPINES", "WOODLANDS"];
    let records = (0..rows).map(|_| {
        Ok(SaleRecord::new(
            format!("20{}-{:02}", rng.gen_range(17..24), rng.gen_range(1..=12)),
            towns[rng.gen_range(0..towns.len())],
            rng.gen_range(35.0..180.0),
            rng.gen_range(150_000.0..1_400_000.0),
        ))
    });
    let options = StoreOptions {
        chunk_rows,
        parallel_threshold,
        ..StoreOptions::default()
    };
    QueryEngine::new(ColumnStore::ingest(options, records).unwrap())
}

fn assert_close(a: f64, b: f64) {
    let scale = a.abs().max(b.abs()).max(1.0);
    assert!((a - b).abs() / scale <= 1e-9, "{a} vs {b}");
}

#[test]
fn sequential_and_parallel_agree() {
    let engine = synthetic_engine(60_000, 4_096, 10_000);
    let rows = engine.filter("TAMPINES", "2017-01", "2023-12", 40.0).unwrap();
    assert!(rows.len() > 10_000, "selection too small: {}", rows.len());

    let store = engine.store();
    let agg = resale_columnar::Aggregator::new(store);
    for stat in Statistic::ALL {
        let seq = agg
            .compute_value(&rows, stat, ExecutionMode::Sequential)
            .unwrap()
            .unwrap();
        let par = agg
            .compute_value(&rows, stat, ExecutionMode::Parallel)
            .unwrap()
            .unwrap();
        assert_close(seq, par);
    }
}

#[test]
fn sequential_fold_matches_direct_computation() {
    let engine = synthetic_engine(5_000, 333, 10_000);
    let rows = engine.filter("BEDOK", "2019-01", "2021-06", 75.0).unwrap();
    assert!(!rows.is_empty());

    let store = engine.store();
    let prices: Vec<f64> = rows.iter().map(|&r| store.resale_price(r).unwrap()).collect();
    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;
    let std_dev = (prices.iter().map(|p| (p - mean) * (p - mean)).sum::<f64>() / n).sqrt();
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let per_sqm = rows
        .iter()
        .map(|&r| store.resale_price(r).unwrap() / store.floor_area(r).unwrap())
        .fold(f64::INFINITY, f64::min);

    let agg = resale_columnar::Aggregator::new(store);
    let value = |stat| {
        agg.compute_value(&rows, stat, ExecutionMode::Sequential)
            .unwrap()
            .unwrap()
    };
    assert_eq!(value(Statistic::MinimumPrice), min);
    assert_close(value(Statistic::AveragePrice), mean);
    assert_close(value(Statistic::StandardDeviation), std_dev);
    assert_eq!(value(Statistic::MinPricePerSqm), per_sqm);
}

#[test]
fn execution_mode_follows_threshold() {
    let engine = synthetic_engine(10, 4, 3);
    assert_eq!(engine.execution_mode(3), ExecutionMode::Sequential);
    assert_eq!(engine.execution_mode(4), ExecutionMode::Parallel);

    // Same formatted output whichever path the engine picks.
    let all = RowSet::new((0..10).collect());
    let few = RowSet::new(vec![1, 5, 7]);
    for stat in Statistic::ALL {
        for rows in [&all, &few] {
            let cached = engine.aggregate(rows, stat).unwrap();
            let seq = engine
                .aggregate_with_mode(rows, stat, ExecutionMode::Sequential)
                .unwrap();
            assert_eq!(cached, seq);
        }
    }
}

#[test]
fn worker_pool_reports_at_least_one_thread() {
    assert!(resale_columnar::worker_threads() >= 1);
}

#[test]
fn unsorted_rows_are_accepted() {
    let engine = synthetic_engine(100, 7, 10_000);
    let sorted = RowSet::new(vec![3, 15, 42, 99]);
    let shuffled = RowSet::new(vec![99, 3, 42, 15]);
    for stat in Statistic::ALL {
        assert_eq!(
            engine.aggregate(&sorted, stat).unwrap(),
            engine.aggregate(&shuffled, stat).unwrap()
        );
    }
}
