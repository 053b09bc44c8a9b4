use proptest::prelude::*;
use resale_columnar::{
    AreaFilterMode, ColumnStore, QueryEngine, SaleRecord, StoreOptions, YearMonth,
};

const TOWNS: [&str; 4] = ["BEDOK", "CLEMENTI", "TAMPINES", "YISHUN"];

fn month_label(idx: u8) -> String {
    // 24 consecutive months starting 2021-01.
    format!("{}-{:02}", 2021 + u16::from(idx / 12), idx % 12 + 1)
}

fn record_strategy() -> impl Strategy<Value = SaleRecord> {
    (0..TOWNS.len(), 0u8..24, 40u32..300, 100_000u32..1_200_000).prop_map(
        |(town, month, area, price)| {
            SaleRecord::new(
                month_label(month),
                TOWNS[town],
                f64::from(area) / 2.0 + 20.0,
                f64::from(price),
            )
        },
    )
}

fn engine(rows: &[SaleRecord], chunk_rows: usize, area_filter: AreaFilterMode) -> QueryEngine {
    let options = StoreOptions {
        chunk_rows,
        area_filter,
        ..StoreOptions::default()
    };
    let store = ColumnStore::ingest(options, rows.iter().cloned().map(Ok)).unwrap();
    QueryEngine::new(store)
}

fn brute_force(
    rows: &[SaleRecord],
    town: &str,
    start: &str,
    end: &str,
    min_area: f64,
) -> Vec<usize> {
    let start: YearMonth = start.parse().unwrap();
    let end: YearMonth = end.parse().unwrap();
    rows.iter()
        .enumerate()
        .filter(|(_, r)| {
            let month: YearMonth = r.month.parse().unwrap();
            r.town == town && month >= start && month <= end && r.floor_area >= min_area
        })
        .map(|(i, _)| i)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn filter_matches_brute_force(
        rows in prop::collection::vec(record_strategy(), 0..300),
        chunk_rows in 1usize..64,
        town in 0..TOWNS.len() + 1,
        start in 0u8..24,
        span in 0u8..12,
        min_area in 30.0f64..170.0,
    ) {
        let town = TOWNS.get(town).copied().unwrap_or("PUNGGOL");
        let end = month_label((start + span).min(23));
        let start = month_label(start);
        let engine = engine(&rows, chunk_rows, AreaFilterMode::Exact);

        let got = engine.filter(town, &start, &end, min_area).unwrap();
        prop_assert_eq!(got.to_vec(), brute_force(&rows, town, &start, &end, min_area));
    }

    #[test]
    fn town_bitmaps_match_linear_scan(
        rows in prop::collection::vec(record_strategy(), 0..300),
        chunk_rows in 1usize..64,
    ) {
        let engine = engine(&rows, chunk_rows, AreaFilterMode::Exact);
        for town in TOWNS {
            let expected: Vec<usize> = rows
                .iter()
                .enumerate()
                .filter(|(_, r)| r.town == town)
                .map(|(i, _)| i)
                .collect();
            let got: Vec<usize> = engine
                .indexes()
                .town(town)
                .map(|bits| bits.iter_ones().collect())
                .unwrap_or_default();
            prop_assert_eq!(got, expected);
        }
    }
}

fn sample_rows() -> Vec<SaleRecord> {
    vec![
        SaleRecord::new("2022-01", "TAMPINES", 80.0, 400_000.0),
        SaleRecord::new("2022-01", "TAMPINES", 84.0, 420_000.0),
        SaleRecord::new("2022-01", "TAMPINES", 86.0, 450_000.0),
        SaleRecord::new("2022-01", "TAMPINES", 91.0, 470_000.0),
        SaleRecord::new("2022-01", "TAMPINES", 59.0, 300_000.0),
    ]
}

#[test]
fn aligned_min_area_is_exact_in_both_modes() {
    let rows = sample_rows();
    for mode in [AreaFilterMode::Exact, AreaFilterMode::ThresholdFloor] {
        let engine = engine(&rows, 2, mode);
        let got = engine.filter("TAMPINES", "2022-01", "2022-01", 90.0).unwrap();
        assert_eq!(got.to_vec(), brute_force(&rows, "TAMPINES", "2022-01", "2022-01", 90.0));
        assert_eq!(got.to_vec(), vec![3]);
    }
}

#[test]
fn misaligned_min_area_over_includes_only_in_threshold_floor_mode() {
    let rows = sample_rows();
    let expected = brute_force(&rows, "TAMPINES", "2022-01", "2022-01", 85.0);
    assert_eq!(expected, vec![2, 3]);

    let exact = engine(&rows, 2, AreaFilterMode::Exact);
    let got = exact.filter("TAMPINES", "2022-01", "2022-01", 85.0).unwrap();
    assert_eq!(got.to_vec(), expected);

    // 85 floors to the 80 threshold: rows with 80 <= area < 85 are kept.
    let coarse = engine(&rows, 2, AreaFilterMode::ThresholdFloor);
    let got = coarse.filter("TAMPINES", "2022-01", "2022-01", 85.0).unwrap();
    assert_eq!(got.to_vec(), vec![0, 1, 2, 3]);
}

#[test]
fn min_area_below_every_threshold_falls_back_to_scan() {
    let rows = sample_rows();
    for mode in [AreaFilterMode::Exact, AreaFilterMode::ThresholdFloor] {
        let engine = engine(&rows, 2, mode);
        let got = engine.filter("TAMPINES", "2022-01", "2022-01", 59.5).unwrap();
        assert_eq!(got.to_vec(), vec![0, 1, 2, 3]);
    }
}

#[test]
fn nan_min_area_is_rejected() {
    let engine = engine(&sample_rows(), 2, AreaFilterMode::Exact);
    assert!(engine.filter("TAMPINES", "2022-01", "2022-01", f64::NAN).is_err());
}
