use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use resale_columnar::{
    worker_threads, ColumnStore, LoadMode, QueryEngine, Statistic, StoreOptions,
};

mod params;
mod report;

use params::QueryParams;

/// Files at least this large are memory-mapped in `auto` mode.
const MMAP_THRESHOLD_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LoadModeArg {
    /// Memory-map large files, buffer the rest.
    Auto,
    Buffered,
    Mmap,
}

#[derive(Parser, Debug)]
#[command(
    name = "resale-scan",
    about = "Run the standard price statistics for the town and months encoded in a matriculation id."
)]
struct Args {
    /// Matriculation id; the three digits before the final letter pick the town, month and year.
    matric: String,

    /// HDB resale CSV to scan.
    #[arg(long, default_value = "data/ResalePricesSingapore.csv")]
    file: PathBuf,

    /// Narrow dictionary code chunks after loading.
    #[arg(long)]
    compress: bool,

    /// Minimum floor area in square meters.
    #[arg(long, default_value_t = 80.0)]
    min_area: f64,

    #[arg(long, value_enum, default_value_t = LoadModeArg::Auto)]
    load_mode: LoadModeArg,

    /// JSON file with store options (chunk size, cache size, area thresholds, ...).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for `ScanResult_<id>.csv`.
    #[arg(long, default_value = "result")]
    output_dir: PathBuf,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn read_options(path: Option<&Path>) -> Result<StoreOptions> {
    let Some(path) = path else {
        return Ok(StoreOptions::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse store options {}", path.display()))
}

fn resolve_load_mode(arg: LoadModeArg, file: &Path) -> Result<LoadMode> {
    Ok(match arg {
        LoadModeArg::Buffered => LoadMode::Buffered,
        LoadModeArg::Mmap => LoadMode::MemoryMapped,
        LoadModeArg::Auto => {
            let len = fs::metadata(file)
                .with_context(|| format!("stat {}", file.display()))?
                .len();
            if len >= MMAP_THRESHOLD_BYTES {
                LoadMode::MemoryMapped
            } else {
                LoadMode::Buffered
            }
        }
    })
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let params = QueryParams::from_matric(&args.matric)?;
    let (start, end) = params.range();
    log::info!(
        "query: town={} months={}..={} min_area={}",
        params.town,
        start,
        end,
        args.min_area
    );

    let options = read_options(args.config.as_deref())?;
    let mode = resolve_load_mode(args.load_mode, &args.file)?;

    let started = Instant::now();
    let mut store = ColumnStore::load(&args.file, options, mode)
        .with_context(|| format!("load {}", args.file.display()))?;
    log::info!(
        "loaded {} rows in {:?} ({:?})",
        store.total_rows(),
        started.elapsed(),
        mode
    );

    if args.compress {
        let t = Instant::now();
        store.compress();
        log::info!(
            "compressed to {} bytes in {:?}",
            store.compressed_size_bytes(),
            t.elapsed()
        );
    }

    let t = Instant::now();
    let engine = QueryEngine::new(store);
    log::info!(
        "built indexes ({} bytes) in {:?}",
        engine.indexes().size_bytes(),
        t.elapsed()
    );

    let t = Instant::now();
    let rows = engine.filter(
        params.town,
        &start.to_string(),
        &end.to_string(),
        args.min_area,
    )?;
    log::info!("{} matching rows in {:?}", rows.len(), t.elapsed());

    log::info!(
        "aggregating on {} worker threads above {} rows",
        worker_threads(),
        engine.store().options().parallel_threshold
    );
    let mut results = Vec::with_capacity(Statistic::ALL.len());
    for stat in Statistic::ALL {
        let t = Instant::now();
        let result = engine.aggregate(&rows, stat)?;
        log::info!("{stat}: {result} ({:?})", t.elapsed());
        results.push((stat, result));
    }

    let path = report::write_results_file(&args.output_dir, &args.matric, &params, &results)?;
    log::info!("total {:?}", started.elapsed());
    println!("{}", path.display());
    Ok(())
}
