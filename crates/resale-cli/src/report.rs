use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use resale_columnar::{QueryResult, Statistic};

use crate::params::QueryParams;

pub const HEADER: [&str; 5] = ["Year", "Month", "Town", "Category", "Value"];

pub fn output_path(dir: &Path, matric: &str) -> PathBuf {
    dir.join(format!("ScanResult_{matric}.csv"))
}

/// Write one row per statistic, in the order given.
pub fn write_results<W: Write>(
    out: W,
    params: &QueryParams,
    results: &[(Statistic, QueryResult)],
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADER)?;
    let year = params.year().to_string();
    let month = format!("{:02}", params.start_month());
    for (stat, result) in results {
        writer.write_record([
            year.as_str(),
            month.as_str(),
            params.town,
            stat.display_name(),
            result.value(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_results_file(
    dir: &Path,
    matric: &str,
    params: &QueryParams,
    results: &[(Statistic, QueryResult)],
) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create output dir {}", dir.display()))?;
    let path = output_path(dir, matric);
    let file = fs::File::create(&path).with_context(|| format!("create {}", path.display()))?;
    write_results(file, params, results).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
