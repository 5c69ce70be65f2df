//! CSV exports of chart rows and metric cards, optionally gzipped.

use crate::metrics::DisplayMetric;
use crate::trends::ChartData;
use csv::Writer;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize {label}")]
    Csv {
        label: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("failed to finalize {label}")]
    Finalize {
        label: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("failed to compress {0}")]
    Compress(String, #[source] io::Error),
    #[error("failed to create directory {0}")]
    CreateDir(String, #[source] io::Error),
    #[error("failed to write {0}")]
    Write(String, #[source] io::Error),
}

pub async fn write_output_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| ExportError::CreateDir(parent.display().to_string(), err))?;
    }

    fs::write(path, bytes)
        .await
        .map_err(|err| ExportError::Write(path.display().to_string(), err))?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote output file");
    Ok(())
}

/// Writes `csv` to `path`, or gzipped to `path.gz` when `archive` is set.
/// Returns the path actually written.
pub async fn save_csv(path: &Path, csv: &[u8], archive: bool) -> Result<PathBuf, ExportError> {
    if !archive {
        write_output_file(path, csv).await?;
        return Ok(path.to_path_buf());
    }
    let target = archive_path(path);
    let compressed = gzip(csv).map_err(|err| ExportError::Compress(target.display().to_string(), err))?;
    write_output_file(&target, &compressed).await?;
    Ok(target)
}

pub fn archive_path(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "gz") {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

pub fn gzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// `period` followed by one column per series; gaps stay empty.
pub fn chart_rows_csv(chart: &ChartData) -> Result<Vec<u8>, ExportError> {
    const LABEL: &str = "chart rows";
    let mut writer = Writer::from_writer(Vec::new());
    let header = std::iter::once("period").chain(chart.series_keys.iter().map(String::as_str));
    writer.write_record(header).map_err(|source| ExportError::Csv { label: LABEL, source })?;
    for row in &chart.rows {
        let record = std::iter::once(row.period.clone()).chain(
            chart
                .series_keys
                .iter()
                .map(|key| row.get(key).map(|value| value.to_string()).unwrap_or_default()),
        );
        writer.write_record(record).map_err(|source| ExportError::Csv { label: LABEL, source })?;
    }
    finalize_writer(writer, LABEL)
}

pub fn metrics_csv(metrics: &[DisplayMetric]) -> Result<Vec<u8>, ExportError> {
    const LABEL: &str = "metric cards";
    let mut writer = Writer::from_writer(Vec::new());
    for metric in metrics {
        writer
            .serialize(metric)
            .map_err(|source| ExportError::Csv { label: LABEL, source })?;
    }
    finalize_writer(writer, LABEL)
}

fn finalize_writer(mut writer: Writer<Vec<u8>>, label: &'static str) -> Result<Vec<u8>, ExportError> {
    writer.flush().map_err(|source| ExportError::Finalize { label, source })?;
    writer
        .into_inner()
        .map_err(|err| ExportError::Finalize { label, source: err.into_error() })
}
