use std::fs::{self, File};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use polars::prelude::PolarsError;
use polars_io::SerWriter;
use polars_io::csv::write::CsvWriter;
use snafu::{Backtrace, ResultExt, Snafu};
use tracing::info;

use crate::config::OutputConfig;
use crate::io::dataframe::rows_to_dataframe;
use crate::models::date_range::DateRange;
use crate::models::instrument::InstrumentClass;
use crate::models::quote_row::QuoteRow;

/// Timestamp suffix of artifact file names.
pub const ARTIFACT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// There was nothing to write.
    #[snafu(display("Failed to write data: {message}"))]
    WriteError {
        message: String,
        backtrace: Backtrace,
    },

    /// The rows could not be converted into the artifact schema.
    #[snafu(display("Data conversion error: {message}"))]
    Conversion {
        message: String,
        backtrace: Backtrace,
    },

    #[snafu(display("DataFrame operation failed: {source}"))]
    Polars {
        source: PolarsError,
        backtrace: Backtrace,
    },

    /// A file system error at `path`.
    #[snafu(display("I/O error at {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Persists the rows of one (class, chunk) run and returns where they went.
    async fn write(
        &self,
        class: InstrumentClass,
        range: &DateRange,
        rows: &[QuoteRow],
    ) -> Result<PathBuf, SinkError>;
}

/// Writes one CSV per run into the class folder.
#[derive(Debug, Clone)]
pub struct CsvArtifactSink {
    output: OutputConfig,
}

impl CsvArtifactSink {
    pub fn new(output: OutputConfig) -> Self {
        Self { output }
    }

    fn target(&self, class: InstrumentClass) -> (&Path, &str) {
        match class {
            InstrumentClass::Fx => (
                self.output.fx_folder.as_path(),
                self.output.fx_prefix.as_str(),
            ),
            InstrumentClass::Gas => (
                self.output.gas_folder.as_path(),
                self.output.gas_prefix.as_str(),
            ),
        }
    }

    /// `<folder>/<prefix>_<label>_<timestamp>.csv`
    pub fn artifact_path(&self, class: InstrumentClass, range: &DateRange) -> PathBuf {
        let (folder, prefix) = self.target(class);
        let timestamp = Local::now().format(ARTIFACT_TIMESTAMP_FORMAT);
        folder.join(format!("{prefix}_{}_{timestamp}.csv", range.label()))
    }
}

#[async_trait]
impl ArtifactSink for CsvArtifactSink {
    async fn write(
        &self,
        class: InstrumentClass,
        range: &DateRange,
        rows: &[QuoteRow],
    ) -> Result<PathBuf, SinkError> {
        if rows.is_empty() {
            return WriteSnafu {
                message: "refusing to write an empty artifact",
            }
            .fail();
        }

        let mut df = rows_to_dataframe(class, rows)?;

        let (folder, _) = self.target(class);
        fs::create_dir_all(folder).context(IoSnafu { path: folder })?;

        let path = self.artifact_path(class, range);
        let mut file = File::create(&path).context(IoSnafu { path: &path })?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .context(PolarsSnafu)?;

        info!(%class, rows = rows.len(), path = %path.display(), "artifact written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::*;
    use crate::models::quote_row::{GasDetails, Ohlc, RowDetails};

    fn gas_row(id: &str, volume: Option<f64>) -> QuoteRow {
        QuoteRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            instrument: id.into(),
            ohlc: Ohlc {
                high: 30.5,
                low: 29.0,
                open: 29.5,
                close: 30.1,
            },
            details: RowDetails::Gas(GasDetails {
                volume,
                currency: "EUR".into(),
                unit: "MWh".into(),
            }),
        }
    }

    fn sink_in(dir: &Path) -> CsvArtifactSink {
        CsvArtifactSink::new(OutputConfig {
            fx_folder: dir.join("fx_data"),
            gas_folder: dir.join("gas_data"),
            ..OutputConfig::default()
        })
    }

    #[tokio::test]
    async fn writes_named_csv_into_class_folder() {
        let dir = tempdir().unwrap();
        let sink = sink_in(dir.path());
        let range = DateRange::single_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let path = sink
            .write(
                InstrumentClass::Gas,
                &range,
                &[gas_row("PEGDA", Some(120.0)), gas_row("TRGBNBPD1", None)],
            )
            .await
            .unwrap();

        assert_eq!(path.parent().unwrap(), dir.path().join("gas_data"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("prices_2024-01-01_"));
        assert!(name.ends_with(".csv"));

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,instrument,orig_high,orig_low,orig_open,orig_close,volume,orig_currency,orig_unit"
        );
        assert!(lines.next().unwrap().starts_with("2024-01-01,PEGDA,30.5,"));
        let volume_less: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(volume_less[1], "TRGBNBPD1");
        assert_eq!(volume_less[6], "");
    }

    #[tokio::test]
    async fn empty_rows_are_refused() {
        let dir = tempdir().unwrap();
        let sink = sink_in(dir.path());
        let range = DateRange::single_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(sink.write(InstrumentClass::Fx, &range, &[]).await.is_err());
        assert!(!dir.path().join("fx_data").exists());
    }
}
