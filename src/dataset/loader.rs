//! Tabular file loading

use crate::error::{Result, RiskError};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Tsv,
    Json,
    Parquet,
}

impl FileFormat {
    /// Detect from the file extension; unknown extensions read as CSV
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "tsv" => FileFormat::Tsv,
            "json" | "jsonl" | "ndjson" => FileFormat::Json,
            "parquet" | "pq" => FileFormat::Parquet,
            _ => FileFormat::Csv,
        }
    }
}

/// Data loader for CSV, JSON and Parquet files
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows sampled for CSV type inference
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
        }
    }

    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a delimited text file with a header row
    pub fn load_csv(&self, path: &Path, delimiter: u8) -> Result<DataFrame> {
        let file = File::open(path)?;
        let parse_opts = CsvParseOptions::default().with_separator(delimiter);
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| RiskError::DataError(format!("{}: {}", path.display(), e)))
    }

    pub fn load_parquet(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path)?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| RiskError::DataError(format!("{}: {}", path.display(), e)))
    }

    /// Load a JSON array of objects or newline-delimited JSON
    pub fn load_json(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path)?;
        let format = if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("jsonl") | Some("ndjson")
        ) {
            JsonFormat::JsonLines
        } else {
            JsonFormat::Json
        };
        JsonReader::new(file)
            .with_json_format(format)
            .finish()
            .map_err(|e| RiskError::DataError(format!("{}: {}", path.display(), e)))
    }

    /// Detect the format from the extension and load
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();
        let format = FileFormat::from_path(path);
        let df = match format {
            FileFormat::Csv => self.load_csv(path, b',')?,
            FileFormat::Tsv => self.load_csv(path, b'\t')?,
            FileFormat::Json => self.load_json(path)?,
            FileFormat::Parquet => self.load_parquet(path)?,
        };
        info!(
            path = %path.display(),
            format = ?format,
            rows = df.height(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Dataset loaded"
        );
        Ok(df)
    }
}
