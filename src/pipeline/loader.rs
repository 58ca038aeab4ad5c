//! Dataset loader for remote CSV sources and local CSV/Parquet files

use std::fmt;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, info, instrument};

use crate::utils::{create_spinner, finish_with_success};

/// Where a table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl Source {
    /// `http://` and `https://` strings are URLs, anything else a local path.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Source::Url(raw.to_string())
        } else {
            Source::File(PathBuf::from(raw))
        }
    }

    /// Lower-cased file extension of the path or URL, ignoring any query string.
    pub fn extension(&self) -> String {
        let name = match self {
            Source::Url(url) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
            Source::File(path) => path.display().to_string(),
        };
        Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
    }

    /// File stem used when deriving output names.
    pub fn stem(&self) -> String {
        let name = match self {
            Source::Url(url) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
            Source::File(path) => path.display().to_string(),
        };
        Path::new(&name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("dataset")
            .to_string()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{}", url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// CSV read options shared by file and in-memory readers.
/// `infer_schema_length` of 0 scans every row.
fn csv_options(infer_schema_length: usize) -> CsvReadOptions {
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(schema_length)
        .with_parse_options(
            CsvParseOptions::default()
                .with_null_values(Some(NullValues::AllColumnsSingle("NA".into()))),
        )
}

/// Load a table from a URL or a local CSV/Parquet file.
#[instrument(skip_all, fields(source = %source))]
pub fn load_source(source: &Source, infer_schema_length: usize) -> Result<DataFrame> {
    let extension = source.extension();
    let df = match source {
        Source::Url(url) => {
            let bytes = fetch_bytes(url)?;
            if extension == "parquet" {
                ParquetReader::new(Cursor::new(bytes))
                    .finish()
                    .with_context(|| format!("Failed to parse Parquet from {}", url))?
            } else {
                read_csv_bytes(bytes, infer_schema_length)
                    .with_context(|| format!("Failed to parse CSV from {}", url))?
            }
        }
        Source::File(path) => match extension.as_str() {
            "csv" => csv_options(infer_schema_length)
                .try_into_reader_with_file_path(Some(path.clone()))
                .and_then(|reader| reader.finish())
                .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
            "parquet" => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open Parquet file: {}", path.display()))?;
                ParquetReader::new(file)
                    .finish()
                    .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?
            }
            _ => anyhow::bail!(
                "Unsupported file format: '{}' for {}. Supported formats: csv, parquet",
                extension,
                path.display()
            ),
        },
    };

    info!(rows = df.height(), cols = df.width(), "source loaded");
    Ok(df)
}

/// Parse CSV text held in memory.
pub fn read_csv_bytes(bytes: Vec<u8>, infer_schema_length: usize) -> Result<DataFrame> {
    let df = csv_options(infer_schema_length)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    Ok(df)
}

/// GET `url` and return the body; non-success statuses are errors.
pub fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("dinger/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Request failed: {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Server returned {} for {}", status, url);
    }

    let bytes = response
        .bytes()
        .with_context(|| format!("Failed to read response body from {}", url))?;
    debug!(bytes = bytes.len(), "download complete");
    Ok(bytes.to_vec())
}

/// Load a source behind a spinner; returns the table with rows, columns
/// and estimated memory in MB.
pub fn load_dataset_with_progress(
    source: &Source,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize, f64)> {
    let message = match source {
        Source::Url(_) => format!("Downloading {}...", source),
        Source::File(_) => format!("Reading {}...", source),
    };
    let spinner = create_spinner(&message);
    let df = load_source(source, infer_schema_length)?;
    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    finish_with_success(&spinner, &format!("Loaded {}", source));
    Ok((df, rows, cols, memory_mb))
}

/// Save a table as CSV or Parquet based on the path extension.
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .with_compression(ParquetCompression::Snappy)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => anyhow::bail!(
            "Unsupported output format: '{}'. Supported formats: csv, parquet",
            extension
        ),
    }

    Ok(())
}
