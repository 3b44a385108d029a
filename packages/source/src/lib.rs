#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record source trait and the CSV loader.
//!
//! A [`RecordSource`] produces the immutable record snapshot the analytics
//! engine works on. Rows that cannot become a valid [`CrimeRecord`] are
//! rejected here, with a warning, so the engine never sees them.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use crime_monitor_crime_models::{CrimeCategory, CrimeRecord, Period, RegionKeys};

/// Default path of the monthly statistics file.
pub const DEFAULT_DATA_PATH: &str = "data/BaseDPEvolucaoMensalCisp.csv";

/// Errors that can occur while loading records.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV could not be parsed at all.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A column every row needs is absent from the header.
    #[error("Missing required column: {column}")]
    MissingColumn {
        /// Column name.
        column: String,
    },
}

/// Anything that can produce a record snapshot.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human-readable description, used in logs.
    fn name(&self) -> String;

    /// Loads every valid record.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the underlying data cannot be read.
    async fn load(&self) -> Result<Vec<CrimeRecord>, SourceError>;
}

/// Monthly statistics file with one row per precinct and month.
///
/// Region and period columns are `cisp`, `mcirc`, `aisp`, `risp`, `mes`
/// and `ano`; every other column whose name is a known category is read
/// as a count. Unknown columns are ignored.
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    path: PathBuf,
    delimiter: u8,
}

impl CsvRecordSource {
    /// Creates a source for the `;`-delimited file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b';',
        }
    }

    /// Overrides the field delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

#[async_trait]
impl RecordSource for CsvRecordSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<Vec<CrimeRecord>, SourceError> {
        let bytes = tokio::fs::read(&self.path).await?;
        log::debug!("Read {} bytes from {}", bytes.len(), self.path.display());
        parse_records(&bytes, self.delimiter)
    }
}

/// Column positions resolved from the header row.
struct Layout {
    month: usize,
    year: usize,
    precinct: Option<usize>,
    municipality: Option<usize>,
    integration_area: Option<usize>,
    responsibility_area: Option<usize>,
    categories: Vec<(usize, CrimeCategory)>,
}

impl Layout {
    fn from_headers(headers: &[String]) -> Result<Self, SourceError> {
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), i))
            .collect();
        let required = |column: &str| {
            index
                .get(column)
                .copied()
                .ok_or_else(|| SourceError::MissingColumn {
                    column: column.to_string(),
                })
        };

        let categories: Vec<(usize, CrimeCategory)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| CrimeCategory::from_str(h).ok().map(|c| (i, c)))
            .collect();
        if categories.is_empty() {
            log::warn!("No known category columns in header");
        }

        Ok(Self {
            month: required("mes")?,
            year: required("ano")?,
            precinct: index.get("cisp").copied(),
            municipality: index.get("mcirc").copied(),
            integration_area: index.get("aisp").copied(),
            responsibility_area: index.get("risp").copied(),
            categories,
        })
    }
}

/// Parses delimited bytes into records.
///
/// A row is rejected (and logged) when its period is malformed or any
/// count is unparseable, negative or non-finite. Empty cells are missing
/// values, not zeros.
///
/// # Errors
///
/// Returns [`SourceError`] if the header cannot be read or lacks the
/// `mes`/`ano` columns.
pub fn parse_records(bytes: &[u8], delimiter: u8) -> Result<Vec<CrimeRecord>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_owned())
        .collect();
    let layout = Layout::from_headers(&headers)?;

    let mut records = Vec::new();
    let mut rejected = 0_usize;

    for (line, result) in reader.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::warn!("Skipping unreadable row {}: {e}", line + 2);
                rejected += 1;
                continue;
            }
        };

        match parse_row(&row, &layout) {
            Ok(record) => records.push(record),
            Err(reason) => {
                log::warn!("Rejecting row {}: {reason}", line + 2);
                rejected += 1;
            }
        }
    }

    log::info!("Loaded {} records ({rejected} rejected)", records.len());
    Ok(records)
}

fn parse_row(row: &csv::StringRecord, layout: &Layout) -> Result<CrimeRecord, String> {
    let cell = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");
    let key = |idx: Option<usize>| {
        idx.map(cell)
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned)
    };

    let year: i32 = cell(layout.year)
        .parse()
        .map_err(|_| format!("bad year '{}'", cell(layout.year)))?;
    let month: u32 = cell(layout.month)
        .parse()
        .map_err(|_| format!("bad month '{}'", cell(layout.month)))?;
    let period = Period::new(year, month).map_err(|e| e.to_string())?;

    let mut counts = BTreeMap::new();
    for (idx, category) in &layout.categories {
        let raw = cell(*idx);
        if raw.is_empty() {
            continue;
        }
        let value: f64 = raw
            .replace(',', ".")
            .parse()
            .map_err(|_| format!("{category} is not a number: '{raw}'"))?;
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{category} must be a non-negative count, got {raw}"));
        }
        counts.insert(*category, value);
    }

    Ok(CrimeRecord {
        region: RegionKeys {
            precinct: key(layout.precinct),
            municipality: key(layout.municipality),
            integration_area: key(layout.integration_area),
            responsibility_area: key(layout.responsibility_area),
        },
        period,
        counts,
    })
}
