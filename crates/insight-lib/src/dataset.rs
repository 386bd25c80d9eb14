//! Precomputed clustered dataset snapshot
//!
//! The snapshot is a CSV export of the training run: one row per learner
//! with its features and assigned cluster. It is loaded once and never
//! mutated.

use crate::models::{FeatureVector, LearnerRecord};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Columns every snapshot must carry
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "developer_id",
    "developer_name",
    "cluster_label",
    "total_active_days",
    "avg_completion_time_hours",
    "total_journeys_completed",
    "rejection_ratio",
    "avg_exam_score",
];

/// Dataset loading failures
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("invalid {column} value `{value}` on line {line}")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
    },
}

/// Column positions resolved from the header row
struct ColumnIndex {
    positions: [usize; REQUIRED_COLUMNS.len()],
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self, DatasetError> {
        let mut positions = [0; REQUIRED_COLUMNS.len()];
        let mut missing = Vec::new();

        for (slot, column) in REQUIRED_COLUMNS.iter().enumerate() {
            match headers.iter().position(|h| h == *column) {
                Some(pos) => positions[slot] = pos,
                None => missing.push(column.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(Self { positions })
        } else {
            Err(DatasetError::MissingColumns(missing))
        }
    }

    fn field<'r>(&self, record: &'r StringRecord, slot: usize) -> &'r str {
        record.get(self.positions[slot]).unwrap_or_default()
    }
}

/// Immutable in-memory set of learner records in file order
#[derive(Debug, Clone, Default)]
pub struct DatasetSnapshot {
    records: Vec<LearnerRecord>,
    by_developer: HashMap<i64, usize>,
}

impl DatasetSnapshot {
    pub fn from_records(records: Vec<LearnerRecord>) -> Self {
        let mut by_developer = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            // First occurrence wins on duplicate ids
            by_developer.entry(record.developer_id).or_insert(i);
        }
        Self {
            records,
            by_developer,
        }
    }

    /// Load a snapshot from a CSV file
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = Self::from_reader(file)?;
        info!(path = %path.display(), records = snapshot.len(), "Loaded clustered dataset");
        Ok(snapshot)
    }

    /// Parse a snapshot from CSV with a header row; extra columns are ignored
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(reader);
        let columns = ColumnIndex::from_headers(reader.headers()?)?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            records.push(parse_record(&columns, &row, line)?);
        }

        Ok(Self::from_records(records))
    }

    pub fn find_by_developer_id(&self, developer_id: i64) -> Option<&LearnerRecord> {
        self.by_developer
            .get(&developer_id)
            .map(|&i| &self.records[i])
    }

    /// The first `limit` records in snapshot order
    pub fn first_n(&self, limit: usize) -> &[LearnerRecord] {
        &self.records[..limit.min(self.records.len())]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_record(
    columns: &ColumnIndex,
    row: &StringRecord,
    line: u64,
) -> Result<LearnerRecord, DatasetError> {
    let feature = |slot: usize| parse_float(columns.field(row, slot), REQUIRED_COLUMNS[slot], line);

    Ok(LearnerRecord {
        developer_id: parse_int(columns.field(row, 0), REQUIRED_COLUMNS[0], line)?,
        developer_name: columns.field(row, 1).to_string(),
        cluster_id: parse_int(columns.field(row, 2), REQUIRED_COLUMNS[2], line)?,
        features: FeatureVector {
            total_active_days: feature(3)?,
            avg_completion_time_hours: feature(4)?,
            total_journeys_completed: feature(5)?,
            rejection_ratio: feature(6)?,
            avg_exam_score: feature(7)?,
        },
    })
}

/// Integer column; float text such as `2.0` is truncated toward zero
fn parse_int(value: &str, column: &'static str, line: u64) -> Result<i64, DatasetError> {
    let value = value.trim();
    if let Ok(v) = value.parse::<i64>() {
        return Ok(v);
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v.trunc() as i64),
        _ => Err(DatasetError::InvalidValue {
            line,
            column,
            value: value.to_string(),
        }),
    }
}

/// Feature column; an empty cell is a missing value and reads as NaN
fn parse_float(value: &str, column: &'static str, line: u64) -> Result<f64, DatasetError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(f64::NAN);
    }
    value.parse().map_err(|_| DatasetError::InvalidValue {
        line,
        column,
        value: value.to_string(),
    })
}
