#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::BTreeMap,
    io::Read,
    path::{Path, PathBuf},
};

use calamine::{Data, Reader, open_workbook_auto};
use itertools::Itertools;

use crate::constants::{
    ACTIVE_COLUMN, ACTIVE_MARKER, CHALLENGE_COLUMN, CRITERIA_COLUMN, FOLDER_COLUMN,
    REQUIRED_COLUMNS, STAGE_COLUMN, WEEK_COLUMN,
};

/// Errors raised while loading the rubric or picking its active row.
#[derive(thiserror::Error, Debug)]
pub enum RubricError {
    /// The rubric file could not be opened.
    #[error("Could not read rubric at {}", .path.display())]
    Io {
        /// rubric location
        path:   PathBuf,
        /// underlying error
        #[source]
        source: std::io::Error,
    },
    /// The workbook could not be parsed.
    #[error("Could not parse rubric workbook: {0}")]
    Workbook(#[from] calamine::Error),
    /// The CSV file could not be parsed.
    #[error("Could not parse rubric CSV: {0}")]
    Csv(#[from] csv::Error),
    /// The source has no header row.
    #[error("Rubric has no header row")]
    EmptySheet,
    /// A required column is absent from the header row.
    #[error("Rubric is missing the `{0}` column")]
    MissingColumn(String),
    /// No row carries the active marker.
    #[error("No active challenge found in the rubric (no row has `Atual` = `x`)")]
    NoActiveChallenge,
    /// More than one row carries the active marker.
    #[error("More than one active challenge in the rubric (rows {})", .rows.iter().join(", "))]
    AmbiguousActiveChallenge {
        /// 1-based data row numbers flagged active
        rows: Vec<usize>,
    },
}

/// A rubric read into memory as text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RubricTable {
    /// Column names, trimmed.
    headers: Vec<String>,
    /// Data rows; may be shorter than `headers`.
    rows:    Vec<Vec<String>>,
}

impl RubricTable {
    /// Builds a table from already-extracted cells. Rows whose cells are all
    /// blank are dropped.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let rows = rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .collect();
        Self { headers, rows }
    }

    /// Loads a rubric from disk. `.csv` files go through the CSV reader,
    /// everything else is opened as a workbook and its first sheet is used.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RubricError> {
        let path = path.as_ref();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        if is_csv {
            let file = std::fs::File::open(path).map_err(|source| RubricError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_csv_reader(file)
        } else {
            if !path.exists() {
                return Err(RubricError::Io {
                    path:   path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                });
            }
            Self::from_workbook(path)
        }
    }

    /// Reads the first worksheet of an `.xlsx`/`.xls`/`.ods` file.
    fn from_workbook(path: &Path) -> Result<Self, RubricError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(RubricError::EmptySheet)??;

        let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
        let headers = rows.next().ok_or(RubricError::EmptySheet)?;
        Ok(Self::new(headers, rows.collect()))
    }

    /// Reads CSV with a header row. Short rows are allowed.
    pub fn from_csv_reader(reader: impl Read) -> Result<Self, RubricError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(RubricError::EmptySheet);
        }

        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;

        Ok(Self::new(headers, rows))
    }

    /// Returns the header row.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Returns the number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first `name` column in the header row.
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Picks the single row whose active column holds the marker.
    ///
    /// Fails when a required column is missing, when no row is active, and
    /// when several rows are.
    pub fn resolve_active(&self) -> Result<RubricRow, RubricError> {
        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| self.column(c).is_none()) {
            return Err(RubricError::MissingColumn(missing.to_string()));
        }
        let active_col = self
            .column(ACTIVE_COLUMN)
            .ok_or_else(|| RubricError::MissingColumn(ACTIVE_COLUMN.to_string()))?;

        let active: Vec<(usize, &Vec<String>)> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                row.get(active_col)
                    .is_some_and(|cell| cell.trim() == ACTIVE_MARKER)
            })
            .collect();

        match active.as_slice() {
            [] => Err(RubricError::NoActiveChallenge),
            [(_, row)] => Ok(self.to_row(row)),
            many => Err(RubricError::AmbiguousActiveChallenge {
                rows: many.iter().map(|(idx, _)| idx + 1).collect(),
            }),
        }
    }

    /// Pairs every header with the matching cell of `row`. A repeated header
    /// keeps its first column, matching [`RubricTable::column`].
    fn to_row(&self, row: &[String]) -> RubricRow {
        let mut fields = BTreeMap::new();
        for (idx, name) in self.headers.iter().enumerate() {
            if name.is_empty() {
                continue;
            }
            fields
                .entry(name.clone())
                .or_insert_with(|| row.get(idx).cloned().unwrap_or_default());
        }
        RubricRow { fields }
    }
}

/// Renders a workbook cell as text; whole floats lose their `.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Loads `path` and returns its active row.
pub fn load_active_challenge(path: impl AsRef<Path>) -> Result<RubricRow, RubricError> {
    RubricTable::from_path(path)?.resolve_active()
}

/// The active rubric row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RubricRow {
    /// Column name to cell text.
    fields: BTreeMap<String, String>,
}

impl RubricRow {
    /// Builds a row directly from column/value pairs.
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Every column of the row, verbatim.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Cell text for `column`, if the column exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Cell text for `column` with surrounding whitespace removed, or `None`
    /// when missing or blank.
    fn non_blank(&self, column: &str) -> Option<&str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Stage number.
    pub fn stage(&self) -> Option<&str> {
        self.non_blank(STAGE_COLUMN)
    }

    /// Week number.
    pub fn week(&self) -> Option<&str> {
        self.non_blank(WEEK_COLUMN)
    }

    /// Challenge statement.
    pub fn challenge(&self) -> Option<&str> {
        self.non_blank(CHALLENGE_COLUMN)
    }

    /// Grading criteria.
    pub fn criteria(&self) -> Option<&str> {
        self.non_blank(CRITERIA_COLUMN)
    }

    /// Drive folder that holds the submissions.
    pub fn folder_id(&self) -> Option<&str> {
        self.non_blank(FOLDER_COLUMN)
    }
}
