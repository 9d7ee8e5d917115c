#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, XlsxError};
use tabled::{
    Table,
    settings::{Panel, Style},
};

use crate::{constants::REPORT_COLUMNS, types::EvaluationRecord};

/// Errors raised while writing the report.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// The destination could not be created.
    #[error("Could not write report to {}", .path.display())]
    Io {
        /// destination
        path:   PathBuf,
        /// underlying error
        #[source]
        source: std::io::Error,
    },
    /// CSV serialization failed.
    #[error("Could not write CSV report: {0}")]
    Csv(#[from] csv::Error),
    /// Workbook serialization failed.
    #[error("Could not write workbook report: {0}")]
    Xlsx(#[from] XlsxError),
}

/// Writes `records` to `path`, replacing any existing file.
///
/// `.csv` paths get CSV; anything else gets a single-sheet workbook. The header
/// row is written even when there are no records.
pub fn write_report(path: impl AsRef<Path>, records: &[EvaluationRecord]) -> Result<(), ReportError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        write_csv(path, records)
    } else {
        write_xlsx(path, records)
    }
}

/// CSV flavour of [`write_report`].
fn write_csv(path: &Path, records: &[EvaluationRecord]) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(REPORT_COLUMNS)?;
    for record in records {
        writer.write_record(record.cells())?;
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Workbook flavour of [`write_report`].
fn write_xlsx(path: &Path, records: &[EvaluationRecord]) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in REPORT_COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }
    for (row, record) in records.iter().enumerate() {
        for (col, cell) in record.cells().into_iter().enumerate() {
            sheet.write_string(row as u32 + 1, col as u16, cell)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Renders `records` as a console table.
pub fn render_table(records: &[EvaluationRecord]) -> String {
    Table::new(records)
        .with(Panel::header("Avaliações"))
        .with(Style::modern())
        .to_string()
}
