//! Sample sheet handling.
//!
//! The sample sheet lists one barcode per row with its status (patient
//! sample, positive control, negative control, ...). It drives the barcode
//! list and the staging of control results for the report.

use crate::bio::Rank;
use crate::pipeline::driver::output_file_name;
use calamine::{open_workbook_auto, Reader};
use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Workbook '{0}' has no worksheets")]
    NoWorksheet(String),

    #[error("Sample sheet '{path}' is missing the '{column}' column")]
    MissingColumn { path: String, column: &'static str },

    #[error("No valid sample entries found in sample sheet '{0}'")]
    Empty(String),
}

/// Control samples recognised in the `Status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Positive,
    Negative,
}

impl ControlKind {
    pub fn status(&self) -> &'static str {
        match self {
            ControlKind::Positive => "positive control",
            ControlKind::Negative => "negative control",
        }
    }

    /// Name the staged control table is written under.
    pub fn staged_file_name(&self) -> &'static str {
        match self {
            ControlKind::Positive => "positive_control.csv",
            ControlKind::Negative => "negative_control.csv",
        }
    }
}

/// One row of the sample sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEntry {
    pub barcode: String,
    pub status: String,
    /// Remaining columns, keyed by header.
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct SampleSheet {
    samples: Vec<SampleEntry>,
}

impl SampleSheet {
    pub fn new() -> Self {
        SampleSheet {
            samples: Vec::new(),
        }
    }

    /// Barcodes in sheet order.
    pub fn barcodes(&self) -> Vec<&str> {
        self.samples.iter().map(|s| s.barcode.as_str()).collect()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Barcode of the control of the given kind, if the sheet has one.
    pub fn control_barcode(&self, kind: ControlKind) -> Option<&str> {
        let mut controls = self
            .samples
            .iter()
            .filter(|s| s.status.trim().eq_ignore_ascii_case(kind.status()));
        let first = controls.next()?;
        if controls.next().is_some() {
            warn!(
                "Sample sheet lists more than one {}; using barcode '{}'",
                kind.status(),
                first.barcode
            );
        }
        Some(first.barcode.as_str())
    }

    /// Species-level result file expected for the control of the given kind.
    pub fn control_result_file(&self, kind: ControlKind) -> Option<String> {
        self.control_barcode(kind)
            .map(|barcode| output_file_name(barcode, Rank::Species))
    }
}

/// Columns read from a spreadsheet sample sheet; anything further right is ignored.
const SHEET_COLUMNS: usize = 6;

/// Header row and data rows of a sample sheet, as text.
type RawSheet = (Vec<String>, Vec<Vec<String>>);

/// Loads a sample sheet from an Excel workbook (`.xlsx`/`.xls`) or a CSV file.
///
/// Workbooks are read from their first worksheet, first six columns only.
/// `Barcode` and `Status` columns are required (matched case-insensitively);
/// all other columns are kept as attributes.
pub fn load_sample_sheet(path: impl AsRef<Path>) -> Result<SampleSheet, MetadataError> {
    let path = path.as_ref();
    let (headers, rows) = if is_spreadsheet(path) {
        read_worksheet(path)?
    } else {
        read_csv(path)?
    };

    let find = |column: &'static str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(column))
            .ok_or_else(|| MetadataError::MissingColumn {
                path: path.display().to_string(),
                column,
            })
    };
    let barcode_col = find("Barcode")?;
    let status_col = find("Status")?;

    let mut sheet = SampleSheet::new();
    for row in rows {
        let field = |i: usize| row.get(i).map(|f| f.trim()).unwrap_or_default();
        let barcode = field(barcode_col);
        let status = field(status_col);

        if barcode.is_empty() {
            warn!("Skipping sample sheet row with empty barcode.");
            continue;
        }

        let attributes = row
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != barcode_col && *i != status_col)
            .map(|(i, field)| {
                let header = headers.get(i).map(String::as_str).unwrap_or("unknown");
                (header.to_string(), field.to_string())
            })
            .collect();

        sheet.samples.push(SampleEntry {
            barcode: barcode.to_string(),
            status: status.to_string(),
            attributes,
        });
    }

    if sheet.sample_count() == 0 {
        return Err(MetadataError::Empty(path.display().to_string()));
    }

    info!("Loaded {} samples from {}", sheet.sample_count(), path.display());
    Ok(sheet)
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xls"))
}

fn read_csv(path: &Path) -> Result<RawSheet, MetadataError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        rows.push(result?.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

fn read_worksheet(path: &Path) -> Result<RawSheet, MetadataError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| MetadataError::NoWorksheet(path.display().to_string()))??;

    let mut rows = range.rows().map(|row| {
        row.iter()
            .take(SHEET_COLUMNS)
            .map(|cell| cell.to_string())
            .collect::<Vec<String>>()
    });
    let headers = rows.next().unwrap_or_default();
    Ok((headers, rows.collect()))
}

/// Copies the control result tables into `output_dir` for the report.
///
/// A control that is missing from the sheet, or whose result file does not
/// exist in `results_dir`, is staged as an empty file.
pub fn stage_controls(
    sheet: &SampleSheet,
    results_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, MetadataError> {
    let mut staged = Vec::with_capacity(2);
    for kind in [ControlKind::Positive, ControlKind::Negative] {
        let target = output_dir.as_ref().join(kind.staged_file_name());
        let source = sheet
            .control_result_file(kind)
            .map(|file| results_dir.as_ref().join(file))
            .filter(|source| source.is_file());

        match source {
            Some(source) => {
                fs::copy(&source, &target)?;
                info!("Staged {} from {}", kind.status(), source.display());
            }
            None => {
                fs::write(&target, "")?;
                warn!("{} not provided", kind.status());
            }
        }
        staged.push(target);
    }
    Ok(staged)
}
