//! Input/Output operations module.
//!
//! Handles reading per-sample classification tables and writing the
//! reconciled audit tables and merged abundance tables.

use crate::count_table::AbundanceTable;
use crate::pipeline::abundance::SampleAbundance;
use crate::pipeline::reconcile::{ClusterRecord, CLUSTER_COLUMNS};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Data columns every classification table must carry (row index excluded).
pub const BASELINE_COLUMNS: usize = 12;

/// Field spellings read as missing values.
pub const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Sample '{sample}': expected at least {expected} data columns, found {found}")]
    TooFewColumns {
        sample: String,
        expected: usize,
        found: usize,
    },

    #[error("Sample '{sample}', row {row}: invalid {column} value '{value}'")]
    InvalidValue {
        sample: String,
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Returns true when a raw field should be treated as a missing value.
pub fn is_missing(field: &str) -> bool {
    NA_VALUES.contains(&field.trim())
}

/// One sample's classification output, kept positional.
///
/// The leading row-index column of the source file is dropped; every row
/// is padded with missing values up to the header width.
#[derive(Debug, Clone)]
pub struct ClassificationTable {
    pub sample_id: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ClassificationTable {
    /// Reads a semicolon-delimited classification table from disk.
    pub fn from_path(sample_id: &str, path: impl AsRef<Path>) -> Result<Self, TableError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(sample_id, file)
    }

    pub fn from_reader<R: Read>(sample_id: &str, reader: R) -> Result<Self, TableError> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .skip(1)
            .map(|h| h.trim().to_string())
            .collect();

        if headers.len() < BASELINE_COLUMNS {
            return Err(TableError::TooFewColumns {
                sample: sample_id.to_string(),
                expected: BASELINE_COLUMNS,
                found: headers.len(),
            });
        }

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let mut row: Vec<Option<String>> = record
                .iter()
                .skip(1)
                .map(|field| {
                    if is_missing(field) {
                        None
                    } else {
                        Some(field.to_string())
                    }
                })
                .collect();
            if row.len() < headers.len() {
                row.resize(headers.len(), None);
            }
            rows.push(row);
        }

        Ok(ClassificationTable {
            sample_id: sample_id.to_string(),
            headers,
            rows,
        })
    }

    /// Number of data columns (row index excluded).
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Position of a named column, compared case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Formats a float so integral values keep a trailing `.0`.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Writes reconciled cluster records as a comma-separated audit table.
///
/// The first column is an unnamed zero-based row index and the last holds
/// each cluster's relative abundance. `abundance` must come from `records`.
pub fn write_reconciled<W: Write>(
    records: &[ClusterRecord],
    abundance: &SampleAbundance,
    writer: W,
) -> Result<(), TableError> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    let mut header = vec![""];
    header.extend(CLUSTER_COLUMNS.iter().copied());
    header.push("rel_abundance");
    writer.write_record(&header)?;

    for (i, (record, entry)) in records.iter().zip(&abundance.entries).enumerate() {
        let mut row = Vec::with_capacity(CLUSTER_COLUMNS.len() + 2);
        row.push(i.to_string());
        row.extend(record.to_fields());
        row.push(format_float(entry.rel_abundance));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes reconciled records to `path`.
pub fn write_reconciled_file(
    records: &[ClusterRecord],
    abundance: &SampleAbundance,
    path: impl AsRef<Path>,
) -> Result<(), TableError> {
    let file = File::create(path.as_ref())?;
    write_reconciled(records, abundance, BufWriter::new(file))
}

/// Writes a merged abundance table.
///
/// A single-sample table uses the bare `rel_abundance`/`reads` headers;
/// with several samples each pair is suffixed with the sample name.
pub fn write_abundance_table<W: Write>(table: &AbundanceTable<String>, writer: W) -> Result<(), TableError> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    let mut header = vec!["taxid".to_string()];
    if table.sample_names().len() == 1 {
        header.push("rel_abundance".to_string());
        header.push("reads".to_string());
    } else {
        for sample in table.sample_names() {
            header.push(format!("rel_abundance_{}", sample));
            header.push(format!("reads_{}", sample));
        }
    }
    writer.write_record(&header)?;

    let (n_features, n_samples) = table.dimensions();
    for r in 0..n_features {
        let mut record = Vec::with_capacity(1 + 2 * n_samples);
        record.push(table.feature_names()[r].clone());
        for c in 0..n_samples {
            record.push(format_float(table.rel_abundance_matrix()[[r, c]]));
            record.push(table.reads_matrix()[[r, c]].to_string());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes a merged abundance table to `path`.
pub fn write_abundance_file(table: &AbundanceTable<String>, path: impl AsRef<Path>) -> Result<(), TableError> {
    let file = File::create(path.as_ref())?;
    write_abundance_table(table, BufWriter::new(file))
}
