//! Classifier reconciliation.
//!
//! NanoCLUST-style classification tables can carry the calls of several
//! classifiers side by side. For every read cluster that the primary
//! classifier did not resolve to species level, exactly one classifier's
//! columns are kept and projected onto the fixed 12-column cluster schema.

use crate::bio::{parse_taxid, TaxId};
use crate::io::{ClassificationTable, TableError};
use log::{debug, warn};
use std::ops::Range;

/// Column names of a reconciled cluster record, in output order.
pub const CLUSTER_COLUMNS: [&str; 12] = [
    "reads_in_cluster",
    "used_for_consensus",
    "reads_after_corr",
    "draft_id",
    "classifier_name",
    "taxid",
    "stat",
    "name",
    "species",
    "genus",
    "family",
    "order",
];

/// Reconciliation only applies to tables wider than this.
pub const EXTENDED_COLUMN_THRESHOLD: usize = 13;

/// `class_level` value marking a cluster already resolved to species.
const SPECIES_LEVEL: &str = "S";

/// Classifiers whose calls can appear in an extended table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classifier {
    /// k-mer classifier; its calls live in the baseline columns.
    Kraken2,
    /// Alignment classifier.
    Blast,
    /// Exact-match classifier.
    Seqmatch,
}

impl Classifier {
    /// Candidates with the columns scored for each, in tie-break order.
    ///
    /// On equal scores the earlier entry wins.
    pub const CANDIDATES: [(Classifier, Range<usize>); 3] = [
        (Classifier::Kraken2, 8..12),
        (Classifier::Blast, 24..usize::MAX),
        (Classifier::Seqmatch, 16..20),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classifier::Kraken2 => "kraken2",
            Classifier::Blast => "blast",
            Classifier::Seqmatch => "seqmatch",
        }
    }

    /// Source columns projected onto the cluster schema for this classifier.
    pub fn projection(&self) -> [Range<usize>; 2] {
        match self {
            Classifier::Kraken2 => [0..12, 0..0],
            Classifier::Seqmatch => [0..4, 13..20],
            Classifier::Blast => [0..4, 20..28],
        }
    }
}

/// One read cluster after reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRecord {
    pub reads_in_cluster: u64,
    pub used_for_consensus: Option<u64>,
    pub reads_after_corr: Option<u64>,
    pub draft_id: Option<String>,
    pub classifier_name: Option<String>,
    pub taxid: Option<TaxId>,
    pub stat: Option<String>,
    pub name: Option<String>,
    pub species: Option<String>,
    pub genus: Option<String>,
    pub family: Option<String>,
    pub order: Option<String>,
    /// Classifier whose columns produced this record.
    pub source: Classifier,
}

impl ClusterRecord {
    /// Builds a record from projected fields in `CLUSTER_COLUMNS` order.
    ///
    /// Missing trailing fields are treated as missing values.
    pub fn from_fields(
        mut fields: Vec<Option<String>>,
        source: Classifier,
        sample: &str,
        row: usize,
    ) -> Result<Self, TableError> {
        fields.resize(CLUSTER_COLUMNS.len(), None);
        let mut fields = fields.into_iter();
        let mut next = move || fields.next().flatten();

        let reads_field = next();
        let reads_in_cluster = match reads_field.as_deref().and_then(parse_count) {
            Some(reads) => reads,
            None => {
                return Err(TableError::InvalidValue {
                    sample: sample.to_string(),
                    row,
                    column: "reads_in_cluster",
                    value: reads_field.unwrap_or_default(),
                })
            }
        };
        let used_for_consensus = parse_optional_count(next(), "used_for_consensus", sample, row)?;
        let reads_after_corr = parse_optional_count(next(), "reads_after_corr", sample, row)?;
        let draft_id = next();
        let classifier_name = next();
        let taxid_field = next();
        let taxid = taxid_field.as_deref().and_then(|field| {
            let parsed = parse_taxid(field);
            if parsed.is_none() {
                warn!(
                    "Sample '{}', row {}: unreadable taxid '{}', treating cluster as unclassified",
                    sample, row, field
                );
            }
            parsed
        });

        Ok(ClusterRecord {
            reads_in_cluster,
            used_for_consensus,
            reads_after_corr,
            draft_id,
            classifier_name,
            taxid,
            stat: next(),
            name: next(),
            species: next(),
            genus: next(),
            family: next(),
            order: next(),
            source,
        })
    }

    /// Renders the record in `CLUSTER_COLUMNS` order; missing values are empty.
    pub fn to_fields(&self) -> Vec<String> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        let count = |value: Option<u64>| value.map(|v| v.to_string()).unwrap_or_default();
        vec![
            self.reads_in_cluster.to_string(),
            count(self.used_for_consensus),
            count(self.reads_after_corr),
            text(&self.draft_id),
            text(&self.classifier_name),
            count(self.taxid),
            text(&self.stat),
            text(&self.name),
            text(&self.species),
            text(&self.genus),
            text(&self.family),
            text(&self.order),
        ]
    }
}

/// Parses a non-negative read count, accepting integral floats (`80.0`).
fn parse_count(field: &str) -> Option<u64> {
    let field = field.trim();
    if let Ok(count) = field.parse::<u64>() {
        return Some(count);
    }
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 => Some(value as u64),
        _ => None,
    }
}

fn parse_optional_count(
    field: Option<String>,
    column: &'static str,
    sample: &str,
    row: usize,
) -> Result<Option<u64>, TableError> {
    match field {
        None => Ok(None),
        Some(value) => match parse_count(&value) {
            Some(count) => Ok(Some(count)),
            None => Err(TableError::InvalidValue {
                sample: sample.to_string(),
                row,
                column,
                value,
            }),
        },
    }
}

/// Counts the non-missing fields of `row` inside `range`.
fn score(row: &[Option<String>], range: &Range<usize>) -> usize {
    let start = range.start.min(row.len());
    let end = range.end.min(row.len());
    row[start..end].iter().filter(|field| field.is_some()).count()
}

/// Picks the classifier with the most populated columns for one row.
pub fn choose_classifier(row: &[Option<String>]) -> Classifier {
    let mut best = Classifier::CANDIDATES[0].0;
    let mut best_score = 0;
    for (i, (classifier, range)) in Classifier::CANDIDATES.iter().enumerate() {
        let candidate = score(row, range);
        if i == 0 || candidate > best_score {
            best = *classifier;
            best_score = candidate;
        }
    }
    best
}

/// Projects a row onto the cluster schema using `classifier`'s columns.
pub fn project(row: &[Option<String>], classifier: Classifier) -> Vec<Option<String>> {
    let mut fields = Vec::with_capacity(CLUSTER_COLUMNS.len());
    for range in classifier.projection() {
        let start = range.start.min(row.len());
        let end = range.end.min(row.len());
        fields.extend(row[start..end].iter().cloned());
    }
    fields
}

/// Reconciles every row of a classification table.
///
/// Tables without extended classifier columns produce no records.
pub fn reconcile(table: &ClassificationTable) -> Result<Vec<ClusterRecord>, TableError> {
    if table.column_count() <= EXTENDED_COLUMN_THRESHOLD {
        warn!(
            "Sample '{}' has {} data columns, no extended classifier columns to reconcile; reconciled table is empty",
            table.sample_id,
            table.column_count()
        );
        return Ok(Vec::new());
    }

    let class_level = table.column_index("class_level");
    if class_level.is_none() {
        warn!(
            "Sample '{}' has no class_level column; every cluster will be reconciled",
            table.sample_id
        );
    }

    let mut records = Vec::with_capacity(table.len());
    for (i, row) in table.rows.iter().enumerate() {
        let species_resolved = class_level
            .and_then(|idx| row.get(idx))
            .and_then(|level| level.as_deref())
            .map_or(false, |level| level.trim() == SPECIES_LEVEL);

        let classifier = if species_resolved {
            Classifier::Kraken2
        } else {
            choose_classifier(row)
        };
        debug!(
            "Sample '{}', row {}: using {} columns",
            table.sample_id,
            i,
            classifier.as_str()
        );

        let fields = project(row, classifier);
        records.push(ClusterRecord::from_fields(fields, classifier, &table.sample_id, i)?);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    /// 28-column row with distinct markers per source column.
    fn extended_row(class_level: Option<&str>) -> Vec<Option<String>> {
        let mut row: Vec<Option<String>> = (0..28).map(|i| Some(format!("c{}", i))).collect();
        row[0] = field("40");
        row[1] = field("40");
        row[2] = field("38");
        row[3] = field("draft_9");
        row[5] = field("562");
        row[6] = class_level.map(str::to_string);
        row[14] = field("561");
        row[21] = field("1280");
        row
    }

    fn extended_table(rows: Vec<Vec<Option<String>>>) -> ClassificationTable {
        let mut headers: Vec<String> = (0..28).map(|i| format!("col{}", i)).collect();
        headers[6] = "class_level".to_string();
        ClassificationTable {
            sample_id: "barcode01".to_string(),
            headers,
            rows,
        }
    }

    #[test]
    fn test_species_rows_keep_baseline_columns() {
        let table = extended_table(vec![extended_row(Some("S"))]);
        let records = reconcile(&table).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, Classifier::Kraken2);
        assert_eq!(records[0].reads_in_cluster, 40);
        assert_eq!(records[0].taxid, Some(562));
        assert_eq!(records[0].stat.as_deref(), Some("S"));
        assert_eq!(records[0].order.as_deref(), Some("c11"));
    }

    #[test]
    fn test_tie_break_prefers_kraken2_columns() {
        // Every candidate range is fully populated: a three-way tie.
        let row = extended_row(Some("G"));
        assert_eq!(choose_classifier(&row), Classifier::Kraken2);

        let table = extended_table(vec![row]);
        let records = reconcile(&table).unwrap();
        let fields = records[0].to_fields();
        assert_eq!(
            fields,
            vec!["40", "40", "38", "draft_9", "c4", "562", "G", "c7", "c8", "c9", "c10", "c11"]
        );
    }

    #[test]
    fn test_blast_beats_seqmatch_on_tie() {
        let mut row = extended_row(None);
        for i in 8..12 {
            row[i] = None;
        }
        row[24] = None;
        row[16] = None;
        // blast: 3 of [24, 28), seqmatch: 3 of [16, 20)
        assert_eq!(choose_classifier(&row), Classifier::Blast);

        let fields = project(&row, Classifier::Blast);
        assert_eq!(fields.len(), 12);
        assert_eq!(fields[4].as_deref(), Some("c20"));
        assert_eq!(fields[5].as_deref(), Some("1280"));
    }

    #[test]
    fn test_seqmatch_projection_leaves_order_missing() {
        let mut row = extended_row(Some("F"));
        for i in (8..12).chain(24..28) {
            row[i] = None;
        }
        assert_eq!(choose_classifier(&row), Classifier::Seqmatch);

        let table = extended_table(vec![row]);
        let records = reconcile(&table).unwrap();
        let record = &records[0];
        assert_eq!(record.source, Classifier::Seqmatch);
        assert_eq!(record.classifier_name.as_deref(), Some("c13"));
        assert_eq!(record.taxid, Some(561));
        assert_eq!(record.family.as_deref(), Some("c19"));
        assert_eq!(record.order, None);
    }

    #[test]
    fn test_strict_maximum_wins() {
        let mut row = extended_row(None);
        for i in 8..12 {
            row[i] = None;
        }
        row[24] = None;
        row[25] = None;
        assert_eq!(choose_classifier(&row), Classifier::Seqmatch);
    }

    #[test]
    fn test_unknown_class_level_is_reconciled() {
        let mut row = extended_row(Some("X"));
        for i in (8..12).chain(16..20) {
            row[i] = None;
        }
        let table = extended_table(vec![row]);
        let records = reconcile(&table).unwrap();
        assert_eq!(records[0].source, Classifier::Blast);
        assert_eq!(records[0].taxid, Some(1280));
    }

    #[test]
    fn test_baseline_table_reconciles_to_empty() {
        let table = ClassificationTable {
            sample_id: "barcode02".to_string(),
            headers: CLUSTER_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: vec![vec![field("10"); 12]],
        };
        assert!(reconcile(&table).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_reads_is_an_error() {
        let mut row = extended_row(Some("S"));
        row[0] = field("many");
        let table = extended_table(vec![row]);
        let err = reconcile(&table).unwrap_err();
        assert!(matches!(
            err,
            TableError::InvalidValue { column: "reads_in_cluster", .. }
        ));
    }

    #[test]
    fn test_parse_count_accepts_integral_floats() {
        assert_eq!(parse_count("80.0"), Some(80));
        assert_eq!(parse_count("7"), Some(7));
        assert_eq!(parse_count("1.5"), None);
    }
}
