//! Per-sample relative abundance.

use crate::bio::TaxId;
use crate::pipeline::reconcile::ClusterRecord;
use log::warn;

/// Share of a sample's reads assigned to one cluster's taxon.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleAbundanceEntry {
    pub taxid: Option<TaxId>,
    /// Percentage of the sample's reads, in [0, 100].
    pub rel_abundance: f64,
    pub reads: u64,
}

/// Abundance entries of one sample, one per reconciled cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleAbundance {
    pub sample_id: String,
    pub entries: Vec<SampleAbundanceEntry>,
}

/// Computes each cluster's percentage of the sample's total reads.
///
/// Entries are not deduplicated by taxid. A sample whose total is zero
/// gets an abundance of 0 for every entry.
pub fn compute(sample_id: &str, records: &[ClusterRecord]) -> SampleAbundance {
    let total: u64 = records.iter().map(|r| r.reads_in_cluster).sum();
    if total == 0 {
        warn!(
            "Sample '{}' has no reads across {} clusters; relative abundances set to 0",
            sample_id,
            records.len()
        );
    }

    let entries = records
        .iter()
        .map(|record| SampleAbundanceEntry {
            taxid: record.taxid,
            rel_abundance: if total == 0 {
                0.0
            } else {
                record.reads_in_cluster as f64 / total as f64 * 100.0
            },
            reads: record.reads_in_cluster,
        })
        .collect();

    SampleAbundance {
        sample_id: sample_id.to_string(),
        entries,
    }
}
