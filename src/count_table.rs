//! Multi-sample abundance tables.
//!
//! Rows are features (taxonomy ids before renaming, display names after)
//! and columns are samples. Every cell holds a relative abundance and a
//! read count; absent combinations are stored as zero.

use crate::bio::TaxId;
use crate::pipeline::abundance::SampleAbundance;
use indexmap::IndexSet;
use itertools::Itertools;
use ndarray::{Array2, Axis};
use std::hash::Hash;

/// Abundance table keyed by features of type `K`.
#[derive(Debug, Clone)]
pub struct AbundanceTable<K> {
    /// Relative abundance matrix (features x samples).
    rel_abundance: Array2<f64>,
    /// Read count matrix (features x samples).
    reads: Array2<u64>,
    feature_names: Vec<K>,
    sample_names: Vec<String>,
}

impl AbundanceTable<Option<TaxId>> {
    /// Outer-joins per-sample abundances on taxid.
    ///
    /// Rows appear in order of first sighting across samples. A sample
    /// lacking a taxid contributes zero; repeated taxids within one sample
    /// are summed.
    pub fn outer_join(samples: &[SampleAbundance]) -> Self {
        let mut features: IndexSet<Option<TaxId>> = IndexSet::new();
        for sample in samples {
            for entry in &sample.entries {
                features.insert(entry.taxid);
            }
        }

        let shape = (features.len(), samples.len());
        let mut rel_abundance = Array2::<f64>::zeros(shape);
        let mut reads = Array2::<u64>::zeros(shape);
        for (c, sample) in samples.iter().enumerate() {
            for entry in &sample.entries {
                if let Some(r) = features.get_index_of(&entry.taxid) {
                    rel_abundance[[r, c]] += entry.rel_abundance;
                    reads[[r, c]] += entry.reads;
                }
            }
        }

        AbundanceTable {
            rel_abundance,
            reads,
            feature_names: features.into_iter().collect(),
            sample_names: samples.iter().map(|s| s.sample_id.clone()).collect(),
        }
    }
}

impl<K> AbundanceTable<K> {
    /// Relabels every feature and sums the rows that share a label.
    ///
    /// `label` is called exactly once per feature, in row order. Groups
    /// keep the position of their first member.
    pub fn aggregate_by<L, F>(&self, mut label: F) -> AbundanceTable<L>
    where
        L: Hash + Eq,
        F: FnMut(&K) -> L,
    {
        let mut groups: IndexSet<L> = IndexSet::new();
        let assignment: Vec<usize> = self
            .feature_names
            .iter()
            .map(|feature| groups.insert_full(label(feature)).0)
            .collect();

        let shape = (groups.len(), self.sample_names.len());
        let mut rel_abundance = Array2::<f64>::zeros(shape);
        let mut reads = Array2::<u64>::zeros(shape);
        for (r, &g) in assignment.iter().enumerate() {
            let mut rel_row = rel_abundance.row_mut(g);
            rel_row += &self.rel_abundance.row(r);
            let mut reads_row = reads.row_mut(g);
            reads_row += &self.reads.row(r);
        }

        AbundanceTable {
            rel_abundance,
            reads,
            feature_names: groups.into_iter().collect(),
            sample_names: self.sample_names.clone(),
        }
    }

    /// Relative abundance of each feature summed over all samples.
    pub fn total_abundance(&self) -> Vec<f64> {
        self.rel_abundance.sum_axis(Axis(1)).to_vec()
    }

    /// Reorders rows by the permutation `order` (new row i = old row order[i]).
    fn reorder(&mut self, order: &[usize])
    where
        K: Clone,
    {
        self.rel_abundance = self.rel_abundance.select(Axis(0), order);
        self.reads = self.reads.select(Axis(0), order);
        self.feature_names = order.iter().map(|&i| self.feature_names[i].clone()).collect();
    }

    /// Sorts rows by total relative abundance, highest first.
    ///
    /// Rows with equal abundance are ordered by feature.
    pub fn sort_by_abundance(&mut self)
    where
        K: Ord + Clone,
    {
        let totals = self.total_abundance();
        let order: Vec<usize> = (0..self.feature_names.len())
            .sorted_by(|&a, &b| self.feature_names[a].cmp(&self.feature_names[b]))
            .sorted_by(|&a, &b| totals[b].total_cmp(&totals[a]))
            .collect();
        self.reorder(&order);
    }

    /// Returns the dimensions of the table (features, samples).
    pub fn dimensions(&self) -> (usize, usize) {
        self.rel_abundance.dim()
    }

    pub fn feature_names(&self) -> &[K] {
        &self.feature_names
    }

    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    pub fn rel_abundance_matrix(&self) -> &Array2<f64> {
        &self.rel_abundance
    }

    pub fn reads_matrix(&self) -> &Array2<u64> {
        &self.reads
    }
}

#[cfg(test)]
impl<K: PartialEq> AbundanceTable<K> {
    fn cell(&self, feature: &K, sample: &str) -> Option<(usize, usize)> {
        let r = self.feature_names.iter().position(|f| f == feature)?;
        let c = self.sample_names.iter().position(|s| s == sample)?;
        Some((r, c))
    }

    pub fn rel_abundance(&self, feature: &K, sample: &str) -> Option<f64> {
        self.cell(feature, sample).map(|(r, c)| self.rel_abundance[[r, c]])
    }

    pub fn reads(&self, feature: &K, sample: &str) -> Option<u64> {
        self.cell(feature, sample).map(|(r, c)| self.reads[[r, c]])
    }
}
