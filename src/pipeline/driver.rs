//! Rank-level driver.
//!
//! For every requested rank the samples are re-read, reconciled and turned
//! into abundances from scratch, then merged and written to one file per
//! rank. Nothing but the resolver's remote cache survives between ranks.

use super::abundance::{compute, SampleAbundance};
use super::merge::merge;
use super::reconcile::{reconcile, ClusterRecord};
use super::PipelineError;
use crate::bio::Rank;
use crate::database::{LocalTaxonomy, TaxonomyResolver};
use crate::io::{write_abundance_file, write_reconciled_file, ClassificationTable};
use log::info;
use std::path::PathBuf;

/// One sample's classification table and the barcode naming it.
#[derive(Debug, Clone)]
pub struct SampleInput {
    pub barcode: String,
    pub path: PathBuf,
}

impl SampleInput {
    pub fn new(barcode: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        SampleInput {
            barcode: barcode.into(),
            path: path.into(),
        }
    }
}

/// File name of a sample's reconciled audit table.
pub fn audit_file_name(barcode: &str) -> String {
    format!("{}_nanoclust_out.txt", barcode)
}

/// File name of the merged table for `barcode` at `rank`.
pub fn output_file_name(barcode: &str, rank: Rank) -> String {
    format!("rel_abundance_{}_{}.csv", barcode, rank.tag())
}

pub struct RankDriver {
    resolver: TaxonomyResolver,
    /// Fixed lookup table; when absent one is built from each rank's records.
    taxonomy: Option<LocalTaxonomy>,
    output_dir: PathBuf,
}

impl RankDriver {
    pub fn new(
        resolver: TaxonomyResolver,
        taxonomy: Option<LocalTaxonomy>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        RankDriver {
            resolver,
            taxonomy,
            output_dir: output_dir.into(),
        }
    }

    /// Runs every rank in order and returns the written files.
    pub fn run(&mut self, samples: &[SampleInput], ranks: &[Rank]) -> Result<Vec<PathBuf>, PipelineError> {
        if ranks.is_empty() {
            return Err(PipelineError::NoRanks);
        }
        ranks
            .iter()
            .map(|&rank| self.run_rank(samples, rank))
            .collect()
    }

    /// Reconciles, merges and writes the table for one rank.
    pub fn run_rank(&mut self, samples: &[SampleInput], rank: Rank) -> Result<PathBuf, PipelineError> {
        let first = samples.first().ok_or(PipelineError::NoSamples)?;
        info!("Computing {} abundances for {} samples", rank, samples.len());

        let mut abundances: Vec<SampleAbundance> = Vec::with_capacity(samples.len());
        let mut all_records: Vec<ClusterRecord> = Vec::new();
        for sample in samples {
            let (records, abundance) = self.process_sample(sample)?;
            abundances.push(abundance);
            all_records.extend(records);
        }

        let built;
        let local = match &self.taxonomy {
            Some(taxonomy) => taxonomy,
            None => {
                built = LocalTaxonomy::from_records(&all_records);
                &built
            }
        };
        let table = merge(&abundances, local, &mut self.resolver, rank);

        let path = self.output_dir.join(output_file_name(&first.barcode, rank));
        write_abundance_file(&table, &path).map_err(|source| PipelineError::Output {
            path: path.clone(),
            source,
        })?;
        info!("Wrote {} taxa to {}", table.dimensions().0, path.display());
        Ok(path)
    }

    fn process_sample(&self, sample: &SampleInput) -> Result<(Vec<ClusterRecord>, SampleAbundance), PipelineError> {
        let sample_error = |source| PipelineError::Sample {
            sample: sample.barcode.clone(),
            source,
        };

        let table = ClassificationTable::from_path(&sample.barcode, &sample.path).map_err(sample_error)?;
        let records = reconcile(&table).map_err(sample_error)?;
        info!(
            "Sample '{}': {} clusters read, {} reconciled",
            sample.barcode,
            table.len(),
            records.len()
        );

        let abundance = compute(&sample.barcode, &records);

        let audit_path = self.output_dir.join(audit_file_name(&sample.barcode));
        write_reconciled_file(&records, &abundance, &audit_path).map_err(|source| PipelineError::Output {
            path: audit_path.clone(),
            source,
        })?;
        Ok((records, abundance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::local::TaxonNames;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const HEADER: &str = ";reads_in_cluster;used_for_consensus;reads_after_corr;draft_id;classifier_name;taxid;class_level;name;species;genus;family;order;kraken_stat;seqmatch_classifier;seqmatch_taxid;seqmatch_stat;seqmatch_name;seqmatch_species;seqmatch_genus;seqmatch_family;blast_classifier;blast_taxid;blast_stat;blast_name;blast_species;blast_genus;blast_family;blast_order";

    fn write_sample(dir: &Path, file: &str) -> PathBuf {
        let rows = [
            "0;80;80;75;draft_1;kraken2;9606;S;Homo sapiens;Homo sapiens;Homo;Hominidae;Primates;;;;;;;;;;;;;;;",
            "1;20;20;18;draft_2;kraken2;;G;;;;;;;seqmatch;562;0.98;Escherichia coli;Escherichia coli;Escherichia;Enterobacteriaceae;;;;;;;;",
            "2;100;95;90;draft_3;;;;;;;;;;;;;;;;;blast;1280;99.1;S. aureus;Staphylococcus aureus;Staphylococcus;Staphylococcaceae;Bacillales",
        ];
        let path = dir.join(file);
        fs::write(&path, format!("{}\n{}\n", HEADER, rows.join("\n"))).unwrap();
        path
    }

    #[test]
    fn test_file_names() {
        assert_eq!(output_file_name("barcode01", Rank::Genus), "rel_abundance_barcode01_G.csv");
        assert_eq!(audit_file_name("barcode01"), "barcode01_nanoclust_out.txt");
    }

    #[test]
    fn test_species_run_writes_sorted_table() {
        let dir = tempdir().unwrap();
        let input = write_sample(dir.path(), "barcode01.csv");
        let mut driver = RankDriver::new(TaxonomyResolver::local_only(), None, dir.path());

        let path = driver
            .run_rank(&[SampleInput::new("barcode01", input)], Rank::Species)
            .unwrap();

        assert_eq!(path, dir.path().join("rel_abundance_barcode01_S.csv"));
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "taxid,rel_abundance,reads\n\
             Staphylococcus aureus,50.0,100\n\
             Homo sapiens,40.0,80\n\
             Escherichia coli,10.0,20\n"
        );

        let audit = fs::read_to_string(dir.path().join("barcode01_nanoclust_out.txt")).unwrap();
        let mut lines = audit.lines();
        assert_eq!(
            lines.next(),
            Some(",reads_in_cluster,used_for_consensus,reads_after_corr,draft_id,classifier_name,taxid,stat,name,species,genus,family,order,rel_abundance")
        );
        assert_eq!(
            lines.next(),
            Some("0,80,80,75,draft_1,kraken2,9606,S,Homo sapiens,Homo sapiens,Homo,Hominidae,Primates,40.0")
        );
        let rest: Vec<&str> = lines.collect();
        assert_eq!(rest.len(), 2);
        assert!(rest[0].starts_with("1,20,") && rest[0].ends_with(",10.0"));
        assert!(rest[1].starts_with("2,100,") && rest[1].ends_with(",50.0"));
    }

    #[test]
    fn test_order_rank_falls_back_to_record_name() {
        let dir = tempdir().unwrap();
        let input = write_sample(dir.path(), "barcode01.csv");
        let mut driver = RankDriver::new(TaxonomyResolver::local_only(), None, dir.path());

        let path = driver
            .run_rank(&[SampleInput::new("barcode01", input)], Rank::Order)
            .unwrap();
        let contents = fs::read_to_string(path).unwrap();
        // the seqmatch columns carry no order, so the cluster's name is used
        assert!(contents.contains("Escherichia coli,10.0,20"));
        assert!(contents.contains("Bacillales,50.0,100"));
    }

    #[test]
    fn test_run_all_ranks_with_fixed_taxonomy() {
        let dir = tempdir().unwrap();
        let a = write_sample(dir.path(), "a.csv");
        let b = write_sample(dir.path(), "b.csv");
        let mut taxonomy = LocalTaxonomy::new();
        taxonomy.insert(
            562,
            TaxonNames {
                genus: Some("Escherichia".to_string()),
                ..Default::default()
            },
        );
        let mut driver = RankDriver::new(TaxonomyResolver::local_only(), Some(taxonomy), dir.path());
        let samples = [SampleInput::new("barcode01", a), SampleInput::new("barcode02", b)];

        let written = driver.run(&samples, &Rank::DEFAULT_RANKS).unwrap();
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|p| p.exists()));

        let genus = fs::read_to_string(dir.path().join("rel_abundance_barcode01_G.csv")).unwrap();
        let mut lines = genus.lines();
        assert_eq!(
            lines.next(),
            Some("taxid,rel_abundance_barcode01,reads_barcode01,rel_abundance_barcode02,reads_barcode02")
        );
        // ids missing from the fixed table keep their numeric name
        assert_eq!(lines.next(), Some("1280,50.0,100,50.0,100"));
        assert_eq!(lines.next(), Some("9606,40.0,80,40.0,80"));
        assert_eq!(lines.next(), Some("Escherichia,10.0,20,10.0,20"));
    }

    #[test]
    fn test_missing_columns_are_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.csv");
        fs::write(&path, ";reads_in_cluster;taxid\n0;10;562\n").unwrap();
        let mut driver = RankDriver::new(TaxonomyResolver::local_only(), None, dir.path());

        let err = driver
            .run_rank(&[SampleInput::new("barcode09", path)], Rank::Species)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Sample { ref sample, .. } if sample == "barcode09"));
    }

    #[test]
    fn test_no_samples() {
        let dir = tempdir().unwrap();
        let mut driver = RankDriver::new(TaxonomyResolver::local_only(), None, dir.path());
        assert!(matches!(
            driver.run_rank(&[], Rank::Species),
            Err(PipelineError::NoSamples)
        ));
        assert!(matches!(driver.run(&[], &[]), Err(PipelineError::NoRanks)));
    }
}
