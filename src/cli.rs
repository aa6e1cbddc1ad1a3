use crate::bio::Rank;
use crate::config::PipelineConfig;
use crate::database::LocalTaxonomy;
use crate::metadata::{load_sample_sheet, stage_controls};
use crate::pipeline::{RankDriver, SampleInput};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::fs;
use std::path::PathBuf;

/// Relative abundance tables from NanoCLUST classification results.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile classifier calls and write one merged abundance table per rank
    Abundance {
        /// Semicolon-delimited classification table, one per sample
        #[arg(short, long = "table", required = true, num_args = 1..)]
        tables: Vec<PathBuf>,

        /// Sample barcode, in the same order as the tables
        #[arg(short, long = "barcode", required = true, num_args = 1..)]
        barcodes: Vec<String>,

        /// Local taxonomy lookup table (taxid, species, genus, family, order, name, sciname)
        #[arg(long)]
        taxonomy: Option<PathBuf>,

        /// Directory the tables are written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Rank to report (S, G, F, O or C); repeatable
        #[arg(short, long = "rank")]
        ranks: Vec<Rank>,

        /// Base URL of the taxonomy API
        #[arg(long)]
        api_url: Option<String>,

        /// Never query the remote taxonomy service
        #[arg(long)]
        no_remote: bool,
    },

    /// Stage positive and negative control results listed in a sample sheet
    Controls {
        /// Sample sheet (.xlsx or CSV) with Barcode and Status columns
        #[arg(short, long)]
        metatable: PathBuf,

        /// Directory holding the species-level abundance tables
        #[arg(long, default_value = ".")]
        results_dir: PathBuf,

        /// Directory the control tables are staged in
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Print the barcodes listed in a sample sheet
    Barcodes {
        /// Sample sheet (.xlsx or CSV) with Barcode and Status columns
        #[arg(short, long)]
        metatable: PathBuf,
    },
}

/// Main entry point for CLI
pub fn run_cli(cli: Cli) -> Result<()> {
    let Cli { config, command } = cli;

    match command {
        Commands::Abundance {
            tables,
            barcodes,
            taxonomy,
            output_dir,
            ranks,
            api_url,
            no_remote,
        } => {
            if tables.len() != barcodes.len() {
                bail!(
                    "{} tables were given for {} barcodes",
                    tables.len(),
                    barcodes.len()
                );
            }

            let mut config = PipelineConfig::load_or_default(config.as_deref())
                .context("Failed to load configuration")?;
            if no_remote {
                config.remote.enabled = false;
            }
            if let Some(url) = api_url {
                config.remote.base_url = url;
            }
            if !ranks.is_empty() {
                config.ranks = ranks;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            info!("Configuration: {:?}", config);

            let taxonomy = match taxonomy {
                Some(path) => Some(LocalTaxonomy::from_path(&path).with_context(|| {
                    format!("Failed to load taxonomy table {}", path.display())
                })?),
                None => None,
            };

            fs::create_dir_all(&config.output_dir).with_context(|| {
                format!("Failed to create {}", config.output_dir.display())
            })?;
            let resolver = config
                .build_resolver()
                .context("Failed to set up the taxonomy service client")?;

            let samples: Vec<SampleInput> = barcodes
                .into_iter()
                .zip(tables)
                .map(|(barcode, table)| SampleInput::new(barcode, table))
                .collect();

            let mut driver = RankDriver::new(resolver, taxonomy, &config.output_dir);
            let written = driver.run(&samples, &config.ranks)?;
            for path in written {
                println!("{}", path.display());
            }
            Ok(())
        }

        Commands::Controls {
            metatable,
            results_dir,
            output_dir,
        } => {
            let sheet = load_sample_sheet(&metatable)
                .with_context(|| format!("Failed to read sample sheet {}", metatable.display()))?;
            fs::create_dir_all(&output_dir)?;
            for path in stage_controls(&sheet, &results_dir, &output_dir)? {
                println!("{}", path.display());
            }
            Ok(())
        }

        Commands::Barcodes { metatable } => {
            let sheet = load_sample_sheet(&metatable)
                .with_context(|| format!("Failed to read sample sheet {}", metatable.display()))?;
            for barcode in sheet.barcodes() {
                println!("{}", barcode);
            }
            Ok(())
        }
    }
}
