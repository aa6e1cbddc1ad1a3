//! Main entry point for the nanoclust_abundance application.
//!
//! Turns per-sample NanoCLUST classification tables into relative abundance
//! tables for clinical metagenomics reports:
//! 1. Reconcile the calls of several classifiers per read cluster.
//! 2. Compute each cluster's share of the sample's reads.
//! 3. Merge samples, resolve taxids to names and sum taxa per rank.
//! 4. Write one table per taxonomic rank.

mod bio;
mod cli;
mod config;
mod count_table;
mod database;
mod io;
mod metadata;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use cli::{run_cli, Cli};

fn main() -> Result<()> {
    // RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    run_cli(cli)
}
