pub mod abundance;
pub mod driver;
pub mod merge;
pub mod reconcile;

pub use driver::{RankDriver, SampleInput};

use crate::io::TableError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to process sample '{sample}'")]
    Sample {
        sample: String,
        #[source]
        source: TableError,
    },

    #[error("Failed to write {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("No samples were provided")]
    NoSamples,

    #[error("No taxonomic ranks were requested")]
    NoRanks,
}
