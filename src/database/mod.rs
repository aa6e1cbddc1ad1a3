pub mod local;
pub mod remote;
pub mod resolver;

pub use local::LocalTaxonomy;
pub use remote::{TaxonomyService, UnipeptClient};
pub use resolver::TaxonomyResolver;

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Taxonomy API error: {0}")]
    ApiError(String),

    #[error("Missing field '{0}' in taxonomy record")]
    MissingField(String),

    #[error("Taxonomy table error: {0}")]
    TableFormat(String),
}
