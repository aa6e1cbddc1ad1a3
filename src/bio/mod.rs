//! Taxonomy primitives shared by the resolver and the abundance pipeline.

pub mod taxonomy;

pub use taxonomy::{parse_taxid, Rank, TaxId, ROOT_TAXID, UNCLASSIFIED};
