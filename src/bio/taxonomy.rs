//! Taxonomic ranks and taxonomy identifiers.
//!
//! Ranks are addressed by the single-letter tags used throughout the
//! classification outputs (`S`, `G`, `F`, `O`, `C`). Each rank knows the
//! column it occupies in a local lookup table and the field it occupies in
//! a remote taxonomy service response.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric taxonomy identifier (e.g., NCBI taxon ID).
pub type TaxId = u64;

/// Root of the taxonomy, used in place of a missing id for remote lookups.
pub const ROOT_TAXID: TaxId = 1;

/// Display name for clusters without a taxonomy id.
pub const UNCLASSIFIED: &str = "unclassified";

/// Taxonomic ranks the abundance tables can be aggregated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "S", alias = "species")]
    Species,
    #[serde(rename = "G", alias = "genus")]
    Genus,
    #[serde(rename = "F", alias = "family")]
    Family,
    #[serde(rename = "O", alias = "order")]
    Order,
    #[serde(rename = "C", alias = "class")]
    Class,
}

impl Rank {
    /// Ranks produced by a default abundance run, in processing order.
    pub const DEFAULT_RANKS: [Rank; 4] = [Rank::Species, Rank::Genus, Rank::Family, Rank::Order];

    /// Single-letter tag used in file names and `class_level` columns.
    pub fn tag(&self) -> &'static str {
        match self {
            Rank::Species => "S",
            Rank::Genus => "G",
            Rank::Family => "F",
            Rank::Order => "O",
            Rank::Class => "C",
        }
    }

    /// Returns a string representation of the rank.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Species => "species",
            Rank::Genus => "genus",
            Rank::Family => "family",
            Rank::Order => "order",
            Rank::Class => "class",
        }
    }

    /// Field holding this rank's name in a remote taxonomy record.
    pub fn remote_field(&self) -> &'static str {
        match self {
            Rank::Species => "species_name",
            Rank::Genus => "genus_name",
            Rank::Family => "family_name",
            Rank::Order => "order_name",
            Rank::Class => "class_name",
        }
    }

    /// Parses a single-letter tag (case-insensitive).
    pub fn from_tag(tag: &str) -> Option<Rank> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "S" => Some(Rank::Species),
            "G" => Some(Rank::Genus),
            "F" => Some(Rank::Family),
            "O" => Some(Rank::Order),
            "C" => Some(Rank::Class),
            _ => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = String;

    /// Accepts either the tag (`S`) or the full rank name (`species`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rank) = Rank::from_tag(s) {
            return Ok(rank);
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "species" => Ok(Rank::Species),
            "genus" => Ok(Rank::Genus),
            "family" => Ok(Rank::Family),
            "order" => Ok(Rank::Order),
            "class" => Ok(Rank::Class),
            _ => Err(format!("unknown taxonomic rank '{}'", s)),
        }
    }
}

/// Parses a taxonomy id as written by classification tables.
///
/// Float-typed columns serialise ids as `9606.0`, so integral floats are
/// accepted. Anything else (including fractional or negative values)
/// yields `None`.
pub fn parse_taxid(field: &str) -> Option<TaxId> {
    let field = field.trim();
    if let Ok(id) = field.parse::<TaxId>() {
        return Some(id);
    }
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 => {
            Some(value as TaxId)
        }
        _ => None,
    }
}
