//! Local taxonomy lookup table.
//!
//! Maps a taxid to the names recorded for it at each rank. The table can
//! be read from a CSV file or assembled from reconciled cluster records,
//! which already carry species/genus/family/order names.

use super::DatabaseError;
use crate::bio::{parse_taxid, Rank, TaxId};
use crate::io::is_missing;
use crate::pipeline::reconcile::ClusterRecord;
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;

/// Names known for one taxid. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonNames {
    pub species: Option<String>,
    pub genus: Option<String>,
    pub family: Option<String>,
    pub order: Option<String>,
    pub name: Option<String>,
    pub sciname: Option<String>,
}

impl TaxonNames {
    fn rank_name(&self, rank: Rank) -> Option<&String> {
        match rank {
            Rank::Species => self.species.as_ref(),
            Rank::Genus => self.genus.as_ref(),
            Rank::Family => self.family.as_ref(),
            Rank::Order => self.order.as_ref(),
            Rank::Class => None,
        }
    }
}

fn usable(value: Option<&String>) -> Option<&String> {
    value.filter(|v| !is_missing(v))
}

#[derive(Debug, Clone, Default)]
pub struct LocalTaxonomy {
    entries: HashMap<TaxId, TaxonNames>,
}

impl LocalTaxonomy {
    pub fn new() -> Self {
        LocalTaxonomy {
            entries: HashMap::new(),
        }
    }

    /// Adds names for a taxid. The first entry recorded for a taxid wins.
    pub fn insert(&mut self, taxid: TaxId, names: TaxonNames) {
        self.entries.entry(taxid).or_insert(names);
    }

    /// Builds the table from reconciled clusters; clusters without a taxid are skipped.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ClusterRecord>) -> Self {
        let mut table = LocalTaxonomy::new();
        for record in records {
            if let Some(taxid) = record.taxid {
                table.insert(
                    taxid,
                    TaxonNames {
                        species: record.species.clone(),
                        genus: record.genus.clone(),
                        family: record.family.clone(),
                        order: record.order.clone(),
                        name: record.name.clone(),
                        sciname: None,
                    },
                );
            }
        }
        table
    }

    /// Loads a lookup table from a comma (or, for `.tsv` files, tab) separated file.
    ///
    /// A `taxid` column is required; `species`, `genus`, `family`, `order`,
    /// `name` and `sciname` are read when present.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)?;

        let headers = rdr.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let taxid_col = column("taxid").ok_or_else(|| {
            DatabaseError::TableFormat(format!("'{}' has no taxid column", path.display()))
        })?;
        let columns = [
            column("species"),
            column("genus"),
            column("family"),
            column("order"),
            column("name"),
            column("sciname"),
        ];

        let mut table = LocalTaxonomy::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            let Some(taxid) = record.get(taxid_col).and_then(parse_taxid) else {
                warn!("Skipping taxonomy row {} with unreadable taxid", i + 1);
                continue;
            };
            let value = |idx: Option<usize>| {
                idx.and_then(|idx| record.get(idx))
                    .filter(|field| !is_missing(field))
                    .map(|field| field.trim().to_string())
            };
            let [species, genus, family, order, name, sciname] = columns;
            table.insert(
                taxid,
                TaxonNames {
                    species: value(species),
                    genus: value(genus),
                    family: value(family),
                    order: value(order),
                    name: value(name),
                    sciname: value(sciname),
                },
            );
        }

        info!(
            "Loaded {} taxa from local taxonomy table {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Looks up the name of `taxid` at `rank`.
    ///
    /// Falls back to the generic `name` and then `sciname` columns when the
    /// rank column holds no usable value. Returns `None` when the taxid is
    /// unknown or no column is usable.
    pub fn lookup(&self, taxid: TaxId, rank: Rank) -> Option<String> {
        let names = self.entries.get(&taxid)?;
        usable(names.rank_name(rank))
            .or_else(|| usable(names.name.as_ref()))
            .or_else(|| usable(names.sciname.as_ref()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
