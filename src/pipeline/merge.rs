//! Multi-sample merge: outer join, rename, re-aggregate, sort.

use crate::bio::Rank;
use crate::count_table::AbundanceTable;
use crate::database::{LocalTaxonomy, TaxonomyResolver};
use crate::pipeline::abundance::SampleAbundance;
use log::info;

/// Merges per-sample abundances into one table of display names.
///
/// Taxids missing from a sample are zero-filled, every taxid is resolved to
/// its name at `rank`, rows sharing a name are summed and the result is
/// sorted by total relative abundance (highest first, ties by name).
pub fn merge(
    samples: &[SampleAbundance],
    local: &LocalTaxonomy,
    resolver: &mut TaxonomyResolver,
    rank: Rank,
) -> AbundanceTable<String> {
    let joined = AbundanceTable::outer_join(samples);
    let mut named = joined.aggregate_by(|taxid| resolver.resolve(local, *taxid, rank));
    named.sort_by_abundance();

    info!(
        "Merged {} samples at {} level: {} taxids -> {} taxa ({} remote lookups so far)",
        samples.len(),
        rank,
        joined.dimensions().0,
        named.dimensions().0,
        resolver.remote_calls()
    );
    named
}
