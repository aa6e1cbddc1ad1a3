//! Taxid to display-name resolution.
//!
//! Resolution walks a fixed chain and always produces a non-empty name:
//!
//! 1. missing taxid: `unclassified`
//! 2. local table, rank column, then `name`, then `sciname`
//! 3. remote taxonomy service (rank field, then `taxon_name`)
//! 4. the taxid itself, as a decimal string
//!
//! Remote answers are cached per `(taxid, rank)` for the lifetime of the
//! resolver; the cache never changes which name is returned.

use super::local::LocalTaxonomy;
use super::remote::TaxonomyService;
use crate::bio::{Rank, TaxId, UNCLASSIFIED};
use log::{debug, warn};
use std::collections::HashMap;

pub struct TaxonomyResolver {
    remote: Option<Box<dyn TaxonomyService>>,
    cache: Option<HashMap<(TaxId, Rank), Option<String>>>,
    remote_calls: usize,
}

impl TaxonomyResolver {
    /// Resolver that only consults the local table.
    pub fn local_only() -> Self {
        TaxonomyResolver {
            remote: None,
            cache: None,
            remote_calls: 0,
        }
    }

    /// Resolver with a remote fallback; `cache` enables per-run memoisation.
    pub fn with_remote(remote: Box<dyn TaxonomyService>, cache: bool) -> Self {
        TaxonomyResolver {
            remote: Some(remote),
            cache: cache.then(HashMap::new),
            remote_calls: 0,
        }
    }

    /// Number of requests issued to the remote service so far.
    pub fn remote_calls(&self) -> usize {
        self.remote_calls
    }

    /// Resolves `taxid` to its name at `rank`. Never fails.
    pub fn resolve(&mut self, local: &LocalTaxonomy, taxid: Option<TaxId>, rank: Rank) -> String {
        let Some(taxid) = taxid else {
            return UNCLASSIFIED.to_string();
        };

        if let Some(name) = local.lookup(taxid, rank) {
            debug!("taxid {} ({}) resolved locally: {}", taxid, rank, name);
            return name;
        }

        if let Some(name) = self.resolve_remote(taxid, rank) {
            return name;
        }

        debug!("taxid {} ({}) unresolved, using the id", taxid, rank);
        taxid.to_string()
    }

    fn resolve_remote(&mut self, taxid: TaxId, rank: Rank) -> Option<String> {
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&(taxid, rank))) {
            return hit.clone();
        }

        let remote = self.remote.as_ref()?;
        self.remote_calls += 1;
        let name = match remote.taxon_name(Some(taxid), rank) {
            Ok(name) if !name.trim().is_empty() => {
                debug!("taxid {} ({}) resolved remotely: {}", taxid, rank, name);
                Some(name)
            }
            Ok(_) => {
                warn!("Taxonomy service returned an empty name for taxid {} ({})", taxid, rank);
                None
            }
            Err(e) => {
                warn!("Taxonomy lookup failed for taxid {} ({}): {}", taxid, rank, e);
                None
            }
        };

        if let Some(cache) = self.cache.as_mut() {
            cache.insert((taxid, rank), name.clone());
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::local::TaxonNames;
    use crate::database::DatabaseError;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Canned service answering from a fixed map and counting requests.
    struct StubService {
        names: HashMap<TaxId, String>,
        calls: Rc<Cell<usize>>,
    }

    impl TaxonomyService for StubService {
        fn taxon_name(&self, taxid: Option<TaxId>, _rank: Rank) -> Result<String, DatabaseError> {
            self.calls.set(self.calls.get() + 1);
            taxid
                .and_then(|id| self.names.get(&id).cloned())
                .ok_or_else(|| DatabaseError::ApiError("no such taxon".to_string()))
        }
    }

    fn stub(names: &[(TaxId, &str)]) -> (Box<dyn TaxonomyService>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let service: Box<dyn TaxonomyService> = Box::new(StubService {
            names: names.iter().map(|&(id, n)| (id, n.to_string())).collect(),
            calls: Rc::clone(&calls),
        });
        (service, calls)
    }

    fn local() -> LocalTaxonomy {
        let mut table = LocalTaxonomy::new();
        table.insert(
            9606,
            TaxonNames {
                species: Some("Homo sapiens".to_string()),
                ..Default::default()
            },
        );
        table.insert(
            42,
            TaxonNames {
                sciname: Some("only sciname".to_string()),
                ..Default::default()
            },
        );
        table.insert(7, TaxonNames::default());
        table
    }

    #[test]
    fn test_missing_taxid_is_unclassified() {
        let (service, calls) = stub(&[]);
        let mut resolver = TaxonomyResolver::with_remote(service, true);
        assert_eq!(resolver.resolve(&local(), None, Rank::Species), "unclassified");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_local_tiers_before_remote() {
        let (service, calls) = stub(&[(9606, "remote human")]);
        let mut resolver = TaxonomyResolver::with_remote(service, false);
        let table = local();
        assert_eq!(resolver.resolve(&table, Some(9606), Rank::Species), "Homo sapiens");
        assert_eq!(resolver.resolve(&table, Some(42), Rank::Genus), "only sciname");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_remote_used_for_unknown_or_unusable_local_entries() {
        let (service, _) = stub(&[(562, "Escherichia"), (7, "Azorhizobium")]);
        let mut resolver = TaxonomyResolver::with_remote(service, false);
        let table = local();
        assert_eq!(resolver.resolve(&table, Some(562), Rank::Genus), "Escherichia");
        assert_eq!(resolver.resolve(&table, Some(7), Rank::Genus), "Azorhizobium");
        // class names are never stored locally
        assert_eq!(resolver.resolve(&table, Some(9606), Rank::Class), "9606");
    }

    #[test]
    fn test_remote_failure_falls_back_to_taxid() {
        let (service, _) = stub(&[]);
        let mut resolver = TaxonomyResolver::with_remote(service, false);
        assert_eq!(resolver.resolve(&local(), Some(123456), Rank::Order), "123456");

        let mut offline = TaxonomyResolver::local_only();
        assert_eq!(offline.resolve(&local(), Some(562), Rank::Order), "562");
        assert_eq!(offline.remote_calls(), 0);
    }

    #[test]
    fn test_cache_avoids_repeat_requests() {
        let (service, calls) = stub(&[(562, "Escherichia")]);
        let mut resolver = TaxonomyResolver::with_remote(service, true);
        let table = LocalTaxonomy::new();
        for _ in 0..3 {
            assert_eq!(resolver.resolve(&table, Some(562), Rank::Genus), "Escherichia");
            assert_eq!(resolver.resolve(&table, Some(999), Rank::Genus), "999");
        }
        assert_eq!(calls.get(), 2);
        assert_eq!(resolver.remote_calls(), 2);

        // a different rank is a different key
        resolver.resolve(&table, Some(562), Rank::Family);
        assert_eq!(calls.get(), 3);
    }
}
