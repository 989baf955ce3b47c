use crate::listing::{Applied, Listing};
use crate::storage::traits::SeenMap;

/// Splits candidates into new listings and merges all of them into the seen mapping
///
/// A candidate is new when its id is absent from `loaded`; content changes of known
/// listings do not make them new. Every candidate's snapshot is written into the returned
/// mapping, so known listings get refreshed; a recorded auto-submit outcome survives the
/// refresh. A repeated id within `candidates` counts as new at most once.
///
/// # Arguments
///
/// * `loaded` - The mapping read from the store
/// * `candidates` - Listings gathered by the crawl, in encounter order
///
/// # Returns
///
/// The new listings in encounter order, and the merged mapping
pub fn reconcile(mut loaded: SeenMap, candidates: &[Listing]) -> (Vec<Listing>, SeenMap) {
    let mut new_listings = Vec::new();

    for candidate in candidates {
        let mut snapshot = candidate.clone();
        match loaded.get(&candidate.id) {
            Some(previous) => {
                if snapshot.applied == Applied::NotAttempted {
                    snapshot.applied = previous.applied;
                }
            }
            None => new_listings.push(candidate.clone()),
        }
        loaded.insert(candidate.id, snapshot);
    }

    (new_listings, loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: u64, price: &str) -> Listing {
        let mut listing = Listing::new(id, "test");
        listing.price = price.to_string();
        listing
    }

    #[test]
    fn test_only_unknown_ids_are_new() {
        let loaded: SeenMap = [(1, listing(1, "a")), (2, listing(2, "b"))].into_iter().collect();
        let candidates = vec![listing(1, "a"), listing(2, "b"), listing(3, "c")];

        let (new, merged) = reconcile(loaded, &candidates);

        assert_eq!(new.iter().map(|l| l.id).collect::<Vec<_>>(), vec![3]);
        assert_eq!(merged.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_known_snapshots_are_refreshed_but_not_new() {
        let loaded: SeenMap = [(1, listing(1, "700 €"))].into_iter().collect();
        let (new, merged) = reconcile(loaded, &[listing(1, "650 €")]);

        assert!(new.is_empty());
        assert_eq!(merged[&1].price, "650 €");
    }

    #[test]
    fn test_applied_outcome_survives_refresh() {
        let mut applied = listing(4, "900 €");
        applied.applied = Applied::Yes;
        let loaded: SeenMap = [(4, applied)].into_iter().collect();

        let (_, merged) = reconcile(loaded, &[listing(4, "880 €")]);
        assert_eq!(merged[&4].applied, Applied::Yes);
        assert_eq!(merged[&4].price, "880 €");
    }

    #[test]
    fn test_empty_store_everything_new_in_order() {
        let candidates = vec![listing(103, ""), listing(101, ""), listing(102, "")];
        let (new, merged) = reconcile(SeenMap::new(), &candidates);

        assert_eq!(
            new.iter().map(|l| l.id).collect::<Vec<_>>(),
            vec![103, 101, 102]
        );
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_duplicate_candidates_new_once() {
        let (new, merged) = reconcile(SeenMap::new(), &[listing(5, "a"), listing(5, "b")]);
        assert_eq!(new.len(), 1);
        assert_eq!(merged[&5].price, "b");
    }

    #[test]
    fn test_reconcile_twice_is_idempotent() {
        let candidates = vec![listing(1, ""), listing(2, "")];
        let (_, merged) = reconcile(SeenMap::new(), &candidates);
        let (new, _) = reconcile(merged, &candidates);
        assert!(new.is_empty());
    }
}
