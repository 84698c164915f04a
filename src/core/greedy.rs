//! Value-density greedy selection for the double knapsack.
//!
//! Items are ranked by `cost / (weight + size)` and committed in that order
//! until the first item that would push either total over its limit. The walk
//! stops there: later items are never considered, even ones that would fit.
//!
//! This is an approximation. Density over the summed consumption is not an
//! exchange argument for two independent constraints, so the result is
//! neither optimal nor optimal in either dimension alone.

use rayon::prelude::*;

use crate::core::parallel::WorkerPool;
use crate::domain::model::{CapacityLimits, Catalog, LoadedCatalog, SelectionResult};
use crate::utils::error::Result;

/// Returns catalog indices ordered by density, highest first.
///
/// The sort is stable, so items of equal density keep their catalog order.
/// Zero-consumption items have infinite density and come first.
pub fn rank_by_density(catalog: &Catalog) -> Vec<usize> {
    let densities: Vec<f64> = catalog.items.iter().map(|item| item.density()).collect();
    let mut order: Vec<usize> = (0..catalog.items.len()).collect();
    order.sort_by(|&left, &right| densities[right].total_cmp(&densities[left]));
    order
}

/// Greedy-with-hard-stop selection.
///
/// Fails with [`EvalError::Integrity`](crate::utils::error::EvalError::Integrity)
/// before doing any work if the catalog's declared count does not match its items.
pub fn select(catalog: &Catalog, limits: &CapacityLimits) -> Result<SelectionResult> {
    catalog.verify_integrity()?;

    let mut result = SelectionResult::default();

    for index in rank_by_density(catalog) {
        let item = &catalog.items[index];
        let tentative_weight = result.total_weight.saturating_add(item.weight);
        let tentative_size = result.total_size.saturating_add(item.size);

        if !limits.admits(tentative_weight, tentative_size) {
            tracing::debug!(
                "Stopping at item {} (weight {}, size {}): would reach {}/{} weight, {}/{} size",
                index,
                item.weight,
                item.size,
                tentative_weight,
                limits.max_weight,
                tentative_size,
                limits.max_size
            );
            break;
        }

        result.total_weight = tentative_weight;
        result.total_size = tentative_size;
        result.total_cost = result.total_cost.saturating_add(item.cost);
        result.selected.push(index);
    }

    Ok(result)
}

/// Runs [`select`] over independent catalogs in parallel. Results keep input order.
pub fn select_many(
    catalogs: &[LoadedCatalog],
    pool: &WorkerPool,
) -> Vec<Result<SelectionResult>> {
    pool.install(|| {
        catalogs
            .par_iter()
            .map(|loaded| select(&loaded.catalog, &loaded.limits))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Item;
    use crate::utils::error::EvalError;

    fn catalog(items: &[(u64, u64, u64)]) -> Catalog {
        Catalog::from_items(
            items
                .iter()
                .map(|&(weight, size, cost)| Item::new(weight, size, cost))
                .collect(),
        )
    }

    #[test]
    fn test_reference_scenario() {
        let catalog = catalog(&[(2, 1, 6), (1, 1, 2), (5, 5, 5)]);
        let result = select(&catalog, &CapacityLimits::new(3, 2)).unwrap();

        assert_eq!(result.total_cost, 8);
        assert_eq!(result.total_weight, 3);
        assert_eq!(result.total_size, 2);
        assert_eq!(result.selected, vec![0, 1]);
    }

    #[test]
    fn test_ranking_is_by_density_descending() {
        let catalog = catalog(&[(5, 5, 5), (1, 1, 2), (2, 1, 6)]);
        assert_eq!(rank_by_density(&catalog), vec![2, 1, 0]);
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let catalog = catalog(&[(4, 2, 9), (1, 3, 4), (2, 2, 8), (3, 1, 4), (1, 1, 2)]);
        let limits = CapacityLimits::new(7, 6);

        let first = select(&catalog, &limits).unwrap();
        for _ in 0..10 {
            assert_eq!(select(&catalog, &limits).unwrap(), first);
        }
    }

    #[test]
    fn test_stops_at_first_violation_without_skipping() {
        // densities 2.0, 1.5, 0.5; the second overflows weight, the third would still fit
        let catalog = catalog(&[(2, 1, 6), (3, 3, 9), (1, 1, 1)]);
        let limits = CapacityLimits::new(4, 4);

        let result = select(&catalog, &limits).unwrap();

        assert_eq!(result.selected, vec![0]);
        assert_eq!(result.total_cost, 6);
        assert_eq!(result.total_weight, 2);
        assert_eq!(result.total_size, 1);

        let heavy_first = catalog_with_heavy_leader();
        let result = select(&heavy_first, &CapacityLimits::new(5, 5)).unwrap();
        assert_eq!(result.total_cost, 0);
        assert!(result.selected.is_empty());
    }

    fn catalog_with_heavy_leader() -> Catalog {
        // the leader's density is 3.0 but it exceeds the weight limit on its own;
        // the trailing item (density 0.5) would fit but must not be considered
        catalog(&[(8, 2, 30), (1, 1, 1)])
    }

    #[test]
    fn test_result_never_exceeds_limits() {
        let catalog = catalog(&[(3, 3, 9), (2, 4, 6), (4, 1, 5), (1, 1, 1), (6, 6, 2)]);
        for max_weight in 0..12 {
            for max_size in 0..12 {
                let limits = CapacityLimits::new(max_weight, max_size);
                let result = select(&catalog, &limits).unwrap();
                assert!(result.total_weight <= max_weight);
                assert!(result.total_size <= max_size);

                let expected_cost: u64 = result
                    .selected
                    .iter()
                    .map(|&index| catalog.items[index].cost)
                    .sum();
                assert_eq!(result.total_cost, expected_cost);
            }
        }
    }

    #[test]
    fn test_integrity_mismatch_is_rejected() {
        let catalog = Catalog::new(vec![Item::new(1, 1, 1)], 2);
        let err = select(&catalog, &CapacityLimits::new(10, 10)).unwrap_err();
        assert!(matches!(
            err,
            EvalError::Integrity {
                declared: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_zero_consumption_items_rank_first_and_are_always_selected() {
        let catalog = catalog(&[(1, 1, 100), (0, 0, 3), (2, 2, 1), (0, 0, 0)]);

        assert_eq!(rank_by_density(&catalog)[..2], [1, 3]);

        let result = select(&catalog, &CapacityLimits::new(0, 0)).unwrap();
        assert_eq!(result.selected, vec![1, 3]);
        assert_eq!(result.total_cost, 3);
        assert_eq!(result.total_weight, 0);
        assert_eq!(result.total_size, 0);

        let result = select(&catalog, &CapacityLimits::new(2, 2)).unwrap();
        assert_eq!(result.selected, vec![1, 3, 0]);
        assert_eq!(result.total_cost, 103);
    }

    #[test]
    fn test_equal_density_keeps_catalog_order() {
        // all three have density 1.0
        let catalog = catalog(&[(1, 1, 2), (2, 2, 4), (3, 1, 4)]);
        assert_eq!(rank_by_density(&catalog), vec![0, 1, 2]);

        let result = select(&catalog, &CapacityLimits::new(3, 3)).unwrap();
        assert_eq!(result.selected, vec![0, 1]);
        assert_eq!(result.total_cost, 6);
    }

    #[test]
    fn test_empty_catalog() {
        let result = select(&Catalog::from_items(vec![]), &CapacityLimits::new(5, 5)).unwrap();
        assert_eq!(result, SelectionResult::default());
    }

    #[test]
    fn test_everything_fits() {
        let catalog = catalog(&[(1, 2, 3), (2, 1, 3)]);
        let result = select(&catalog, &CapacityLimits::new(100, 100)).unwrap();
        assert_eq!(result.total_cost, 6);
        assert_eq!(result.selected.len(), 2);
    }

    #[test]
    fn test_select_many_keeps_input_order() {
        let batch = vec![
            LoadedCatalog {
                catalog: catalog(&[(2, 1, 6), (1, 1, 2), (5, 5, 5)]),
                limits: CapacityLimits::new(3, 2),
            },
            LoadedCatalog {
                catalog: Catalog::new(vec![Item::new(1, 1, 1)], 4),
                limits: CapacityLimits::new(3, 2),
            },
            LoadedCatalog {
                catalog: catalog(&[(1, 1, 1)]),
                limits: CapacityLimits::new(3, 2),
            },
        ];

        let results = select_many(&batch, &WorkerPool::with_workers(2));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().total_cost, 8);
        assert!(matches!(results[1], Err(EvalError::Integrity { .. })));
        assert_eq!(results[2].as_ref().unwrap().total_cost, 1);
    }
}
