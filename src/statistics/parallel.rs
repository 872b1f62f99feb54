//! Parallel per-region aggregation
//!
//! Each region is resolved and reduced independently against the shared,
//! read-only grid, so regions are spread across the Rayon pool with no locking.

use super::operations::Aggregation;
use super::zonal::{aggregate_region, ZonalResult};
use crate::errors::Result;
use crate::grid::Grid;
use crate::membership::{resolve, MembershipPolicy};
use crate::region::RegionSet;
use rayon::prelude::*;
use tracing::{debug, info};

/// Resolve and aggregate every region in parallel.
///
/// Results come back in region order. The first fatal error aborts the whole
/// computation and no partial results are returned.
///
/// # Errors
///
/// Returns the first error raised while resolving or aggregating any region.
pub fn parallel_zonal_aggregate(
    grid: &Grid,
    regions: &RegionSet,
    aggregation: &Aggregation,
    remove_missing: bool,
    policy: MembershipPolicy,
) -> Result<Vec<ZonalResult>> {
    info!(
        regions = regions.len(),
        layers = grid.layer_count(),
        threads = rayon::current_num_threads(),
        policy = policy.as_str(),
        "aggregating regions in parallel"
    );

    regions
        .regions()
        .par_iter()
        .map(|region| {
            let membership = resolve(region, grid, policy)?;
            let result = aggregate_region(grid, &membership, aggregation, remove_missing)?;
            debug!(
                region = region.id,
                cells = membership.len(),
                covered = membership.total_weight(),
                "aggregated region"
            );
            Ok(result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{MissingValue, RowOrientation};
    use crate::region::Region;
    use crate::statistics::{StatOperation, ZonalValue};
    use ndarray::Array3;
    use std::collections::BTreeMap;

    #[test]
    fn results_follow_region_order() {
        let layers = Array3::from_shape_fn((1, 8, 8), |(_, r, c)| (r * 8 + c) as f64);
        let grid = Grid::new(
            (0.0, 8.0),
            (1.0, 1.0),
            layers,
            RowOrientation::NorthUp,
            MissingValue::nan_only(),
        )
        .unwrap();

        let regions: Vec<Region> = (0..8)
            .map(|i| {
                let x = i as f64;
                Region::from_rings(
                    i,
                    vec![vec![(x, 0.0), (x + 1.0, 0.0), (x + 1.0, 8.0), (x, 8.0)]],
                    BTreeMap::new(),
                )
                .unwrap()
            })
            .collect();
        let set = RegionSet::new(regions, &[]).unwrap();

        let results = parallel_zonal_aggregate(
            &grid,
            &set,
            &StatOperation::Min.unweighted(),
            true,
            MembershipPolicy::default(),
        )
        .unwrap();

        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.region_id, i);
            assert_eq!(result.values, vec![ZonalValue::Value(i as f64)]);
        }
    }
}
