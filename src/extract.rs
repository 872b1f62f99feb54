//! Zonal extraction entry point
//!
//! [`extract`] ties the pipeline together: label validation, per-region
//! membership and aggregation in parallel, and ordered table assembly.

use crate::errors::{Result, ZonalError};
use crate::grid::Grid;
use crate::membership::MembershipPolicy;
use crate::region::RegionSet;
use crate::statistics::{parallel_zonal_aggregate, Aggregation};
use crate::table::{assemble, check_column_names, OutputTable};
use tracing::info;

/// Options controlling one extraction call
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Reduction applied to each region and layer
    pub aggregation: Aggregation,
    /// Drop missing cells before reducing (default `true`)
    pub remove_missing: bool,
    /// How cells are assigned to regions
    pub policy: MembershipPolicy,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            aggregation: Aggregation::default(),
            remove_missing: true,
            policy: MembershipPolicy::default(),
        }
    }
}

impl ExtractOptions {
    #[must_use]
    pub fn new(aggregation: Aggregation) -> Self {
        Self {
            aggregation,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_remove_missing(mut self, remove_missing: bool) -> Self {
        self.remove_missing = remove_missing;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: MembershipPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Check that the aggregation can consume the weights the policy produces.
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::IncompatibleAggregation`] for an unweighted
    /// aggregation under fractional membership.
    pub fn validate(&self) -> Result<()> {
        if self.policy.is_fractional() && !self.aggregation.is_weighted() {
            return Err(ZonalError::IncompatibleAggregation {
                message: "fractional membership requires a weighted aggregation".to_string(),
            });
        }
        Ok(())
    }
}

/// Compute zonal statistics of every grid layer for every region.
///
/// Fails before any geometry work if a region lacks `state_field` or
/// `district_field`. Regions that miss the grid, or whose cells are all
/// missing, still appear in the output with no-data markers.
///
/// # Errors
///
/// Returns [`ZonalError::RegionFieldMissing`], [`ZonalError::DuplicateColumn`],
/// [`ZonalError::IncompatibleAggregation`],
/// or any fatal error raised while processing a region. Nothing is returned on
/// failure.
pub fn extract(
    grid: &Grid,
    regions: &RegionSet,
    state_field: &str,
    district_field: &str,
    options: &ExtractOptions,
) -> Result<OutputTable> {
    regions.require_fields(&[state_field, district_field])?;
    check_column_names(state_field, district_field, grid.layer_names())?;
    options.validate()?;

    info!(
        regions = regions.len(),
        rows = grid.rows(),
        cols = grid.cols(),
        layers = grid.layer_count(),
        remove_missing = options.remove_missing,
        "starting zonal extraction"
    );

    let results = parallel_zonal_aggregate(
        grid,
        regions,
        &options.aggregation,
        options.remove_missing,
        options.policy,
    )?;

    let table = assemble(regions, state_field, district_field, grid.layer_names(), results)?;

    let empty = table
        .rows
        .iter()
        .filter(|row| row.values.iter().all(|v| v.is_no_data()))
        .count();
    info!(rows = table.len(), no_data_rows = empty, "zonal extraction finished");

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{MissingValue, RowOrientation};
    use crate::membership::BoundaryRule;
    use crate::region::Region;
    use crate::statistics::{StatOperation, ZonalValue};
    use ndarray::array;
    use std::collections::BTreeMap;

    fn grid() -> Grid {
        Grid::new(
            (0.0, 2.0),
            (1.0, 1.0),
            array![[[1.0, 2.0], [3.0, 4.0]]],
            RowOrientation::NorthUp,
            MissingValue::nan_only(),
        )
        .unwrap()
    }

    fn region(ring: Vec<(f64, f64)>, state: &str, district: &str) -> Region {
        let attrs = BTreeMap::from([
            ("state".to_string(), state.to_string()),
            ("district".to_string(), district.to_string()),
        ]);
        Region::from_rings(0, vec![ring], attrs).unwrap()
    }

    #[test]
    fn top_left_cell_under_centroid_policy() {
        let set = RegionSet::new(
            vec![region(vec![(0.0, 1.0), (1.0, 1.0), (1.0, 2.0), (0.0, 2.0)], "A", "X")],
            &[],
        )
        .unwrap();
        let table = extract(&grid(), &set, "state", "district", &ExtractOptions::default()).unwrap();
        assert_eq!(table.rows[0].values, vec![ZonalValue::Value(1.0)]);
    }

    #[test]
    fn half_cover_of_every_cell_under_fractional_policy() {
        // Diamond joining the midpoints of the extent's edges covers half of each cell
        let diamond = vec![(1.0, 0.0), (2.0, 1.0), (1.0, 2.0), (0.0, 1.0)];
        let set = RegionSet::new(vec![region(diamond, "A", "X")], &[]).unwrap();
        let options = ExtractOptions::new(StatOperation::Mean.weighted())
            .with_policy(MembershipPolicy::Fractional);
        let table = extract(&grid(), &set, "state", "district", &options).unwrap();
        match table.rows[0].values[0] {
            ZonalValue::Value(v) => assert!((v - 2.5).abs() < 1e-9),
            ZonalValue::NoData => panic!("expected a value"),
        }
    }

    #[test]
    fn unweighted_with_fractional_is_rejected() {
        let set = RegionSet::new(
            vec![region(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)], "A", "X")],
            &[],
        )
        .unwrap();
        let options = ExtractOptions::new(StatOperation::Mean.unweighted())
            .with_policy(MembershipPolicy::Fractional);
        assert!(matches!(
            extract(&grid(), &set, "state", "district", &options),
            Err(ZonalError::IncompatibleAggregation { .. })
        ));

        let binary = options.with_policy(MembershipPolicy::Centroid(BoundaryRule::Exclusive));
        assert!(extract(&grid(), &set, "state", "district", &binary).is_ok());
    }

    #[test]
    fn missing_label_field_fails_first() {
        let set = RegionSet::new(
            vec![region(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)], "A", "X")],
            &[],
        )
        .unwrap();
        let err = extract(&grid(), &set, "region", "district", &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ZonalError::RegionFieldMissing { ref field, .. } if field == "region"));
    }

    #[test]
    fn colliding_column_names_fail_before_aggregation() {
        let set = RegionSet::new(
            vec![region(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)], "A", "X")],
            &[],
        )
        .unwrap();
        let err = extract(&grid(), &set, "state", "state", &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ZonalError::DuplicateColumn { ref column } if column == "state"));

        let named = grid().with_layer_names(vec!["district".to_string()]).unwrap();
        let err = extract(&named, &set, "state", "district", &ExtractOptions::default()).unwrap_err();
        assert!(err.is_input_error());
        assert!(matches!(err, ZonalError::DuplicateColumn { ref column } if column == "district"));
    }
}
