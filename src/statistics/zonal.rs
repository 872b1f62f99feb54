//! Per-region reduction of grid layers
//!
//! Reduces the cells of one [`CellMembership`] against every layer of a
//! [`Grid`]. An empty reduction input is reported as [`ZonalValue::NoData`],
//! never as zero.

use super::operations::Aggregation;
use crate::errors::Result;
use crate::grid::Grid;
use crate::membership::CellMembership;
use std::fmt;

/// Aggregate of one layer for one region
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZonalValue {
    /// Result of the aggregation. May be NaN when the aggregation itself
    /// propagated a missing input.
    Value(f64),
    /// No valid cell contributed to this layer
    NoData,
}

impl ZonalValue {
    #[must_use]
    pub const fn is_no_data(self) -> bool {
        matches!(self, Self::NoData)
    }

    /// The numeric value; `None` for no data and for NaN results
    #[must_use]
    pub fn as_option(self) -> Option<f64> {
        match self {
            Self::Value(v) if !v.is_nan() => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ZonalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::NoData => f.write_str("NA"),
        }
    }
}

/// Aggregates of every layer, in layer order, for one region
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalResult {
    pub region_id: usize,
    pub values: Vec<ZonalValue>,
}

impl ZonalResult {
    /// A result made only of no-data markers
    #[must_use]
    pub fn no_data(region_id: usize, layers: usize) -> Self {
        Self {
            region_id,
            values: vec![ZonalValue::NoData; layers],
        }
    }
}

/// Reduce `membership` against every layer of `grid`.
///
/// With `remove_missing`, missing cells are dropped before reduction. Without
/// it they reach the aggregation as NaN and the aggregation decides the result.
///
/// # Errors
///
/// Returns [`crate::ZonalError::OutOfBounds`] if the membership references a cell
/// outside the grid.
pub fn aggregate_region(
    grid: &Grid,
    membership: &CellMembership,
    aggregation: &Aggregation,
    remove_missing: bool,
) -> Result<ZonalResult> {
    if membership.is_empty() {
        return Ok(ZonalResult::no_data(membership.region_id, grid.layer_count()));
    }

    let mut values = Vec::with_capacity(membership.len());
    let mut weights = Vec::with_capacity(membership.len());
    let mut result = Vec::with_capacity(grid.layer_count());

    for layer in 0..grid.layer_count() {
        values.clear();
        weights.clear();

        for cell in &membership.cells {
            match grid.value_at(layer, cell.row, cell.col)? {
                Some(value) => values.push(value),
                None if remove_missing => continue,
                None => values.push(f64::NAN),
            }
            weights.push(cell.weight);
        }

        result.push(if values.is_empty() {
            ZonalValue::NoData
        } else {
            ZonalValue::Value(aggregation.apply(&values, &weights))
        });
    }

    Ok(ZonalResult {
        region_id: membership.region_id,
        values: result,
    })
}
