//! Cell membership resolution
//!
//! Determines which grid cells belong to a region and with what coverage weight.
//! Resolution runs in two phases: a bounding-box broad phase over the grid's
//! row/column index, then an exact per-cell test against the polygon.

use crate::errors::Result;
use crate::grid::Grid;
use crate::region::Region;
use geo::algorithm::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Area, BooleanOps, BoundingRect, Intersects};
use tracing::trace;

/// Coverage fractions below this are treated as numerical slivers and dropped.
const SLIVER_FRACTION: f64 = 1e-12;

/// How a cell centre lying exactly on a polygon edge is classified
///
/// Neither rule partitions the grid among regions that share edges: a centre on
/// a shared edge is counted by both neighbours under `Inclusive` and by neither
/// under `Exclusive`. Use [`MembershipPolicy::Fractional`] when per-region totals
/// must add up to the grid's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryRule {
    /// Centres on the boundary count as inside, for every region touching them
    #[default]
    Inclusive,
    /// Only centres strictly inside the polygon count; shared-edge centres belong to no region
    Exclusive,
}

/// Strategy used to decide membership and weight of each candidate cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipPolicy {
    /// Binary weight: a cell belongs (weight 1) when its centre is inside
    Centroid(BoundaryRule),
    /// Weight is the fraction of the cell's area covered by the polygon
    Fractional,
}

impl Default for MembershipPolicy {
    fn default() -> Self {
        Self::Centroid(BoundaryRule::default())
    }
}

impl MembershipPolicy {
    #[must_use]
    pub const fn is_fractional(self) -> bool {
        matches!(self, Self::Fractional)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Centroid(BoundaryRule::Inclusive) => "centroid (boundary inclusive)",
            Self::Centroid(BoundaryRule::Exclusive) => "centroid (boundary exclusive)",
            Self::Fractional => "fractional area",
        }
    }
}

/// One covered cell and its coverage weight in `(0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellWeight {
    pub row: usize,
    pub col: usize,
    pub weight: f64,
}

/// Cells covered by one region, in row-major order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellMembership {
    pub region_id: usize,
    pub cells: Vec<CellWeight>,
}

impl CellMembership {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Sum of weights: the covered area measured in cells
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.cells.iter().map(|c| c.weight).sum()
    }
}

/// Resolve the cells of `grid` covered by `region` under `policy`.
///
/// A region disjoint from the grid extent yields an empty membership, not an error.
///
/// # Errors
///
/// Returns [`crate::ZonalError::OutOfBounds`] only if the broad phase produced an
/// index outside the grid, which indicates a defect.
pub fn resolve(region: &Region, grid: &Grid, policy: MembershipPolicy) -> Result<CellMembership> {
    let mut membership = CellMembership {
        region_id: region.id,
        cells: Vec::new(),
    };

    let Some(bbox) = region.geometry.bounding_rect() else {
        return Ok(membership);
    };
    let Some((rows, cols)) = grid.rows_cols_covering_rect(&bbox) else {
        trace!(region = region.id, "region lies outside the grid extent");
        return Ok(membership);
    };

    let cell_area = grid.cell_area();
    for row in rows {
        for col in cols.clone() {
            let cell = grid.cell_at(row, col)?;
            let weight = match policy {
                MembershipPolicy::Centroid(rule) => {
                    let inside = match region.geometry.coordinate_position(&cell.center()) {
                        CoordPos::Inside => true,
                        CoordPos::OnBoundary => rule == BoundaryRule::Inclusive,
                        CoordPos::Outside => false,
                    };
                    if inside {
                        1.0
                    } else {
                        0.0
                    }
                }
                MembershipPolicy::Fractional => {
                    if !region.geometry.intersects(&cell) {
                        continue;
                    }
                    let overlap = region.geometry.intersection(&cell.to_polygon());
                    (overlap.unsigned_area() / cell_area).min(1.0)
                }
            };

            if weight > SLIVER_FRACTION {
                membership.cells.push(CellWeight { row, col, weight });
            }
        }
    }

    trace!(
        region = region.id,
        cells = membership.len(),
        "resolved cell membership"
    );
    Ok(membership)
}
