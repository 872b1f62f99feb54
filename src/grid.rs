//! In-memory gridded field and its spatial indexing
//!
//! A [`Grid`] is a regular rectangular lattice of cells carrying one or more
//! layers (bands or time steps) of `f64` values. It is built once by a loader and
//! never mutated afterwards, so it can be shared freely between worker threads.

use crate::errors::{Result, ZonalError};
use geo::{coord, Coord, Rect};
use ndarray::{Array3, ArrayView2, Axis};
use std::ops::Range;

/// Relative tolerance used when checking that coordinate spacing is regular.
const SPACING_TOLERANCE: f64 = 1e-6;

/// Direction in which row indices advance in spatial coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowOrientation {
    /// Row 0 is the top (maximum y) edge; y decreases as the row index grows.
    #[default]
    NorthUp,
    /// Row 0 is the bottom (minimum y) edge; y increases with the row index.
    SouthUp,
}

/// Missing-value convention of a grid
///
/// NaN is always treated as missing. Every declared sentinel (NetCDF allows both
/// `_FillValue` and one or more `missing_value`s) is missing too.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MissingValue {
    pub sentinels: Vec<f64>,
}

impl MissingValue {
    /// Only NaN marks missing data
    #[must_use]
    pub const fn nan_only() -> Self {
        Self {
            sentinels: Vec::new(),
        }
    }

    /// NaN and `sentinel` both mark missing data
    #[must_use]
    pub fn with_sentinel(sentinel: f64) -> Self {
        Self::with_sentinels([sentinel])
    }

    /// NaN and each of `sentinels` mark missing data. NaN and duplicate entries are dropped.
    #[must_use]
    pub fn with_sentinels(sentinels: impl IntoIterator<Item = f64>) -> Self {
        let mut kept: Vec<f64> = Vec::new();
        for s in sentinels {
            if !s.is_nan() && !kept.contains(&s) {
                kept.push(s);
            }
        }
        Self { sentinels: kept }
    }

    #[must_use]
    pub fn is_missing(&self, value: f64) -> bool {
        value.is_nan() || self.sentinels.contains(&value)
    }
}

/// Immutable regular grid holding one or more layers
#[derive(Debug, Clone)]
pub struct Grid {
    origin: Coord<f64>,
    cell_size: (f64, f64),
    orientation: RowOrientation,
    missing: MissingValue,
    /// Values indexed as `(layer, row, col)`
    layers: Array3<f64>,
    layer_names: Vec<String>,
}

impl Grid {
    /// Create a grid from its geometry and a `(layer, row, col)` value cube.
    ///
    /// `origin` is the outer corner of cell (0, 0): its left edge x and its top
    /// (`NorthUp`) or bottom (`SouthUp`) edge y.
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::InvalidGrid`] if the cell size is not strictly positive
    /// and finite, or if there are no layers, rows or columns.
    pub fn new(
        origin: (f64, f64),
        cell_size: (f64, f64),
        layers: Array3<f64>,
        orientation: RowOrientation,
        missing: MissingValue,
    ) -> Result<Self> {
        let (dx, dy) = cell_size;
        if !(dx.is_finite() && dy.is_finite() && dx > 0.0 && dy > 0.0) {
            return Err(ZonalError::InvalidGrid {
                message: format!("cell size must be strictly positive, got ({dx}, {dy})"),
            });
        }
        if !(origin.0.is_finite() && origin.1.is_finite()) {
            return Err(ZonalError::InvalidGrid {
                message: format!("origin must be finite, got ({}, {})", origin.0, origin.1),
            });
        }
        let (n_layers, rows, cols) = layers.dim();
        if n_layers == 0 || rows == 0 || cols == 0 {
            return Err(ZonalError::InvalidGrid {
                message: format!(
                    "grid needs at least one layer, row and column, got {n_layers}x{rows}x{cols}"
                ),
            });
        }

        let layer_names = (0..n_layers).map(|i| format!("layer_{i}")).collect();

        Ok(Self {
            origin: coord! { x: origin.0, y: origin.1 },
            cell_size,
            orientation,
            missing,
            layers,
            layer_names,
        })
    }

    /// Build a grid from cell-centre coordinate vectors.
    ///
    /// `xs` must be ascending and regularly spaced. `ys` may run either way; a
    /// descending axis yields a [`RowOrientation::NorthUp`] grid. An axis with a
    /// single coordinate borrows the other axis's spacing (square cells).
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::InvalidGrid`] if the coordinate vectors do not match
    /// the layer shape, are irregular, or both have a single entry.
    pub fn from_coordinates(
        xs: &[f64],
        ys: &[f64],
        layers: Array3<f64>,
        missing: MissingValue,
    ) -> Result<Self> {
        Self::from_coordinates_with_widths(xs, ys, (None, None), layers, missing)
    }

    /// Like [`Grid::from_coordinates`], with known cell widths `(dx, dy)` for axes
    /// that have a single coordinate (e.g. from CF `bounds` variables).
    ///
    /// Widths are ignored for axes with two or more coordinates, whose spacing
    /// always comes from the coordinates. A single-row grid is `NorthUp`.
    ///
    /// # Errors
    ///
    /// Same as [`Grid::from_coordinates`]; a single-coordinate axis fails only when
    /// neither a width nor the other axis's spacing is available.
    pub fn from_coordinates_with_widths(
        xs: &[f64],
        ys: &[f64],
        widths: (Option<f64>, Option<f64>),
        layers: Array3<f64>,
        missing: MissingValue,
    ) -> Result<Self> {
        let (_, rows, cols) = layers.dim();
        if xs.len() != cols || ys.len() != rows || xs.is_empty() || ys.is_empty() {
            return Err(ZonalError::InvalidGrid {
                message: format!(
                    "coordinate lengths ({} x, {} y) do not match grid shape ({rows} rows, {cols} cols)",
                    xs.len(),
                    ys.len()
                ),
            });
        }

        let x_step = (xs.len() > 1).then(|| regular_spacing(xs, "x")).transpose()?;
        let y_step = (ys.len() > 1).then(|| regular_spacing(ys, "y")).transpose()?;

        let dx = match x_step {
            Some(step) if step <= 0.0 => {
                return Err(ZonalError::InvalidGrid {
                    message: "x coordinates must be ascending".to_string(),
                })
            }
            Some(step) => step,
            None => single_cell_width(widths.0, y_step, "x")?,
        };
        let dy = match y_step {
            Some(step) => step,
            None => -single_cell_width(widths.1, x_step, "y")?,
        };

        let orientation = if dy < 0.0 {
            RowOrientation::NorthUp
        } else {
            RowOrientation::SouthUp
        };

        // ys[0] is the centre of row 0, half a step inside the outer edge
        Self::new(
            (xs[0] - dx / 2.0, ys[0] - dy / 2.0),
            (dx, dy.abs()),
            layers,
            orientation,
            missing,
        )
    }

    /// Replace the default `layer_<i>` names, e.g. with time stamps.
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::InvalidGrid`] if the number of names differs from the
    /// number of layers.
    pub fn with_layer_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() != self.layer_count() {
            return Err(ZonalError::InvalidGrid {
                message: format!(
                    "{} layer names given for {} layers",
                    names.len(),
                    self.layer_count()
                ),
            });
        }
        self.layer_names = names;
        Ok(self)
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.layers.dim().1
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.layers.dim().2
    }

    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.dim().0
    }

    #[must_use]
    pub fn layer_names(&self) -> &[String] {
        &self.layer_names
    }

    #[must_use]
    pub const fn cell_size(&self) -> (f64, f64) {
        self.cell_size
    }

    #[must_use]
    pub const fn orientation(&self) -> RowOrientation {
        self.orientation
    }

    #[must_use]
    pub const fn missing(&self) -> &MissingValue {
        &self.missing
    }

    #[must_use]
    pub fn cell_area(&self) -> f64 {
        self.cell_size.0 * self.cell_size.1
    }

    /// View of one layer as a `(row, col)` array
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::OutOfBounds`] if `layer` does not exist.
    pub fn layer(&self, layer: usize) -> Result<ArrayView2<'_, f64>> {
        if layer >= self.layer_count() {
            return Err(self.out_of_bounds(layer, 0, 0));
        }
        Ok(self.layers.index_axis(Axis(0), layer))
    }

    /// Full spatial extent of the grid
    #[must_use]
    pub fn extent(&self) -> Rect<f64> {
        let width = self.cell_size.0 * self.cols() as f64;
        let height = self.cell_size.1 * self.rows() as f64;
        let far_y = match self.orientation {
            RowOrientation::NorthUp => self.origin.y - height,
            RowOrientation::SouthUp => self.origin.y + height,
        };
        Rect::new(
            self.origin,
            coord! { x: self.origin.x + width, y: far_y },
        )
    }

    /// Bounding rectangle of cell `(row, col)`
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::OutOfBounds`] if the cell is outside the grid.
    pub fn cell_at(&self, row: usize, col: usize) -> Result<Rect<f64>> {
        self.check_cell(0, row, col)?;
        Ok(self.cell_rect_unchecked(row, col))
    }

    /// Centre point of cell `(row, col)`
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::OutOfBounds`] if the cell is outside the grid.
    pub fn cell_center(&self, row: usize, col: usize) -> Result<Coord<f64>> {
        Ok(self.cell_at(row, col)?.center())
    }

    /// Value of a cell in one layer, `None` when the cell is missing
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::OutOfBounds`] if any index exceeds the grid dimensions.
    pub fn value_at(&self, layer: usize, row: usize, col: usize) -> Result<Option<f64>> {
        let value = *self
            .layers
            .get((layer, row, col))
            .ok_or_else(|| self.out_of_bounds(layer, row, col))?;
        Ok((!self.missing.is_missing(value)).then_some(value))
    }

    /// Row and column ranges of the cells whose rectangles intersect `rect`.
    ///
    /// Returns `None` when `rect` lies entirely outside the grid extent. The ranges
    /// are a conservative broad phase: they may include cells that only touch the
    /// rectangle along an edge.
    #[must_use]
    pub fn rows_cols_covering_rect(&self, rect: &Rect<f64>) -> Option<(Range<usize>, Range<usize>)> {
        let extent = self.extent();
        if rect.max().x < extent.min().x
            || rect.min().x > extent.max().x
            || rect.max().y < extent.min().y
            || rect.min().y > extent.max().y
        {
            return None;
        }

        let (dx, dy) = self.cell_size;
        let cols = clamp_range(
            (rect.min().x - self.origin.x) / dx,
            (rect.max().x - self.origin.x) / dx,
            self.cols(),
        );
        let rows = match self.orientation {
            RowOrientation::NorthUp => clamp_range(
                (self.origin.y - rect.max().y) / dy,
                (self.origin.y - rect.min().y) / dy,
                self.rows(),
            ),
            RowOrientation::SouthUp => clamp_range(
                (rect.min().y - self.origin.y) / dy,
                (rect.max().y - self.origin.y) / dy,
                self.rows(),
            ),
        };

        if rows.is_empty() || cols.is_empty() {
            None
        } else {
            Some((rows, cols))
        }
    }

    pub(crate) fn cell_rect_unchecked(&self, row: usize, col: usize) -> Rect<f64> {
        let (dx, dy) = self.cell_size;
        let x0 = self.origin.x + dx * col as f64;
        let (y0, y1) = match self.orientation {
            RowOrientation::NorthUp => {
                let top = self.origin.y - dy * row as f64;
                (top - dy, top)
            }
            RowOrientation::SouthUp => {
                let bottom = self.origin.y + dy * row as f64;
                (bottom, bottom + dy)
            }
        };
        Rect::new(coord! { x: x0, y: y0 }, coord! { x: x0 + dx, y: y1 })
    }

    fn check_cell(&self, layer: usize, row: usize, col: usize) -> Result<()> {
        if layer >= self.layer_count() || row >= self.rows() || col >= self.cols() {
            return Err(self.out_of_bounds(layer, row, col));
        }
        Ok(())
    }

    fn out_of_bounds(&self, layer: usize, row: usize, col: usize) -> ZonalError {
        let (layers, rows, cols) = self.layers.dim();
        ZonalError::OutOfBounds {
            layer,
            row,
            col,
            layers,
            rows,
            cols,
        }
    }
}

/// Map fractional cell positions `[lo, hi]` onto a clamped index range.
fn clamp_range(lo: f64, hi: f64, len: usize) -> Range<usize> {
    let start = lo.floor().max(0.0);
    let end = hi.ceil().min(len as f64);
    if end <= start {
        return 0..0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        (start as usize)..(end as usize)
    }
}

/// Width of the cells along an axis with a single coordinate.
fn single_cell_width(known: Option<f64>, other_step: Option<f64>, axis: &str) -> Result<f64> {
    known
        .map(f64::abs)
        .or_else(|| other_step.map(f64::abs))
        .filter(|w| w.is_finite() && *w > 0.0)
        .ok_or_else(|| ZonalError::InvalidGrid {
            message: format!(
                "{axis} axis has a single coordinate and no cell width to fall back on"
            ),
        })
}

/// Step between consecutive coordinates, checked for regularity.
fn regular_spacing(coords: &[f64], axis: &str) -> Result<f64> {
    if coords.len() < 2 {
        return Err(ZonalError::InvalidGrid {
            message: format!("{axis} axis needs at least two coordinates to infer cell size"),
        });
    }
    let step = coords[1] - coords[0];
    if step == 0.0 || !step.is_finite() {
        return Err(ZonalError::InvalidGrid {
            message: format!("{axis} coordinates must be strictly monotonic"),
        });
    }
    for pair in coords.windows(2) {
        let delta = pair[1] - pair[0];
        if (delta - step).abs() > SPACING_TOLERANCE * step.abs() {
            return Err(ZonalError::InvalidGrid {
                message: format!(
                    "{axis} coordinates are irregularly spaced ({delta} vs {step})"
                ),
            });
        }
    }
    Ok(step)
}
