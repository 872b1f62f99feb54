//! Grid loading from NetCDF files
//!
//! Reads one gridded variable into a [`Grid`]. The last two dimensions of the
//! variable are taken as `(y, x)`; an optional leading dimension (usually time)
//! becomes the grid's layers. Coordinate variables named after the spatial
//! dimensions supply cell centres, and a CF time coordinate supplies layer names.

use crate::cf_time::{decode_cf_times, CfCalendar};
use crate::errors::{Result, ZonalError};
use crate::grid::{Grid, MissingValue};
use crate::metadata::{attribute_as_f64, attribute_as_str, grid_variable_metadata, GridMetadata};
use ndarray::Array3;
use netcdf::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load `variable_name` from the NetCDF file at `path` as a grid.
///
/// # Errors
///
/// Returns [`ZonalError::VariableNotFound`] if the variable does not exist,
/// [`ZonalError::InvalidGrid`] if it is not 2-D or 3-D or its coordinates are
/// irregular, and [`ZonalError::NetCDFError`] for read failures.
pub fn load_grid(path: impl AsRef<Path>, variable_name: &str) -> Result<Grid> {
    load_grid_with_diagnostics(path, variable_name, |_| {})
}

/// Load a grid, handing the variable's metadata to `on_metadata` first.
///
/// # Errors
///
/// Same as [`load_grid`].
pub fn load_grid_with_diagnostics<F>(
    path: impl AsRef<Path>,
    variable_name: &str,
    on_metadata: F,
) -> Result<Grid>
where
    F: FnOnce(&GridMetadata),
{
    let path = path.as_ref();
    let file = netcdf::open(path)?;
    info!(path = %path.display(), variable = variable_name, "opened NetCDF grid source");

    let metadata = grid_variable_metadata(&file, variable_name)?;
    on_metadata(&metadata);

    grid_from_file(&file, variable_name, &metadata)
}

fn grid_from_file(file: &File, variable_name: &str, metadata: &GridMetadata) -> Result<Grid> {
    let var = file
        .variable(variable_name)
        .ok_or_else(|| ZonalError::VariableNotFound {
            var: variable_name.to_string(),
        })?;

    let shape = metadata.shape();
    let (layers, rows, cols) = match shape.as_slice() {
        [rows, cols] => (1, *rows, *cols),
        [layers, rows, cols] => (*layers, *rows, *cols),
        other => {
            return Err(ZonalError::InvalidGrid {
                message: format!(
                    "variable '{variable_name}' has {} dimensions, expected (y, x) or (layer, y, x)",
                    other.len()
                ),
            })
        }
    };
    debug!(layers, rows, cols, "loading grid values");

    let mut values = var.get_values::<f64, _>(..)?;

    let scale = numeric_attribute(&var, "scale_factor")?;
    let offset = numeric_attribute(&var, "add_offset")?;
    let declared = MissingValue::with_sentinels(metadata.missing_values.iter().copied());
    let missing = if scale.is_some() || offset.is_some() {
        // Packed data: mask the raw sentinels before unpacking
        let (scale, offset) = (scale.unwrap_or(1.0), offset.unwrap_or(0.0));
        for v in &mut values {
            *v = if declared.is_missing(*v) {
                f64::NAN
            } else {
                *v * scale + offset
            };
        }
        MissingValue::nan_only()
    } else {
        declared
    };

    let data = Array3::from_shape_vec((layers, rows, cols), values)?;

    let dim_names: Vec<&str> = metadata.dimensions.iter().map(|d| d.name.as_str()).collect();
    let n = dim_names.len();
    let ys = coordinate_values(file, dim_names[n - 2], rows)?;
    let xs = coordinate_values(file, dim_names[n - 1], cols)?;

    let widths = (
        single_cell_width(file, dim_names[n - 1], cols)?,
        single_cell_width(file, dim_names[n - 2], rows)?,
    );
    let grid = Grid::from_coordinates_with_widths(&xs, &ys, widths, data, missing)?;

    let grid = if n == 3 {
        grid.with_layer_names(layer_names(file, dim_names[0], layers)?)?
    } else {
        grid.with_layer_names(vec![variable_name.to_string()])?
    };

    info!(
        variable = variable_name,
        layers = grid.layer_count(),
        rows = grid.rows(),
        cols = grid.cols(),
        "grid loaded"
    );
    Ok(grid)
}

fn numeric_attribute(var: &netcdf::Variable<'_>, name: &str) -> Result<Option<f64>> {
    match var.attribute(name) {
        Some(attr) => Ok(attribute_as_f64(&attr.value()?)),
        None => Ok(None),
    }
}

/// Values of the coordinate variable named `dim`, or the indices `0..len` if absent.
fn coordinate_values(file: &File, dim: &str, len: usize) -> Result<Vec<f64>> {
    match file.variable(dim) {
        Some(coord) => {
            let values = coord.get_values::<f64, _>(..)?;
            if values.len() != len {
                return Err(ZonalError::InvalidGrid {
                    message: format!(
                        "coordinate '{dim}' has {} values for a dimension of length {len}",
                        values.len()
                    ),
                });
            }
            Ok(values)
        }
        None => {
            debug!(dimension = dim, "no coordinate variable, using cell indices");
            Ok((0..len).map(|i| i as f64).collect())
        }
    }
}

/// Cell width along a length-1 axis from the CF `bounds` variable of its coordinate.
fn single_cell_width(file: &File, dim: &str, len: usize) -> Result<Option<f64>> {
    if len != 1 {
        return Ok(None);
    }
    let Some(bounds_name) = string_attribute(file, dim, "bounds")? else {
        return Ok(None);
    };
    let Some(bounds) = file.variable(&bounds_name) else {
        warn!(dimension = dim, bounds = %bounds_name, "bounds variable is missing");
        return Ok(None);
    };
    let edges = bounds.get_values::<f64, _>(..)?;
    match edges.as_slice() {
        [lo, hi] => Ok(Some((hi - lo).abs())),
        _ => Ok(None),
    }
}

fn string_attribute(file: &File, var: &str, name: &str) -> Result<Option<String>> {
    let Some(var) = file.variable(var) else {
        return Ok(None);
    };
    let Some(attr) = var.attribute(name) else {
        return Ok(None);
    };
    Ok(attribute_as_str(&attr.value()?).map(str::to_string))
}

/// Names for the layers along `dim`: decoded CF times, raw coordinate values, or indices.
fn layer_names(file: &File, dim: &str, len: usize) -> Result<Vec<String>> {
    let Some(coord) = file.variable(dim) else {
        return Ok((0..len).map(|i| format!("{dim}_{i}")).collect());
    };
    let values = coord.get_values::<f64, _>(..)?;
    let raw = || -> Vec<String> { values.iter().map(|v| format!("{v}")).collect() };

    let Some(units) = string_attribute(file, dim, "units")? else {
        return Ok(raw());
    };
    let calendar = match string_attribute(file, dim, "calendar")? {
        None => CfCalendar::default(),
        Some(name) => match name.parse::<CfCalendar>() {
            Ok(calendar) => calendar,
            Err(e) => {
                warn!(dimension = dim, "{e}; keeping raw coordinate values as layer names");
                return Ok(raw());
            }
        },
    };
    debug!(dimension = dim, units = %units, %calendar, "decoding layer times");

    Ok(decode_cf_times(&values, &units, calendar).unwrap_or_else(raw))
}
