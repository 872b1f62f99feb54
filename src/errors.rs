//! Centralized error handling for zonal_stats
//!
//! Every fallible operation in the crate returns [`ZonalError`]. Fatal errors carry
//! enough context (field name, variable name, region id, indices) to diagnose the
//! failing input. Non-fatal outcomes such as a region that misses the grid are
//! encoded in the result data and never appear here.

use std::fmt;

/// Main error type for zonal_stats operations
#[derive(Debug)]
pub enum ZonalError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// Shapefile / dBase read errors
    ShapefileError(shapefile::Error),

    /// Table construction or CSV export errors
    TableError(polars::prelude::PolarsError),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Requested grid variable does not exist in the source
    VariableNotFound { var: String },

    /// A required attribute field is absent from a region
    RegionFieldMissing { field: String, region_id: usize },

    /// Grid index outside of the grid dimensions
    OutOfBounds {
        layer: usize,
        row: usize,
        col: usize,
        layers: usize,
        rows: usize,
        cols: usize,
    },

    /// Grid definition is unusable (non-positive cell size, empty dimensions, irregular axis)
    InvalidGrid { message: String },

    /// Region geometry could not be built
    InvalidGeometry { region_id: usize, message: String },

    /// Two output columns (label fields or layer names) share a name
    DuplicateColumn { column: String },

    /// Aggregation strategy cannot be combined with the membership policy
    IncompatibleAggregation { message: String },

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Generic error
    Generic(String),
}

impl fmt::Display for ZonalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZonalError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            ZonalError::ShapefileError(e) => write!(f, "Shapefile error: {}", e),
            ZonalError::TableError(e) => write!(f, "Table error: {}", e),
            ZonalError::IoError(e) => write!(f, "I/O error: {}", e),
            ZonalError::VariableNotFound { var } => write!(f, "Variable '{}' not found in file", var),
            ZonalError::RegionFieldMissing { field, region_id } => {
                write!(f, "Field '{}' missing from attributes of region {}", field, region_id)
            }
            ZonalError::OutOfBounds {
                layer,
                row,
                col,
                layers,
                rows,
                cols,
            } => write!(
                f,
                "Index (layer {}, row {}, col {}) out of bounds for grid of {} layers x {} rows x {} cols",
                layer, row, col, layers, rows, cols
            ),
            ZonalError::InvalidGrid { message } => write!(f, "Invalid grid: {}", message),
            ZonalError::InvalidGeometry { region_id, message } => {
                write!(f, "Invalid geometry for region {}: {}", region_id, message)
            }
            ZonalError::DuplicateColumn { column } => {
                write!(f, "Output column '{}' appears more than once", column)
            }
            ZonalError::IncompatibleAggregation { message } => {
                write!(f, "Incompatible aggregation: {}", message)
            }
            ZonalError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            ZonalError::ArrayError(e) => write!(f, "Array error: {}", e),
            ZonalError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ZonalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZonalError::NetCDFError(e) => Some(e),
            ZonalError::ShapefileError(e) => Some(e),
            ZonalError::TableError(e) => Some(e),
            ZonalError::IoError(e) => Some(e),
            ZonalError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for ZonalError {
    fn from(error: netcdf::Error) -> Self {
        ZonalError::NetCDFError(error)
    }
}

impl From<shapefile::Error> for ZonalError {
    fn from(error: shapefile::Error) -> Self {
        ZonalError::ShapefileError(error)
    }
}

impl From<polars::prelude::PolarsError> for ZonalError {
    fn from(error: polars::prelude::PolarsError) -> Self {
        ZonalError::TableError(error)
    }
}

impl From<std::io::Error> for ZonalError {
    fn from(error: std::io::Error) -> Self {
        ZonalError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for ZonalError {
    fn from(error: ndarray::ShapeError) -> Self {
        ZonalError::ArrayError(error)
    }
}

impl From<String> for ZonalError {
    fn from(error: String) -> Self {
        ZonalError::Generic(error)
    }
}

impl From<&str> for ZonalError {
    fn from(error: &str) -> Self {
        ZonalError::Generic(error.to_string())
    }
}

/// Result type alias for zonal_stats operations
pub type Result<T> = std::result::Result<T, ZonalError>;

impl ZonalError {
    /// True for errors raised before any geometry or aggregation work started.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            ZonalError::RegionFieldMissing { .. }
                | ZonalError::VariableNotFound { .. }
                | ZonalError::DuplicateColumn { .. }
        )
    }
}
