//! zonal_stats: zonal aggregate statistics of gridded fields over polygon regions
//!
//! Given a gridded scalar field with one or more layers (time steps or bands) and
//! a set of labelled polygon regions, zonal_stats computes one aggregate value per
//! region and layer from the grid cells inside each region, and returns a table
//! joining the region labels with the aggregates.
//!
//! ## Key Features
//!
//! - **Parallel Processing**: Regions are resolved and reduced concurrently using Rayon
//! - **Membership Policies**: Cell-centre containment with an explicit boundary rule, or
//!   area-weighted coverage fractions
//! - **Pluggable Aggregation**: Built-in mean, sum, min, max, median, count and std, or any
//!   user closure, in unweighted or weighted form
//! - **Missing Data**: NaN and `_FillValue` sentinels are dropped or passed through on request;
//!   regions without valid cells report no data instead of zero
//! - **NetCDF & Shapefile Input**: Loaders for gridded NetCDF variables and polygon shapefiles
//! - **CSV Output**: Ordered result tables exported through polars
//!
//! ## Module Organization
//!
//! - [`grid`]: Immutable grid of layers with spatial indexing
//! - [`region`]: Polygon regions and the validated region set
//! - [`membership`]: Cell membership resolution per region
//! - [`statistics`]: Aggregation strategies and per-region reduction
//! - [`table`]: Ordered result assembly
//! - [`extract`]: The extraction entry point
//! - [`netcdf_io`], [`shapefile_io`], [`export`]: Loaders and CSV export
//! - [`metadata`]: NetCDF variable inspection
//! - [`cf_time`]: CF time coordinates and calendars
//! - [`parallel`]: Parallel processing configuration
//! - [`errors`]: Centralized error handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use zonal_stats::prelude::*;
//!
//! let grid = zonal_stats::load_grid("precip.nc", "precip").unwrap();
//! let regions = zonal_stats::load_region_set("districts.shp", "state", "district").unwrap();
//!
//! let options = ExtractOptions::new(StatOperation::Mean.weighted())
//!     .with_policy(MembershipPolicy::Fractional);
//! let table = extract(&grid, &regions, "state", "district", &options).unwrap();
//!
//! zonal_stats::export_table(&table, Some(std::path::Path::new("out.csv"))).unwrap();
//! ```

// Core modules
pub mod errors;
pub mod extract;
pub mod grid;
pub mod membership;
pub mod region;
pub mod statistics;
pub mod table;

// Collaborators
pub mod cf_time;
pub mod export;
pub mod metadata;
pub mod netcdf_io;
pub mod parallel;
pub mod shapefile_io;

// Direct re-exports for the public API
pub use cf_time::{decode_cf_times, CfCalendar};
pub use errors::*;
pub use export::{export_table, table_to_csv_string};
pub use extract::{extract, ExtractOptions};
pub use grid::{Grid, MissingValue, RowOrientation};
pub use membership::{resolve, BoundaryRule, CellMembership, CellWeight, MembershipPolicy};
pub use metadata::{grid_variable_metadata, print_metadata, DimensionInfo, GridMetadata};
pub use netcdf_io::{load_grid, load_grid_with_diagnostics};
pub use parallel::*;
pub use region::{Region, RegionSet, RingRole};
pub use shapefile_io::load_region_set;
pub use statistics::*;
pub use table::{assemble, check_column_names, OutputRow, OutputTable};

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::errors::{Result, ZonalError};
    pub use crate::extract::{extract, ExtractOptions};
    pub use crate::grid::{Grid, MissingValue, RowOrientation};
    pub use crate::membership::{BoundaryRule, MembershipPolicy};
    pub use crate::parallel::ParallelConfig;
    pub use crate::region::{Region, RegionSet};
    pub use crate::statistics::{Aggregation, StatOperation, ZonalValue};
    pub use crate::table::{OutputRow, OutputTable};
}
