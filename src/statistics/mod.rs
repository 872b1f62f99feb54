//! Zonal aggregation
//!
//! This module reduces the grid cells covered by each region into one value per
//! layer.
//!
//! # Organization
//!
//! This module is organized into submodules:
//! - [`operations`]: Aggregation strategies and the built-in statistics
//! - [`zonal`]: Reduction of one region's cells against every grid layer
//! - [`parallel`]: Parallel per-region resolution and aggregation

pub mod operations;
pub mod parallel;
pub mod zonal;

// Re-export the main types and functions for convenience
pub use operations::{Aggregation, StatOperation, UnweightedFn, WeightedFn};
pub use parallel::parallel_zonal_aggregate;
pub use zonal::{aggregate_region, ZonalResult, ZonalValue};
