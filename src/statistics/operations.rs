//! Aggregation strategies
//!
//! The aggregation applied to each region's cells is pluggable. [`Aggregation`]
//! holds either an unweighted reduction over a value slice or a weighted one over
//! parallel value and weight slices. [`StatOperation`] provides the common
//! statistics in both forms.
//!
//! Reductions must be pure and independent of input order. Missing inputs arrive
//! as NaN; the built-in operations propagate them.

use crate::errors::{Result, ZonalError};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Reduction over a sequence of values
pub type UnweightedFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// Reduction over parallel value and weight sequences
pub type WeightedFn = dyn Fn(&[f64], &[f64]) -> f64 + Send + Sync;

/// Supported statistical operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatOperation {
    /// Arithmetic mean
    Mean,
    /// Sum of values
    Sum,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Median value
    Median,
    /// Number of cells (sum of weights when weighted)
    Count,
    /// Population standard deviation
    Std,
}

impl StatOperation {
    pub const ALL: [Self; 7] = [
        Self::Mean,
        Self::Sum,
        Self::Min,
        Self::Max,
        Self::Median,
        Self::Count,
        Self::Std,
    ];

    /// Get the string representation of the operation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Median => "median",
            Self::Count => "count",
            Self::Std => "std",
        }
    }

    /// Apply the operation ignoring weights
    #[must_use]
    pub fn compute(self, values: &[f64]) -> f64 {
        if values.is_empty() || values.iter().any(|v| v.is_nan()) {
            return f64::NAN;
        }
        let n = values.len() as f64;
        match self {
            Self::Mean => values.iter().sum::<f64>() / n,
            Self::Sum => values.iter().sum(),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Self::Count => n,
            Self::Std => {
                let mean = values.iter().sum::<f64>() / n;
                (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
            }
        }
    }

    /// Apply the operation with per-value weights
    ///
    /// Min and max ignore the weights.
    #[must_use]
    pub fn compute_weighted(self, values: &[f64], weights: &[f64]) -> f64 {
        if values.is_empty()
            || values.len() != weights.len()
            || values.iter().any(|v| v.is_nan())
        {
            return f64::NAN;
        }
        let total: f64 = weights.iter().sum();
        let weighted_sum: f64 = values.iter().zip(weights).map(|(v, w)| v * w).sum();
        match self {
            Self::Mean => weighted_sum / total,
            Self::Sum => weighted_sum,
            Self::Min | Self::Max => self.compute(values),
            Self::Median => weighted_median(values, weights, total),
            Self::Count => total,
            Self::Std => {
                let mean = weighted_sum / total;
                let spread: f64 = values
                    .iter()
                    .zip(weights)
                    .map(|(v, w)| w * (v - mean).powi(2))
                    .sum();
                (spread / total).sqrt()
            }
        }
    }

    /// This operation as an unweighted aggregation
    #[must_use]
    pub fn unweighted(self) -> Aggregation {
        Aggregation::unweighted(move |values| self.compute(values))
    }

    /// This operation as a weighted aggregation
    #[must_use]
    pub fn weighted(self) -> Aggregation {
        Aggregation::weighted(move |values, weights| self.compute_weighted(values, weights))
    }
}

impl fmt::Display for StatOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatOperation {
    type Err = ZonalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ZonalError::Generic(format!(
                    "Unknown statistic '{s}', expected one of: {}",
                    Self::ALL.map(Self::as_str).join(", ")
                ))
            })
    }
}

/// Smallest value whose cumulative weight reaches half of the total.
///
/// When the cumulative weight lands exactly on the half, the midpoint with the
/// next value is taken so equal weights reproduce the ordinary median.
fn weighted_median(values: &[f64], weights: &[f64], total: f64) -> f64 {
    let mut pairs: Vec<(f64, f64)> = values.iter().copied().zip(weights.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let half = total / 2.0;
    let mut cumulative = 0.0;
    for (i, &(value, weight)) in pairs.iter().enumerate() {
        cumulative += weight;
        if (cumulative - half).abs() <= f64::EPSILON * total {
            return pairs.get(i + 1).map_or(value, |next| (value + next.0) / 2.0);
        }
        if cumulative > half {
            return value;
        }
    }
    pairs.last().map_or(f64::NAN, |p| p.0)
}

/// Pluggable reduction applied to the cells of one region and layer
#[derive(Clone)]
pub enum Aggregation {
    /// Reduction over values only; usable with binary membership
    Unweighted(Arc<UnweightedFn>),
    /// Reduction over values and coverage weights; usable with any membership
    Weighted(Arc<WeightedFn>),
}

impl Aggregation {
    pub fn unweighted<F>(f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Self::Unweighted(Arc::new(f))
    }

    pub fn weighted<F>(f: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self::Weighted(Arc::new(f))
    }

    #[must_use]
    pub const fn is_weighted(&self) -> bool {
        matches!(self, Self::Weighted(_))
    }

    /// Run the reduction. Unweighted variants ignore `weights`.
    #[must_use]
    pub fn apply(&self, values: &[f64], weights: &[f64]) -> f64 {
        match self {
            Self::Unweighted(f) => f(values),
            Self::Weighted(f) => f(values, weights),
        }
    }
}

impl Default for Aggregation {
    fn default() -> Self {
        StatOperation::Mean.weighted()
    }
}

impl From<StatOperation> for Aggregation {
    fn from(op: StatOperation) -> Self {
        op.weighted()
    }
}

impl fmt::Debug for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unweighted(_) => f.write_str("Aggregation::Unweighted(..)"),
            Self::Weighted(_) => f.write_str("Aggregation::Weighted(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUES: [f64; 4] = [1.0, 2.0, 3.0, 4.0];

    #[test]
    fn unweighted_operations() {
        assert_eq!(StatOperation::Mean.compute(&VALUES), 2.5);
        assert_eq!(StatOperation::Sum.compute(&VALUES), 10.0);
        assert_eq!(StatOperation::Min.compute(&VALUES), 1.0);
        assert_eq!(StatOperation::Max.compute(&VALUES), 4.0);
        assert_eq!(StatOperation::Median.compute(&VALUES), 2.5);
        assert_eq!(StatOperation::Median.compute(&[5.0, 1.0, 3.0]), 3.0);
        assert_eq!(StatOperation::Count.compute(&VALUES), 4.0);
        assert!((StatOperation::Std.compute(&VALUES) - 1.25_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn weighted_operations() {
        let halves = [0.5; 4];
        assert_eq!(StatOperation::Mean.compute_weighted(&VALUES, &halves), 2.5);
        assert_eq!(StatOperation::Sum.compute_weighted(&VALUES, &halves), 5.0);
        assert_eq!(StatOperation::Count.compute_weighted(&VALUES, &halves), 2.0);
        assert_eq!(StatOperation::Median.compute_weighted(&VALUES, &halves), 2.5);

        let skewed = [1.0, 0.0, 0.0, 3.0];
        assert_eq!(StatOperation::Mean.compute_weighted(&VALUES, &skewed), 3.25);
        assert_eq!(StatOperation::Median.compute_weighted(&VALUES, &skewed), 4.0);
        assert_eq!(StatOperation::Min.compute_weighted(&VALUES, &skewed), 1.0);
    }

    #[test]
    fn nan_propagates() {
        let with_missing = [1.0, f64::NAN];
        for op in StatOperation::ALL {
            assert!(op.compute(&with_missing).is_nan(), "{op}");
            assert!(op.compute_weighted(&with_missing, &[1.0, 1.0]).is_nan(), "{op}");
        }
    }

    #[test]
    fn parses_names() {
        assert_eq!("MEAN".parse::<StatOperation>().unwrap(), StatOperation::Mean);
        assert_eq!(" std ".parse::<StatOperation>().unwrap(), StatOperation::Std);
        assert!("average".parse::<StatOperation>().is_err());
    }

    #[test]
    fn custom_aggregations() {
        let range = Aggregation::unweighted(|v| {
            StatOperation::Max.compute(v) - StatOperation::Min.compute(v)
        });
        assert!(!range.is_weighted());
        assert_eq!(range.apply(&VALUES, &[]), 3.0);

        let total_weight = Aggregation::weighted(|_, w| w.iter().sum());
        assert!(total_weight.is_weighted());
        assert_eq!(total_weight.apply(&VALUES, &[0.25; 4]), 1.0);
    }
}
