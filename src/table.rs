//! Result assembly
//!
//! Joins each region's label attributes with its per-layer aggregates into an
//! [`OutputTable`] whose row order always matches the region set, independent
//! of the order in which per-region results were produced.

use crate::errors::{Result, ZonalError};
use crate::region::RegionSet;
use crate::statistics::{ZonalResult, ZonalValue};
use polars::prelude::{Column, DataFrame};
use std::collections::HashSet;

/// One output row: the two labels followed by one aggregate per layer
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub region_id: usize,
    pub state: String,
    pub district: String,
    pub values: Vec<ZonalValue>,
}

/// Ordered zonal statistics table
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    pub state_column: String,
    pub district_column: String,
    pub layer_names: Vec<String>,
    pub rows: Vec<OutputRow>,
}

impl OutputTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header in output order
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        let mut names = vec![self.state_column.clone(), self.district_column.clone()];
        names.extend(self.layer_names.iter().cloned());
        names
    }

    /// All values of one layer, in row order
    #[must_use]
    pub fn layer_values(&self, layer: usize) -> Vec<ZonalValue> {
        self.rows
            .iter()
            .filter_map(|row| row.values.get(layer).copied())
            .collect()
    }

    /// Convert to a polars frame; no-data and NaN aggregates become nulls.
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::TableError`] if column names collide.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.layer_names.len() + 2);
        columns.push(Column::new(
            self.state_column.as_str().into(),
            self.rows.iter().map(|r| r.state.as_str()).collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            self.district_column.as_str().into(),
            self.rows.iter().map(|r| r.district.as_str()).collect::<Vec<_>>(),
        ));
        for (layer, name) in self.layer_names.iter().enumerate() {
            let values: Vec<Option<f64>> = self
                .layer_values(layer)
                .into_iter()
                .map(ZonalValue::as_option)
                .collect();
            columns.push(Column::new(name.as_str().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Check that the label columns and layer names form a header without repeats.
///
/// # Errors
///
/// Returns [`ZonalError::DuplicateColumn`] naming the first repeated column.
pub fn check_column_names(state_field: &str, district_field: &str, layer_names: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(layer_names.len() + 2);
    let header = [state_field, district_field]
        .into_iter()
        .chain(layer_names.iter().map(String::as_str));
    for name in header {
        if !seen.insert(name) {
            return Err(ZonalError::DuplicateColumn {
                column: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Join per-region results with region labels, in region set order.
///
/// `results` may arrive in any order; each region must have exactly one result.
///
/// # Errors
///
/// Returns [`ZonalError::DuplicateColumn`] if the header would repeat a name,
/// [`ZonalError::RegionFieldMissing`] if a label field is absent, and
/// [`ZonalError::Generic`] if a region has no result, several results, or a
/// result with the wrong number of layers.
pub fn assemble(
    regions: &RegionSet,
    state_field: &str,
    district_field: &str,
    layer_names: &[String],
    results: Vec<ZonalResult>,
) -> Result<OutputTable> {
    check_column_names(state_field, district_field, layer_names)?;

    let mut slots: Vec<Option<ZonalResult>> = vec![None; regions.len()];
    for result in results {
        let id = result.region_id;
        let slot = slots
            .get_mut(id)
            .ok_or_else(|| ZonalError::Generic(format!("result for unknown region {id}")))?;
        if slot.replace(result).is_some() {
            return Err(ZonalError::Generic(format!("duplicate result for region {id}")));
        }
    }

    let rows = regions
        .iter()
        .zip(slots)
        .map(|(region, slot)| {
            let result = slot.ok_or_else(|| {
                ZonalError::Generic(format!("no result produced for region {}", region.id))
            })?;
            if result.values.len() != layer_names.len() {
                return Err(ZonalError::Generic(format!(
                    "region {} has {} values for {} layers",
                    region.id,
                    result.values.len(),
                    layer_names.len()
                )));
            }
            Ok(OutputRow {
                region_id: region.id,
                state: regions.field_value(region, state_field)?.to_string(),
                district: regions.field_value(region, district_field)?.to_string(),
                values: result.values,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(OutputTable {
        state_column: state_field.to_string(),
        district_column: district_field.to_string(),
        layer_names: layer_names.to_vec(),
        rows,
    })
}
