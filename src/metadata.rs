//! NetCDF grid source inspection
//!
//! Describes the variable a grid is loaded from. This is diagnostic output for
//! the loader and the CLI; the extraction engine never prints.

use crate::errors::{Result, ZonalError};
use netcdf::{AttributeValue, File};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Structured metadata for a gridded NetCDF variable
#[derive(Debug, Clone, PartialEq)]
pub struct GridMetadata {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<DimensionInfo>,
    pub attributes: BTreeMap<String, JsonValue>,
    /// Values of `_FillValue` and every `missing_value` entry, in that order
    pub missing_values: Vec<f64>,
    pub total_elements: usize,
    pub estimated_size_bytes: usize,
}

/// Information about a dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

impl GridMetadata {
    /// Shape of the variable, one entry per dimension
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(|d| d.length).collect()
    }

    /// Print a human-readable description of the variable.
    pub fn print(&self) {
        let shape: Vec<String> = self
            .dimensions
            .iter()
            .map(|d| {
                let grows = if d.is_unlimited { "+" } else { "" };
                format!("{}={}{}", d.name, d.length, grows)
            })
            .collect();

        println!("\nGrid source '{}' ({})", self.name, self.data_type);
        println!("  shape:   {}", shape.join(" x "));
        match self.dimensions.len() {
            2 => println!("  layers:  1"),
            3 => println!("  layers:  {} (along '{}')", self.dimensions[0].length, self.dimensions[0].name),
            n => println!("  layers:  not a grid ({n} dimensions)"),
        }
        if self.missing_values.is_empty() {
            println!("  missing: NaN");
        } else {
            let markers: Vec<String> = self.missing_values.iter().map(f64::to_string).collect();
            println!("  missing: NaN or {}", markers.join(", "));
        }
        println!(
            "  size:    {} values, ~{}",
            self.total_elements,
            human_size(self.estimated_size_bytes)
        );
        for (name, value) in &self.attributes {
            println!("  @{name} = {value}");
        }
    }
}

/// Collect metadata for `var_name`.
///
/// # Errors
///
/// Returns [`ZonalError::VariableNotFound`] if the variable does not exist.
pub fn grid_variable_metadata(file: &File, var_name: &str) -> Result<GridMetadata> {
    let var = file
        .variable(var_name)
        .ok_or_else(|| ZonalError::VariableNotFound {
            var: var_name.to_string(),
        })?;

    let data_type = format!("{:?}", var.vartype()).to_lowercase();

    let dimensions: Vec<DimensionInfo> = var
        .dimensions()
        .iter()
        .map(|d| DimensionInfo {
            name: d.name().to_string(),
            length: d.len(),
            is_unlimited: d.is_unlimited(),
        })
        .collect();

    let mut attributes = BTreeMap::new();
    let mut fill = Vec::new();
    let mut missing = Vec::new();
    for attr in var.attributes() {
        let value = attr.value()?;
        match attr.name() {
            "_FillValue" => fill.extend(attribute_as_f64(&value)),
            "missing_value" => missing.extend(attribute_as_f64s(&value)),
            _ => {}
        }
        attributes.insert(attr.name().to_string(), attribute_to_json(value));
    }
    let mut missing_values = fill;
    for m in missing {
        if !missing_values.contains(&m) {
            missing_values.push(m);
        }
    }

    let total_elements: usize = dimensions.iter().map(|d| d.length).product();
    let element_size = if data_type.contains("double") || data_type.contains("64") {
        8
    } else if data_type.contains("short") || data_type.contains("16") {
        2
    } else if data_type.contains("byte") || data_type.contains("char") || data_type.contains('8') {
        1
    } else {
        4
    };

    Ok(GridMetadata {
        name: var_name.to_string(),
        data_type,
        dimensions,
        attributes,
        missing_values,
        total_elements,
        estimated_size_bytes: total_elements * element_size,
    })
}

/// List the file's global attributes and every variable, flagging the ones
/// that can be loaded as a grid (2-D, or 3-D with a leading layer dimension).
///
/// # Errors
///
/// Returns an error if an attribute value cannot be read.
pub fn print_metadata(file: &File) -> Result<()> {
    let globals = file
        .attributes()
        .map(|attr| Ok((attr.name().to_string(), attribute_to_json(attr.value()?))))
        .collect::<Result<BTreeMap<_, _>>>()?;
    println!("\n{} global attribute(s)", globals.len());
    for (name, value) in &globals {
        println!("  @{name} = {value}");
    }

    println!("\nVariables:");
    for var in file.variables() {
        let dims = var.dimensions();
        let shape: Vec<String> = dims.iter().map(|d| format!("{}={}", d.name(), d.len())).collect();
        let kind = match dims.len() {
            1 if dims[0].name() == var.name() => "coordinate",
            2 | 3 => "grid",
            _ => "",
        };
        println!("  {:<20} [{}] {}", var.name(), shape.join(", "), kind);
    }

    Ok(())
}

/// First numeric element of an attribute as `f64`
pub(crate) fn attribute_as_f64(value: &AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Double(v) => Some(*v),
        AttributeValue::Float(v) => Some(f64::from(*v)),
        AttributeValue::Int(v) => Some(f64::from(*v)),
        AttributeValue::Short(v) => Some(f64::from(*v)),
        AttributeValue::Schar(v) => Some(f64::from(*v)),
        AttributeValue::Uchar(v) => Some(f64::from(*v)),
        AttributeValue::Ushort(v) => Some(f64::from(*v)),
        AttributeValue::Uint(v) => Some(f64::from(*v)),
        AttributeValue::Doubles(v) => v.first().copied(),
        AttributeValue::Floats(v) => v.first().map(|x| f64::from(*x)),
        AttributeValue::Ints(v) => v.first().map(|x| f64::from(*x)),
        AttributeValue::Shorts(v) => v.first().map(|x| f64::from(*x)),
        _ => None,
    }
}

/// Every numeric element of an attribute as `f64`
pub(crate) fn attribute_as_f64s(value: &AttributeValue) -> Vec<f64> {
    match value {
        AttributeValue::Doubles(v) => v.clone(),
        AttributeValue::Floats(v) => v.iter().map(|x| f64::from(*x)).collect(),
        AttributeValue::Ints(v) => v.iter().map(|x| f64::from(*x)).collect(),
        AttributeValue::Shorts(v) => v.iter().map(|x| f64::from(*x)).collect(),
        AttributeValue::Ushorts(v) => v.iter().map(|x| f64::from(*x)).collect(),
        AttributeValue::Schars(v) => v.iter().map(|x| f64::from(*x)).collect(),
        AttributeValue::Uchars(v) => v.iter().map(|x| f64::from(*x)).collect(),
        other => attribute_as_f64(other).into_iter().collect(),
    }
}

/// String attribute value, if the attribute is textual
pub(crate) fn attribute_as_str(value: &AttributeValue) -> Option<&str> {
    match value {
        AttributeValue::Str(s) => Some(s.as_str()),
        AttributeValue::Strs(ss) => ss.first().map(String::as_str),
        _ => None,
    }
}

fn attribute_to_json(value: AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Str(s) => JsonValue::from(s),
        AttributeValue::Strs(ss) => JsonValue::from(ss),
        AttributeValue::Float(f) => JsonValue::from(f),
        AttributeValue::Floats(fs) => JsonValue::from(fs),
        AttributeValue::Double(d) => JsonValue::from(d),
        AttributeValue::Doubles(ds) => JsonValue::from(ds),
        AttributeValue::Int(i) => JsonValue::from(i),
        AttributeValue::Ints(is) => JsonValue::from(is),
        AttributeValue::Short(s) => JsonValue::from(s),
        AttributeValue::Shorts(ss) => JsonValue::from(ss),
        AttributeValue::Uchar(u) => JsonValue::from(u),
        AttributeValue::Uchars(us) => JsonValue::from(us),
        AttributeValue::Ushort(u) => JsonValue::from(u),
        AttributeValue::Ushorts(us) => JsonValue::from(us),
        AttributeValue::Uint(u) => JsonValue::from(u),
        AttributeValue::Uints(us) => JsonValue::from(us),
        other => JsonValue::from(format!("{other:?}")),
    }
}

fn human_size(bytes: usize) -> String {
    let bytes_f = bytes as f64;
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1024 * 1024 {
        format!("{:.2} KB", bytes_f / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.2} MB", bytes_f / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes_f / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_attributes_convert() {
        assert_eq!(attribute_as_f64(&AttributeValue::Float(-999.0)), Some(-999.0));
        assert_eq!(attribute_as_f64(&AttributeValue::Shorts(vec![7, 8])), Some(7.0));
        assert_eq!(attribute_as_f64(&AttributeValue::Str("x".to_string())), None);
        assert_eq!(
            attribute_as_f64s(&AttributeValue::Shorts(vec![-1, 9999])),
            vec![-1.0, 9999.0]
        );
        assert_eq!(attribute_as_f64s(&AttributeValue::Float(1e20)), vec![1e20_f32 as f64]);
        assert_eq!(
            attribute_as_str(&AttributeValue::Str("days since 2000-01-01".to_string())),
            Some("days since 2000-01-01")
        );
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(human_size(12), "12 bytes");
        assert_eq!(human_size(2048), "2.00 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.00 MB");
    }
}
