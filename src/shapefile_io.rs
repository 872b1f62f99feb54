//! Region loading from ESRI shapefiles
//!
//! Reads polygon shapes and their dBase attribute records into a [`RegionSet`].
//! Attribute values are stringified; the two label fields are checked on every
//! record before any geometry is converted.

use crate::errors::{Result, ZonalError};
use crate::region::{Region, RegionSet, RingRole};
use geo::{Coord, MultiPolygon};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{Point, PointM, PointZ, PolygonRing, Reader, Shape};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Load every shape of the shapefile at `path` as a region.
///
/// # Errors
///
/// Returns [`ZonalError::RegionFieldMissing`] if any record lacks `state_field`
/// or `district_field`, [`ZonalError::InvalidGeometry`] for non-polygon or
/// degenerate shapes, and [`ZonalError::ShapefileError`] for read failures.
pub fn load_region_set(
    path: impl AsRef<Path>,
    state_field: &str,
    district_field: &str,
) -> Result<RegionSet> {
    let path = path.as_ref();
    let mut reader = Reader::from_path(path)?;

    let mut items = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;
        items.push((shape, record_to_attributes(record)));
    }
    info!(path = %path.display(), regions = items.len(), "read shapefile");

    for (id, (_, attributes)) in items.iter().enumerate() {
        for field in [state_field, district_field] {
            if !attributes.contains_key(field) {
                return Err(ZonalError::RegionFieldMissing {
                    field: field.to_string(),
                    region_id: id,
                });
            }
        }
    }

    let regions = items
        .into_iter()
        .enumerate()
        .map(|(id, (shape, attributes))| shape_to_region(id, shape, attributes))
        .collect::<Result<Vec<_>>>()?;

    RegionSet::new(regions, &[state_field, district_field])
}

/// Stringify every field of a dBase record; null values become empty strings.
fn record_to_attributes(record: Record) -> BTreeMap<String, String> {
    record
        .into_iter()
        .map(|(name, value)| {
            let text = match value {
                FieldValue::Character(s) => s.map(|s| s.trim().to_string()).unwrap_or_default(),
                FieldValue::Memo(s) => s,
                FieldValue::Numeric(n) => n.map(|n| n.to_string()).unwrap_or_default(),
                FieldValue::Float(f) => f.map(|f| f.to_string()).unwrap_or_default(),
                FieldValue::Double(d) => d.to_string(),
                FieldValue::Integer(i) => i.to_string(),
                FieldValue::Currency(c) => c.to_string(),
                FieldValue::Logical(b) => b.map(|b| b.to_string()).unwrap_or_default(),
                other => format!("{other:?}"),
            };
            (name, text)
        })
        .collect()
}

fn shape_to_region(id: usize, shape: Shape, attributes: BTreeMap<String, String>) -> Result<Region> {
    match shape {
        Shape::Polygon(p) => {
            flagged_region(id, p.rings(), |pt: &Point| Coord { x: pt.x, y: pt.y }, attributes)
        }
        Shape::PolygonM(p) => {
            flagged_region(id, p.rings(), |pt: &PointM| Coord { x: pt.x, y: pt.y }, attributes)
        }
        Shape::PolygonZ(p) => {
            flagged_region(id, p.rings(), |pt: &PointZ| Coord { x: pt.x, y: pt.y }, attributes)
        }
        Shape::NullShape => {
            debug!(region = id, "null shape, region will have no cells");
            Ok(Region::new(id, MultiPolygon(Vec::new()), attributes))
        }
        other => Err(ZonalError::InvalidGeometry {
            region_id: id,
            message: format!("expected a polygon shape, found {:?}", other.shapetype()),
        }),
    }
}

fn flagged_region<P>(
    id: usize,
    rings: &[PolygonRing<P>],
    to_coord: impl Fn(&P) -> Coord<f64>,
    attributes: BTreeMap<String, String>,
) -> Result<Region> {
    let flagged = rings
        .iter()
        .map(|ring| {
            let role = match ring {
                PolygonRing::Outer(_) => RingRole::Exterior,
                PolygonRing::Inner(_) => RingRole::Hole,
            };
            (role, ring.points().iter().map(&to_coord).collect())
        })
        .collect();
    Region::from_flagged_rings(id, flagged, attributes)
}
