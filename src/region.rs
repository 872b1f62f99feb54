//! Polygon regions and their attribute table
//!
//! A [`RegionSet`] is the ordered collection of regions to aggregate over. Its
//! order is the output order. Required label fields are validated when the set
//! is built, so a misnamed field fails before any geometry work begins.

use crate::errors::{Result, ZonalError};
use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon, Rect};
use std::collections::BTreeMap;

/// A polygon (possibly multi-part, possibly with holes) plus descriptive attributes
#[derive(Debug, Clone)]
pub struct Region {
    pub id: usize,
    pub geometry: MultiPolygon<f64>,
    pub attributes: BTreeMap<String, String>,
}

/// Role of a ring within a polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingRole {
    Exterior,
    Hole,
}

impl Region {
    #[must_use]
    pub fn new(id: usize, geometry: MultiPolygon<f64>, attributes: BTreeMap<String, String>) -> Self {
        Self {
            id,
            geometry,
            attributes,
        }
    }

    /// Build a region from raw vertex rings, classifying holes by winding.
    ///
    /// The first ring is an exterior whatever its winding, so clockwise
    /// (shapefile) and counter-clockwise (GeoJSON) inputs both work. Every later
    /// ring wound the same way as the first starts a new polygon part; rings wound
    /// the opposite way are holes of the current part. Unclosed rings are closed.
    /// Use [`Region::from_flagged_rings`] when ring roles are known explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::InvalidGeometry`] for rings with fewer than three
    /// distinct vertices or zero area.
    pub fn from_rings(
        id: usize,
        rings: Vec<Vec<(f64, f64)>>,
        attributes: BTreeMap<String, String>,
    ) -> Result<Self> {
        let mut classified = Vec::with_capacity(rings.len());
        let mut exterior_sign = None;

        for ring in rings {
            let ring = closed_ring(id, ring.into_iter().map(Coord::from).collect())?;
            let sign = signed_area(&ring.0).signum();
            let reference = *exterior_sign.get_or_insert(sign);
            let role = if sign == reference {
                RingRole::Exterior
            } else {
                RingRole::Hole
            };
            classified.push((role, ring));
        }

        Ok(Self::new(id, assemble_polygons(id, classified)?, attributes))
    }

    /// Build a region from rings carrying an explicit exterior/hole flag.
    ///
    /// Holes belong to the closest preceding exterior ring.
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::InvalidGeometry`] for degenerate rings or a hole that
    /// precedes every exterior.
    pub fn from_flagged_rings(
        id: usize,
        rings: Vec<(RingRole, Vec<Coord<f64>>)>,
        attributes: BTreeMap<String, String>,
    ) -> Result<Self> {
        let classified = rings
            .into_iter()
            .map(|(role, coords)| Ok((role, closed_ring(id, coords)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(id, assemble_polygons(id, classified)?, attributes))
    }

    /// Attribute value, if present
    #[must_use]
    pub fn attribute(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).map(String::as_str)
    }
}

/// Ordered, validated collection of regions
#[derive(Debug, Clone, Default)]
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    /// Create a region set, checking that every region carries every required field.
    ///
    /// Region ids are reassigned to their position in `regions`.
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::RegionFieldMissing`] for the first region lacking a
    /// required field.
    pub fn new(mut regions: Vec<Region>, required_fields: &[&str]) -> Result<Self> {
        for (position, region) in regions.iter_mut().enumerate() {
            region.id = position;
        }
        let set = Self { regions };
        set.require_fields(required_fields)?;
        Ok(set)
    }

    /// Check that every region carries every field in `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::RegionFieldMissing`] naming the field and region.
    pub fn require_fields(&self, fields: &[&str]) -> Result<()> {
        for region in &self.regions {
            for field in fields {
                if !region.attributes.contains_key(*field) {
                    return Err(ZonalError::RegionFieldMissing {
                        field: (*field).to_string(),
                        region_id: region.id,
                    });
                }
            }
        }
        Ok(())
    }

    /// Attribute `field` of `region`
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::RegionFieldMissing`] if the field is absent.
    pub fn field_value<'a>(&self, region: &'a Region, field: &str) -> Result<&'a str> {
        region
            .attribute(field)
            .ok_or_else(|| ZonalError::RegionFieldMissing {
                field: field.to_string(),
                region_id: region.id,
            })
    }

    /// Bounding box of a region, `None` for an empty geometry
    #[must_use]
    pub fn bounding_box(&self, region: &Region) -> Option<Rect<f64>> {
        region.geometry.bounding_rect()
    }

    #[must_use]
    pub fn get(&self, id: usize) -> Option<&Region> {
        self.regions.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

impl<'a> IntoIterator for &'a RegionSet {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

/// Close a ring and reject degenerate ones.
fn closed_ring(region_id: usize, mut coords: Vec<Coord<f64>>) -> Result<LineString<f64>> {
    if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
        if first != last {
            coords.push(first);
        }
    }
    if coords.len() < 4 {
        return Err(ZonalError::InvalidGeometry {
            region_id,
            message: format!("ring has {} vertices, need at least 3 distinct", coords.len().saturating_sub(1)),
        });
    }
    if signed_area(&coords) == 0.0 {
        return Err(ZonalError::InvalidGeometry {
            region_id,
            message: "ring encloses zero area".to_string(),
        });
    }
    Ok(LineString(coords))
}

/// Shoelace signed area; the sign gives the winding direction.
fn signed_area(coords: &[Coord<f64>]) -> f64 {
    coords
        .windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum::<f64>()
        / 2.0
}

/// Group rings into polygons: each exterior followed by its holes.
fn assemble_polygons(
    region_id: usize,
    rings: Vec<(RingRole, LineString<f64>)>,
) -> Result<MultiPolygon<f64>> {
    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for (role, ring) in rings {
        match role {
            RingRole::Exterior => {
                if let Some(previous) = exterior.replace(ring) {
                    polygons.push(Polygon::new(previous, std::mem::take(&mut holes)));
                }
            }
            RingRole::Hole => {
                if exterior.is_none() {
                    return Err(ZonalError::InvalidGeometry {
                        region_id,
                        message: "hole ring precedes every exterior ring".to_string(),
                    });
                }
                holes.push(ring);
            }
        }
    }
    if let Some(last) = exterior {
        polygons.push(Polygon::new(last, holes));
    }

    Ok(MultiPolygon(polygons))
}
