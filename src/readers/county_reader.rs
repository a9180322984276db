use crate::error::{ProcessingError, Result};
use crate::models::County;
use geo::{LineString, MultiPolygon, Polygon};
use rstar::{RTree, AABB};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{Point, PointM, PointZ, PolygonRing, Shape};
use std::path::Path;
use tracing::{debug, warn};

/// Reads TIGER/Line county polygons from a shapefile.
pub struct CountyReader;

impl CountyReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_counties(&self, path: &Path) -> Result<Vec<County>> {
        if !path.exists() {
            return Err(ProcessingError::MissingData(format!(
                "county shapefile not found: {}",
                path.display()
            )));
        }

        let mut reader = shapefile::Reader::from_path(path)?;
        let mut counties = Vec::new();
        let mut skipped = 0usize;

        for (index, result) in reader.iter_shapes_and_records().enumerate() {
            let (shape, record) = result?;
            let geometry = match shape_geometry(shape) {
                Some(geometry) => geometry,
                None => {
                    skipped += 1;
                    continue;
                }
            };

            let county = County::new(
                index,
                text_field(&record, "STATEFP"),
                text_field(&record, "COUNTYFP"),
                text_field(&record, "GEOID"),
                text_field(&record, "NAME"),
                numeric_field(&record, "ALAND"),
                numeric_field(&record, "AWATER"),
                geometry,
            );

            match county {
                Some(county) => counties.push(county),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("Skipped {} county shapes without polygon geometry", skipped);
        }
        debug!("Read {} counties from {}", counties.len(), path.display());

        Ok(counties)
    }
}

impl Default for CountyReader {
    fn default() -> Self {
        Self::new()
    }
}

fn shape_geometry(shape: Shape) -> Option<MultiPolygon<f64>> {
    let geometry = match shape {
        Shape::Polygon(polygon) => to_multipolygon(polygon.rings(), |p: &Point| (p.x, p.y)),
        Shape::PolygonM(polygon) => to_multipolygon(polygon.rings(), |p: &PointM| (p.x, p.y)),
        Shape::PolygonZ(polygon) => to_multipolygon(polygon.rings(), |p: &PointZ| (p.x, p.y)),
        _ => return None,
    };
    Some(geometry)
}

/// Each outer ring starts a polygon; inner rings are holes of the polygon
/// before them.
fn to_multipolygon<P, F>(rings: &[PolygonRing<P>], xy: F) -> MultiPolygon<f64>
where
    F: Fn(&P) -> (f64, f64),
{
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    for ring in rings {
        let line: LineString<f64> = ring.points().iter().map(&xy).collect::<Vec<_>>().into();
        match ring {
            PolygonRing::Inner(_) if !polygons.is_empty() => {
                if let Some(polygon) = polygons.last_mut() {
                    polygon.interiors_push(line);
                }
            }
            _ => polygons.push(Polygon::new(line, Vec::new())),
        }
    }
    MultiPolygon::new(polygons)
}

fn text_field(record: &Record, name: &str) -> String {
    match record.get(name) {
        Some(FieldValue::Character(Some(value))) => value.trim().to_string(),
        Some(FieldValue::Numeric(Some(value))) => format!("{}", value),
        _ => String::new(),
    }
}

fn numeric_field(record: &Record, name: &str) -> Option<f64> {
    match record.get(name) {
        Some(FieldValue::Numeric(value)) => *value,
        Some(FieldValue::Double(value)) => Some(*value),
        Some(FieldValue::Float(value)) => value.map(f64::from),
        Some(FieldValue::Integer(value)) => Some(f64::from(*value)),
        Some(FieldValue::Character(Some(value))) => value.trim().parse().ok(),
        _ => None,
    }
}

/// Point-in-county lookup over an R-tree of county bounding boxes.
///
/// When polygons overlap, the county that came first in the shapefile wins.
pub struct CountyLocator {
    tree: RTree<County>,
}

impl CountyLocator {
    pub fn new(counties: Vec<County>) -> Self {
        Self {
            tree: RTree::bulk_load(counties),
        }
    }

    pub fn from_shapefile(path: &Path) -> Result<Self> {
        let counties = CountyReader::new().read_counties(path)?;
        if counties.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "no county polygons in {}",
                path.display()
            )));
        }
        Ok(Self::new(counties))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn locate(&self, longitude: f64, latitude: f64) -> Option<&County> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return None;
        }
        let point = AABB::from_point([longitude, latitude]);
        self.tree
            .locate_in_envelope_intersecting(&point)
            .filter(|county| county.contains(longitude, latitude))
            .min_by_key(|county| county.index)
    }
}
