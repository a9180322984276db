use geo::{BoundingRect, Contains, MultiPolygon, Point, Rect};
use rstar::{RTreeObject, AABB};

/// County boundary with the TIGER/Line attributes the pipeline carries along.
#[derive(Debug, Clone)]
pub struct County {
    /// Position in the source shapefile; earlier records win overlaps
    pub index: usize,
    pub state_fp: String,
    pub county_fp: String,
    pub geoid: String,
    pub name: String,
    pub aland: Option<f64>,
    pub awater: Option<f64>,
    geometry: MultiPolygon<f64>,
    bbox: Rect<f64>,
}

impl County {
    /// Returns `None` for an empty geometry.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: usize,
        state_fp: String,
        county_fp: String,
        geoid: String,
        name: String,
        aland: Option<f64>,
        awater: Option<f64>,
        geometry: MultiPolygon<f64>,
    ) -> Option<Self> {
        let bbox = geometry.bounding_rect()?;
        Some(Self {
            index,
            state_fp,
            county_fp,
            geoid,
            name,
            aland,
            awater,
            geometry,
            bbox,
        })
    }

    /// Interior test; points inside a hole or on the boundary are outside.
    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        let point = Point::new(longitude, latitude);
        self.geometry.iter().any(|polygon| polygon.contains(&point))
    }
}

impl RTreeObject for County {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let (min, max) = (self.bbox.min(), self.bbox.max());
        AABB::from_corners([min.x, min.y], [max.x, max.y])
    }
}
