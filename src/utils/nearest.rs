//! Nearest station lookup in projected (metre) space.

use crate::utils::projection::Crs;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// A station projected into the search CRS. `slot` points back into the
/// caller's station list.
#[derive(Debug, Clone)]
pub struct ProjectedStation {
    pub id: String,
    pub slot: usize,
    x: f64,
    y: f64,
}

impl RTreeObject for ProjectedStation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for ProjectedStation {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestMatch<'a> {
    pub id: &'a str,
    pub slot: usize,
    /// Euclidean distance in the search CRS (metres for UTM)
    pub distance: f64,
}

/// R*-tree over projected stations.
///
/// Equidistant candidates resolve to the smallest station id, so the result
/// never depends on insertion order.
pub struct NearestStationIndex {
    crs: Crs,
    tree: RTree<ProjectedStation>,
}

impl NearestStationIndex {
    /// Build from `(id, longitude, latitude)` triples. Stations without finite
    /// coordinates are left out of the index.
    pub fn new<'a, I>(crs: Crs, stations: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64, f64)>,
    {
        let projected: Vec<ProjectedStation> = stations
            .into_iter()
            .enumerate()
            .filter(|(_, (_, lon, lat))| lon.is_finite() && lat.is_finite())
            .map(|(slot, (id, lon, lat))| {
                let (x, y) = crs.from_lon_lat(lon, lat);
                ProjectedStation {
                    id: id.to_string(),
                    slot,
                    x,
                    y,
                }
            })
            .collect();

        Self {
            crs,
            tree: RTree::bulk_load(projected),
        }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn nearest(&self, longitude: f64, latitude: f64) -> Option<NearestMatch<'_>> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return None;
        }
        let (x, y) = self.crs.from_lon_lat(longitude, latitude);

        let mut candidates = self.tree.nearest_neighbor_iter_with_distance_2(&[x, y]);
        let (mut best, best_d2) = candidates.next()?;
        for (candidate, d2) in candidates {
            if d2 > best_d2 {
                break;
            }
            if candidate.id < best.id {
                best = candidate;
            }
        }

        Some(NearestMatch {
            id: &best.id,
            slot: best.slot,
            distance: best_d2.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_in_utm() {
        let index = NearestStationIndex::new(
            Crs::Utm { zone: 17 },
            vec![("B", -81.30, 28.40), ("A", -82.50, 27.90), ("C", -80.10, 26.70)],
        );
        assert_eq!(index.len(), 3);

        let hit = index.nearest(-81.31, 28.41).unwrap();
        assert_eq!(hit.id, "B");
        assert_eq!(hit.slot, 0);
        assert!(hit.distance > 1000.0 && hit.distance < 2000.0);
    }

    #[test]
    fn test_tie_prefers_smallest_id() {
        let index = NearestStationIndex::new(
            Crs::Geographic,
            vec![("USW2", 1.0, 0.0), ("USW1", -1.0, 0.0), ("USW3", 0.0, 5.0)],
        );
        let hit = index.nearest(0.0, 0.0).unwrap();
        assert_eq!(hit.id, "USW1");
        assert_eq!(hit.distance, 1.0);
    }

    #[test]
    fn test_empty_index() {
        let index = NearestStationIndex::new(Crs::Geographic, Vec::<(&str, f64, f64)>::new());
        assert!(index.is_empty());
        assert!(index.nearest(0.0, 0.0).is_none());
    }

    #[test]
    fn test_non_finite_points_are_skipped() {
        let index = NearestStationIndex::new(
            Crs::Geographic,
            vec![("A", f64::NAN, 0.0), ("B", 2.0, 0.0)],
        );
        assert_eq!(index.len(), 1);
        let hit = index.nearest(0.0, 0.0).unwrap();
        assert_eq!((hit.id, hit.slot), ("B", 1));
    }
}
