use crate::analyzers::StationConnection;
use crate::error::Result;
use serde_json::{json, Value};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Writes station connections as a GeoJSON FeatureCollection: one point per
/// daily station, one per normals station, and a line between each pair.
pub struct GeoJsonWriter;

impl GeoJsonWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn to_value(&self, connections: &[StationConnection]) -> Value {
        let mut features = Vec::with_capacity(connections.len() * 3);

        for c in connections {
            features.push(json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [c.daily.0, c.daily.1] },
                "properties": {
                    "role": "daily",
                    "station": c.daily_station,
                    "name": c.daily_name,
                }
            }));
            features.push(json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [c.normal.0, c.normal.1] },
                "properties": { "role": "normal", "station": c.normal_station }
            }));
            features.push(json!({
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[c.daily.0, c.daily.1], [c.normal.0, c.normal.1]]
                },
                "properties": {
                    "role": "connection",
                    "daily_station": c.daily_station,
                    "normal_station": c.normal_station,
                    "distance_m": c.distance,
                }
            }));
        }

        json!({ "type": "FeatureCollection", "features": features })
    }

    pub fn write(&self, connections: &[StationConnection], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &self.to_value(connections))?;

        info!(
            "Wrote {} station connections to {}",
            connections.len(),
            path.display()
        );
        Ok(())
    }
}

impl Default for GeoJsonWriter {
    fn default() -> Self {
        Self::new()
    }
}
