use crate::analyzers::{ConnectionAnalyzer, ConnectionReport};
use crate::error::{ProcessingError, Result};
use crate::models::StationMapping;
use crate::readers::CsvReader;
use crate::utils::coordinates::validate_lon_lat;
use crate::utils::na;
use crate::utils::nearest::NearestStationIndex;
use crate::utils::projection::{utm_zone_for_median, Crs};
use crate::writers::{CsvWriter, GeoJsonWriter};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Station columns of `{state}DailyCleaned.csv`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailyStationRow {
    #[serde(rename = "STATION", deserialize_with = "na::deserialize_station_id")]
    pub station: String,
    #[serde(rename = "Long", default, deserialize_with = "na::deserialize_f64")]
    pub longitude: Option<f64>,
    #[serde(rename = "Lat", default, deserialize_with = "na::deserialize_f64")]
    pub latitude: Option<f64>,
    #[serde(rename = "COUNTY", default, deserialize_with = "na::deserialize_string")]
    pub county: Option<String>,
    #[serde(rename = "StationName", default, deserialize_with = "na::deserialize_string")]
    pub name: Option<String>,
}

/// Station columns of `{state}NormalsReady.csv`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NormalStationRow {
    #[serde(rename = "STATION", deserialize_with = "na::deserialize_station_id")]
    pub station: String,
    #[serde(rename = "Long", default, deserialize_with = "na::deserialize_f64")]
    pub longitude: Option<f64>,
    #[serde(rename = "Lat", default, deserialize_with = "na::deserialize_f64")]
    pub latitude: Option<f64>,
    #[serde(rename = "COUNTY", default, deserialize_with = "na::deserialize_string")]
    pub county: Option<String>,
}

fn bits(value: Option<f64>) -> Option<u64> {
    value.map(f64::to_bits)
}

/// Drop exact duplicate station rows, keeping first-seen order.
pub fn unique_daily_stations(rows: Vec<DailyStationRow>) -> Vec<DailyStationRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|r| {
            seen.insert((
                r.station.clone(),
                bits(r.longitude),
                bits(r.latitude),
                r.county.clone(),
                r.name.clone(),
            ))
        })
        .collect()
}

pub fn unique_normal_stations(rows: Vec<NormalStationRow>) -> Vec<NormalStationRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|r| {
            seen.insert((
                r.station.clone(),
                bits(r.longitude),
                bits(r.latitude),
                r.county.clone(),
            ))
        })
        .collect()
}

fn valid_point(station: &str, longitude: Option<f64>, latitude: Option<f64>) -> Option<(f64, f64)> {
    let (lon, lat) = (longitude?, latitude?);
    match validate_lon_lat(lon, lat) {
        Ok(()) => Some((lon, lat)),
        Err(e) => {
            warn!("Station {} skipped for matching: {}", station, e);
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct MappingReport {
    pub daily_stations: usize,
    pub normal_stations: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub crs: Crs,
    pub connections: ConnectionReport,
}

impl MappingReport {
    pub fn summary(&self) -> String {
        format!(
            "Mapped {} daily stations to {} normals stations in {} ({} matched, {} unmatched)\n{}",
            self.daily_stations,
            self.normal_stations,
            self.crs,
            self.matched,
            self.unmatched,
            self.connections.summary()
        )
    }
}

/// Pairs every daily station with its nearest climate-normals station.
pub struct StationMapper {
    utm_zone: Option<u8>,
}

impl StationMapper {
    pub fn new() -> Self {
        Self { utm_zone: None }
    }

    /// Force the UTM zone instead of deriving it from the daily stations.
    pub fn with_utm_zone(mut self, zone: Option<u8>) -> Self {
        self.utm_zone = zone;
        self
    }

    fn search_crs(&self, daily: &[DailyStationRow]) -> Result<Crs> {
        let zone = match self.utm_zone {
            Some(zone) if (1..=60).contains(&zone) => zone,
            Some(zone) => {
                return Err(ProcessingError::Projection(format!(
                    "UTM zone {} is outside 1..=60",
                    zone
                )))
            }
            None => {
                let longitudes: Vec<f64> = daily.iter().filter_map(|s| s.longitude).collect();
                utm_zone_for_median(&longitudes)?
            }
        };
        Ok(Crs::Utm { zone })
    }

    /// Nearest-neighbour left join. Inputs must already be de-duplicated.
    pub fn map(
        &self,
        daily: &[DailyStationRow],
        normals: &[NormalStationRow],
    ) -> Result<(Vec<StationMapping>, Crs)> {
        if daily.is_empty() {
            warn!("No daily stations to map");
            return Ok((Vec::new(), Crs::Geographic));
        }
        let crs = self.search_crs(daily)?;

        let index = NearestStationIndex::new(
            crs,
            normals.iter().map(|n| {
                let (lon, lat) = valid_point(&n.station, n.longitude, n.latitude)
                    .unwrap_or((f64::NAN, f64::NAN));
                (n.station.as_str(), lon, lat)
            }),
        );
        debug!("Indexed {} normals stations in {}", index.len(), crs);

        let mappings = daily
            .iter()
            .map(|d| {
                let hit = valid_point(&d.station, d.longitude, d.latitude)
                    .and_then(|(lon, lat)| index.nearest(lon, lat));
                let normal = hit.map(|h| (&normals[h.slot], h.distance));

                StationMapping {
                    daily_station: d.station.clone(),
                    daily_long: d.longitude,
                    daily_lat: d.latitude,
                    daily_county: d.county.clone(),
                    daily_station_name: d.name.clone(),
                    normal_station: normal.map(|(n, _)| n.station.clone()),
                    normal_long: normal.and_then(|(n, _)| n.longitude),
                    normal_lat: normal.and_then(|(n, _)| n.latitude),
                    normal_county: normal.and_then(|(n, _)| n.county.clone()),
                    distance: normal.map(|(_, distance)| distance),
                }
            })
            .collect();

        Ok((mappings, crs))
    }

    pub fn run(
        &self,
        daily_input: &Path,
        normals_input: &Path,
        output: &Path,
        geojson: Option<&Path>,
    ) -> Result<MappingReport> {
        let reader = CsvReader::new();
        let daily = unique_daily_stations(reader.read_records(daily_input)?);
        let normals = unique_normal_stations(reader.read_records(normals_input)?);
        info!(
            "{} unique daily stations, {} unique normals stations",
            daily.len(),
            normals.len()
        );

        let (mappings, crs) = self.map(&daily, &normals)?;
        CsvWriter::new().write_records(&mappings, output)?;
        info!("Station mapping complete. Output saved to: {}", output.display());

        let connections = ConnectionAnalyzer::new().analyze(&mappings);
        if let Some(path) = geojson {
            GeoJsonWriter::new().write(&connections.connections, path)?;
        }

        let matched = mappings.iter().filter(|m| m.is_matched()).count();
        Ok(MappingReport {
            daily_stations: daily.len(),
            normal_stations: normals.len(),
            matched,
            unmatched: mappings.len() - matched,
            crs,
            connections,
        })
    }
}

impl Default for StationMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn daily(station: &str, lon: f64, lat: f64) -> DailyStationRow {
        DailyStationRow {
            station: station.to_string(),
            longitude: Some(lon),
            latitude: Some(lat),
            county: Some("Orange".to_string()),
            name: Some(format!("{} AIRPORT", station)),
        }
    }

    fn normal(station: &str, lon: f64, lat: f64) -> NormalStationRow {
        NormalStationRow {
            station: station.to_string(),
            longitude: Some(lon),
            latitude: Some(lat),
            county: Some("Seminole".to_string()),
        }
    }

    #[test]
    fn test_one_row_per_daily_station() {
        let daily_rows = vec![
            daily("722050", -81.32, 28.43),
            daily("747880", -82.53, 27.97),
            daily("722050", -81.32, 28.43),
        ];
        let normals = vec![
            normal("USW00012815", -81.33, 28.43),
            normal("USW00012842", -82.54, 27.96),
        ];

        let daily_rows = unique_daily_stations(daily_rows);
        assert_eq!(daily_rows.len(), 2);

        let (mappings, crs) = StationMapper::new().map(&daily_rows, &normals).unwrap();
        assert_eq!(crs, Crs::Utm { zone: 17 });
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].normal_station.as_deref(), Some("USW00012815"));
        assert_eq!(mappings[1].normal_station.as_deref(), Some("USW00012842"));
        assert_eq!(mappings[1].normal_county.as_deref(), Some("Seminole"));
        assert!(mappings[0].distance.unwrap() < 2000.0);
    }

    #[test]
    fn test_no_normals_leaves_left_join_empty() {
        let daily_rows = vec![daily("722050", -81.32, 28.43)];
        let (mappings, _) = StationMapper::new().map(&daily_rows, &[]).unwrap();

        assert_eq!(mappings.len(), 1);
        assert!(!mappings[0].is_matched());
        assert_eq!(mappings[0].distance, None);
    }

    #[test]
    fn test_equidistant_normals_pick_smallest_id() {
        let daily_rows = vec![daily("A", -81.0, 28.0)];
        let normals = vec![normal("USW2", -81.0, 28.01), normal("USW1", -81.0, 28.01)];

        let (mappings, _) = StationMapper::new().map(&daily_rows, &normals).unwrap();
        assert_eq!(mappings[0].normal_station.as_deref(), Some("USW1"));
    }

    #[test]
    fn test_invalid_zone_override() {
        let daily_rows = vec![daily("A", -81.0, 28.0)];
        let result = StationMapper::new()
            .with_utm_zone(Some(61))
            .map(&daily_rows, &[]);
        assert!(matches!(result, Err(ProcessingError::Projection(_))));
    }

    #[test]
    fn test_run_writes_mapping_and_geojson() {
        let temp_dir = TempDir::new().unwrap();
        let daily_path = temp_dir.path().join("FloridaDailyCleaned.csv");
        let normals_path = temp_dir.path().join("FloridaNormalsReady.csv");
        let output = temp_dir.path().join("Florida_Station_Mapping.csv");
        let geojson = temp_dir.path().join("connections.geojson");

        std::fs::write(
            &daily_path,
            "Date,MaxTemp,STATION,StationName,Long,Lat,COUNTY\n\
             2019-01-01,80.0,72205012815.0,ORLANDO INTL,-81.325,28.434,Orange\n\
             2019-01-02,81.0,72205012815,ORLANDO INTL,-81.325,28.434,Orange\n",
        )
        .unwrap();
        std::fs::write(
            &normals_path,
            "DATE,normalAvgTemp,STATION,Long,Lat,COUNTY\n\
             01-01,60.5,USW00012815,-81.3249,28.4339,Orange\n\
             01-02,60.4,USW00012815,-81.3249,28.4339,Orange\n",
        )
        .unwrap();

        let report = StationMapper::new()
            .run(&daily_path, &normals_path, &output, Some(&geojson))
            .unwrap();
        assert_eq!(report.daily_stations, 1);
        assert_eq!(report.normal_stations, 1);
        assert_eq!(report.matched, 1);
        assert_eq!(report.connections.matched, 1);
        assert!(geojson.exists());

        let content = std::fs::read_to_string(&output).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("DailyStation,DailyLong,DailyLat,DailyCounty,DailyStationName,NormalStation,NormalLong,NormalLat,NormalCounty,Distance")
        );
        assert!(lines
            .next()
            .unwrap()
            .starts_with("72205012815,-81.325,28.434,Orange,ORLANDO INTL,USW00012815,-81.3249,28.4339,Orange,"));
    }

    #[test]
    fn test_run_without_daily_stations_writes_header_only() {
        let temp_dir = TempDir::new().unwrap();
        let daily_path = temp_dir.path().join("FloridaDailyCleaned.csv");
        let normals_path = temp_dir.path().join("FloridaNormalsReady.csv");
        let output = temp_dir.path().join("Florida_Station_Mapping.csv");

        std::fs::write(&daily_path, "Date,MaxTemp,STATION,StationName,Long,Lat,COUNTY\n").unwrap();
        std::fs::write(
            &normals_path,
            "DATE,normalAvgTemp,STATION,Long,Lat,COUNTY\n01-01,60.5,USW00012815,-81.3249,28.4339,Orange\n",
        )
        .unwrap();

        let report = StationMapper::new()
            .run(&daily_path, &normals_path, &output, None)
            .unwrap();
        assert_eq!(report.daily_stations, 0);
        assert_eq!(report.matched, 0);

        let mappings: Vec<StationMapping> = CsvReader::new().read_records(&output).unwrap();
        assert!(mappings.is_empty());
        assert!(std::fs::read_to_string(&output)
            .unwrap()
            .starts_with("DailyStation,DailyLong,DailyLat,"));
    }
}
