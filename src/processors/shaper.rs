//! Column selection, sentinel replacement and county assignment for the raw
//! daily and normals exports.

use crate::error::Result;
use crate::models::{
    CsvRecord, NormalRecord, RawDailyRecord, RawNormalRecord, ShapedDailyRecord, StationLocation,
};
use crate::readers::{CountyLocator, CsvReader};
use crate::utils::constants::MISSING_SENTINEL;
use crate::writers::CsvWriter;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

/// `-9999` marks a missing value in the raw exports
fn clear_sentinel(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != MISSING_SENTINEL)
}

fn clear_sentinel_text(value: Option<String>) -> Option<String> {
    value.filter(|v| v.parse::<f64>().map_or(true, |n| n != MISSING_SENTINEL))
}

fn coordinate_key(value: Option<f64>) -> Option<u64> {
    value.map(f64::to_bits)
}

/// Unique (STATION, Lat, Long) triples in first-seen order.
pub fn unique_stations<'a, I>(points: I) -> Vec<StationLocation>
where
    I: IntoIterator<Item = (&'a str, Option<f64>, Option<f64>)>,
{
    let mut seen = HashSet::new();
    let mut stations = Vec::new();
    for (station, lat, lon) in points {
        if seen.insert((station, coordinate_key(lat), coordinate_key(lon))) {
            stations.push(StationLocation::new(station.to_string(), lat, lon));
        }
    }
    stations
}

/// Left spatial join of stations to counties. Returns how many stations
/// found no county.
pub fn assign_counties(stations: &mut [StationLocation], locator: &CountyLocator) -> usize {
    let mut unmatched = 0;
    for station in stations.iter_mut() {
        let county = station
            .coordinates()
            .and_then(|(lon, lat)| locator.locate(lon, lat));
        match county {
            Some(county) => {
                station.county = Some(county.name.clone());
                station.state_code = Some(county.state_fp.clone());
            }
            None => unmatched += 1,
        }
    }
    unmatched
}

/// Shaped rows that carry a station location and take a county assignment.
trait StationRow: Clone {
    fn station(&self) -> &str;
    fn location(&self) -> (Option<f64>, Option<f64>);
    fn set_county(&mut self, station: &StationLocation);
}

impl StationRow for ShapedDailyRecord {
    fn station(&self) -> &str {
        &self.station
    }

    fn location(&self) -> (Option<f64>, Option<f64>) {
        (self.latitude, self.longitude)
    }

    fn set_county(&mut self, station: &StationLocation) {
        self.county = station.county.clone();
        self.state_code = station.state_code.clone();
    }
}

impl StationRow for NormalRecord {
    fn station(&self) -> &str {
        &self.station
    }

    fn location(&self) -> (Option<f64>, Option<f64>) {
        (self.latitude, self.longitude)
    }

    fn set_county(&mut self, station: &StationLocation) {
        self.county = station.county.clone();
        self.state_code = station.state_code.clone();
    }
}

/// Builds the county-joined stations table, then inner-joins every record
/// to it on STATION (one output row per matching station entry).
fn join_counties<T: StationRow>(selected: Vec<T>, locator: &CountyLocator) -> ShapeResult<T> {
    let mut stations = unique_stations(selected.iter().map(|r| {
        let (lat, lon) = r.location();
        (r.station(), lat, lon)
    }));
    let unmatched_stations = assign_counties(&mut stations, locator);

    let records = {
        let mut index: HashMap<&str, Vec<&StationLocation>> = HashMap::new();
        for station in &stations {
            index.entry(station.station.as_str()).or_default().push(station);
        }

        let mut joined = Vec::with_capacity(selected.len());
        for record in &selected {
            for station in index.get(record.station()).into_iter().flatten() {
                let mut row = record.clone();
                row.set_county(station);
                joined.push(row);
            }
        }
        joined
    };

    ShapeResult {
        stations,
        records,
        unmatched_stations,
    }
}

#[derive(Debug, Clone)]
pub struct ShapeResult<T> {
    pub stations: Vec<StationLocation>,
    pub records: Vec<T>,
    pub unmatched_stations: usize,
}

impl<T: CsvRecord> ShapeResult<T> {
    /// Write the ready table and the stations table. Both keep their header
    /// when empty.
    pub fn write(&self, ready_output: &Path, stations_output: &Path) -> Result<()> {
        let writer = CsvWriter::new();
        writer.write_records(&self.records, ready_output)?;
        writer.write_records(&self.stations, stations_output)?;
        Ok(())
    }
}

impl<T> ShapeResult<T> {
    pub fn summary(&self, kind: &str) -> String {
        format!(
            "{} shaping: {} records, {} unique stations ({} outside every county)",
            kind,
            self.records.len(),
            self.stations.len(),
            self.unmatched_stations
        )
    }
}

/// Shapes `{state}DailyRaw.csv` into `{state}DailyReady.csv` and
/// `{state}StationsReady.csv`.
pub struct DailyShaper;

impl DailyShaper {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, raw: RawDailyRecord) -> ShapedDailyRecord {
        ShapedDailyRecord {
            date: raw.date,
            dew_point: clear_sentinel(raw.dewp),
            weather_type: clear_sentinel_text(raw.frshtt),
            wind_gust: clear_sentinel(raw.gust),
            max_temp: clear_sentinel(raw.max),
            min_temp: clear_sentinel(raw.min),
            max_wind_speed: clear_sentinel(raw.mxspd),
            precipitation: clear_sentinel(raw.prcp),
            avg_temp: clear_sentinel(raw.temp),
            wind_speed: clear_sentinel(raw.wdsp),
            elevation: clear_sentinel(raw.elevation),
            station: raw.station,
            station_name: raw.name,
            longitude: clear_sentinel(raw.longitude),
            latitude: clear_sentinel(raw.latitude),
            county: None,
            state_code: None,
        }
    }

    pub fn shape(
        &self,
        raw: Vec<RawDailyRecord>,
        locator: &CountyLocator,
    ) -> ShapeResult<ShapedDailyRecord> {
        let selected: Vec<ShapedDailyRecord> = raw.into_iter().map(|r| self.select(r)).collect();
        join_counties(selected, locator)
    }

    pub fn run(
        &self,
        input: &Path,
        shapefile: &Path,
        ready_output: &Path,
        stations_output: &Path,
    ) -> Result<ShapeResult<ShapedDailyRecord>> {
        let raw: Vec<RawDailyRecord> = CsvReader::new().read_records(input)?;
        info!("Read {} raw daily records", raw.len());

        let locator = CountyLocator::from_shapefile(shapefile)?;
        let result = self.shape(raw, &locator);
        if result.unmatched_stations > 0 {
            warn!(
                "{} daily stations fall outside every county",
                result.unmatched_stations
            );
        }

        result.write(ready_output, stations_output)?;
        Ok(result)
    }
}

impl Default for DailyShaper {
    fn default() -> Self {
        Self::new()
    }
}

/// Shapes `{state}NormalsRaw.csv` into `{state}NormalsReady.csv` and the
/// normals stations table.
pub struct NormalsShaper;

impl NormalsShaper {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, raw: RawNormalRecord) -> NormalRecord {
        NormalRecord {
            date: raw.date,
            avg_temp: clear_sentinel(raw.tavg_normal),
            avg_temp_std: clear_sentinel(raw.tavg_stddev),
            max_temp: clear_sentinel(raw.tmax_normal),
            max_temp_std: clear_sentinel(raw.tmax_stddev),
            min_temp: clear_sentinel(raw.tmin_normal),
            min_temp_std: clear_sentinel(raw.tmin_stddev),
            mtd_prcp: clear_sentinel(raw.mtd_prcp_normal),
            mtd_snow: clear_sentinel(raw.mtd_snow_normal),
            elevation: clear_sentinel(raw.elevation),
            station: raw.station,
            longitude: clear_sentinel(raw.longitude),
            latitude: clear_sentinel(raw.latitude),
            county: None,
            state_code: None,
        }
    }

    pub fn shape(&self, raw: Vec<RawNormalRecord>, locator: &CountyLocator) -> ShapeResult<NormalRecord> {
        let selected: Vec<NormalRecord> = raw.into_iter().map(|r| self.select(r)).collect();
        join_counties(selected, locator)
    }

    pub fn run(
        &self,
        input: &Path,
        shapefile: &Path,
        ready_output: &Path,
        stations_output: &Path,
    ) -> Result<ShapeResult<NormalRecord>> {
        let raw: Vec<RawNormalRecord> = CsvReader::new().read_records(input)?;
        info!("Read {} raw normals records", raw.len());

        let locator = CountyLocator::from_shapefile(shapefile)?;
        let result = self.shape(raw, &locator);
        if result.unmatched_stations > 0 {
            warn!(
                "{} normals stations fall outside every county",
                result.unmatched_stations
            );
        }

        result.write(ready_output, stations_output)?;
        Ok(result)
    }
}

impl Default for NormalsShaper {
    fn default() -> Self {
        Self::new()
    }
}
