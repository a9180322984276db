use crate::analyzers::{ConnectionAnalyzer, ConnectionReport};
use crate::error::{ProcessingError, Result};
use crate::models::{composite_key, CombinedRecord, DailyRecord, NormalRecord, StationMapping};
use crate::readers::CsvReader;
use crate::utils::constants::MONTH_DAY_FORMAT;
use crate::writers::{CsvWriter, GeoJsonWriter};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::path::Path;
use tracing::{info, warn};

/// Counts gathered while merging. Every duplicate that was dropped is
/// recorded here as well as logged.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub daily_rows_read: usize,
    pub mapping_rows_read: usize,
    pub normals_rows_read: usize,
    pub duplicate_mappings: usize,
    pub duplicate_daily: usize,
    pub duplicate_normals: usize,
    pub duplicate_composite_keys: usize,
    /// (STATION, MonthDay) pairs repeated after the mapping join
    pub multiple_mappings: usize,
    /// Daily rows after de-duplication
    pub daily_rows: usize,
    pub combined_rows: usize,
    pub unmapped_rows: usize,
    pub rows_with_normals: usize,
    pub warnings: Vec<String>,
}

impl MergeReport {
    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();
        for warning in &self.warnings {
            summary.push_str(warning);
            summary.push('\n');
        }
        summary.push_str(&format!("Original daily data count: {}\n", self.daily_rows));
        summary.push_str(&format!("Combined data count: {}\n", self.combined_rows));
        summary.push_str(&format!(
            "Rows with matched normals: {} ({} rows without a station mapping)",
            self.rows_with_normals, self.unmapped_rows
        ));
        summary
    }
}

/// Keep the first item per key. Returns the kept items and how many were
/// dropped.
fn dedup_by_key<T, K, F>(items: Vec<T>, mut key: F) -> (Vec<T>, usize)
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let before = items.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<T> = items.into_iter().filter(|item| seen.insert(key(item))).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

fn month_day(date: NaiveDate) -> String {
    date.format(MONTH_DAY_FORMAT).to_string()
}

/// Joins cleaned daily records to their nearest station's climate normals.
pub struct DataMerger;

impl DataMerger {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(
        &self,
        daily: Vec<DailyRecord>,
        mappings: Vec<StationMapping>,
        normals: Vec<NormalRecord>,
    ) -> Result<(Vec<CombinedRecord>, MergeReport)> {
        let mut report = MergeReport {
            daily_rows_read: daily.len(),
            mapping_rows_read: mappings.len(),
            normals_rows_read: normals.len(),
            ..Default::default()
        };

        let (mappings, dropped) = dedup_by_key(mappings, |m| m.daily_station.clone());
        if dropped > 0 {
            report.duplicate_mappings = dropped;
            report.warn(
                "Warning: Duplicates found in station mappings. Removing duplicates.".to_string(),
            );
        }

        let (daily, dropped) = dedup_by_key(daily, |d| (d.station.clone(), d.date));
        if dropped > 0 {
            report.duplicate_daily = dropped;
            report.warn(format!(
                "Warning: {} duplicates found in daily data. Removing duplicates.",
                dropped
            ));
        }

        let (normals, dropped) = dedup_by_key(normals, |n| (n.station.clone(), n.date.clone()));
        if dropped > 0 {
            report.duplicate_normals = dropped;
            report.warn(format!(
                "Warning: {} duplicates found in normals data. Removing duplicates.",
                dropped
            ));
        }

        let (normals, dropped) = dedup_by_key(normals, |n| n.composite_key());
        if dropped > 0 {
            report.duplicate_composite_keys = dropped;
            report.warn(
                "Warning: Duplicates found in normals data composite keys. Removing duplicates."
                    .to_string(),
            );
        }

        let mapping_index: HashMap<&str, &StationMapping> = mappings
            .iter()
            .map(|m| (m.daily_station.as_str(), m))
            .collect();
        let normals_index: HashMap<String, &NormalRecord> =
            normals.iter().map(|n| (n.composite_key(), n)).collect();
        if normals_index.len() != normals.len() {
            return Err(ProcessingError::DataMerge(
                "composite keys are not unique after de-duplication".to_string(),
            ));
        }

        report.daily_rows = daily.len();
        let mut station_days = HashSet::with_capacity(daily.len());
        let mut combined = Vec::with_capacity(daily.len());

        for record in daily {
            let month_day = month_day(record.date);
            if !station_days.insert((record.station.clone(), month_day.clone())) {
                report.multiple_mappings += 1;
            }

            let mapping = mapping_index.get(record.station.as_str()).copied();
            let key = mapping
                .and_then(|m| m.normal_station.as_deref())
                .map(|normal_station| composite_key(normal_station, &month_day));
            let normal = key
                .as_ref()
                .and_then(|k| normals_index.get(k))
                .map(|n| (*n).clone());

            if mapping.is_none() {
                report.unmapped_rows += 1;
            }
            if normal.is_some() {
                report.rows_with_normals += 1;
            }

            combined.push(CombinedRecord {
                daily: record,
                month_day,
                mapping: mapping.cloned(),
                composite_key: key,
                normal,
            });
        }

        if report.multiple_mappings > 0 {
            report.warn("Warning: Daily data has multiple mappings to normals stations.".to_string());
        }

        report.combined_rows = combined.len();
        Ok((combined, report))
    }

    /// First row per daily station, as drawn on the connection map.
    pub fn connections(&self, records: &[CombinedRecord]) -> ConnectionReport {
        ConnectionAnalyzer::new().analyze(records.iter().filter_map(|r| r.mapping.as_ref()))
    }

    pub fn run(
        &self,
        daily_input: &Path,
        normals_input: &Path,
        mapping_input: &Path,
        output: &Path,
        geojson: Option<&Path>,
    ) -> Result<(MergeReport, ConnectionReport)> {
        let reader = CsvReader::new();
        let daily: Vec<DailyRecord> = reader.read_records(daily_input)?;
        let normals: Vec<NormalRecord> = reader.read_records(normals_input)?;
        let mappings: Vec<StationMapping> = reader.read_records(mapping_input)?;
        info!(
            "Loaded {} daily rows, {} normals rows, {} station mappings",
            daily.len(),
            normals.len(),
            mappings.len()
        );

        let (combined, report) = self.merge(daily, mappings, normals)?;

        let headers = CombinedRecord::headers();
        CsvWriter::new().write_rows(&headers, combined.iter().map(|r| r.to_fields()), output)?;
        info!("Wrote {} combined rows to {}", combined.len(), output.display());

        let connections = self.connections(&combined);
        if let Some(path) = geojson {
            GeoJsonWriter::new().write(&connections.connections, path)?;
        }

        Ok((report, connections))
    }
}

impl Default for DataMerger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn daily(station: &str, date: &str, max_temp: f64) -> DailyRecord {
        DailyRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            dew_point: None,
            wind_gust: None,
            max_temp: Some(max_temp),
            min_temp: None,
            max_wind_speed: None,
            precipitation: None,
            avg_temp: None,
            wind_speed: None,
            elevation: None,
            station: station.to_string(),
            station_name: Some(format!("{} NAME", station)),
            longitude: Some(-118.0),
            latitude: Some(34.0),
            county: None,
            state_code: None,
            fog: None,
            rain_drizzle: None,
            snow_ice: None,
            hail: None,
            thunder: None,
            tornado_funnel: None,
        }
    }

    fn mapping(daily: &str, normal: &str) -> StationMapping {
        StationMapping {
            daily_station: daily.to_string(),
            daily_long: Some(-118.0),
            daily_lat: Some(34.0),
            daily_county: None,
            daily_station_name: None,
            normal_station: Some(normal.to_string()),
            normal_long: Some(-118.1),
            normal_lat: Some(34.1),
            normal_county: None,
            distance: Some(1200.0),
        }
    }

    fn normal(station: &str, date: &str, avg: f64) -> NormalRecord {
        NormalRecord {
            date: date.to_string(),
            avg_temp: Some(avg),
            avg_temp_std: None,
            max_temp: None,
            max_temp_std: None,
            min_temp: None,
            min_temp_std: None,
            mtd_prcp: None,
            mtd_snow: None,
            elevation: None,
            station: station.to_string(),
            longitude: Some(-118.1),
            latitude: Some(34.1),
            county: None,
            state_code: None,
        }
    }

    #[test]
    fn test_merge_joins_on_composite_key() {
        let daily_rows = vec![
            daily("A", "2019-01-01", 70.0),
            daily("A", "2019-01-02", 71.0),
            daily("B", "2019-01-01", 65.0),
        ];
        let mappings = vec![mapping("A", "N1")];
        let normals = vec![normal("N1", "01-01", 60.0)];

        let (combined, report) = DataMerger::new().merge(daily_rows, mappings, normals).unwrap();

        assert_eq!(report.daily_rows, 3);
        assert_eq!(report.combined_rows, 3);
        assert_eq!(report.rows_with_normals, 1);
        assert_eq!(report.unmapped_rows, 1);
        assert!(report.warnings.is_empty());

        assert_eq!(combined[0].composite_key.as_deref(), Some("N1-01-01"));
        assert_eq!(combined[0].normal.as_ref().unwrap().avg_temp, Some(60.0));
        assert_eq!(combined[1].composite_key.as_deref(), Some("N1-01-02"));
        assert!(combined[1].normal.is_none());
        assert!(combined[2].composite_key.is_none());
        assert_eq!(combined[2].month_day, "01-01");
    }

    #[test]
    fn test_duplicates_are_dropped_with_warnings() {
        let daily_rows = vec![
            daily("A", "2019-01-01", 70.0),
            daily("A", "2019-01-01", 99.0),
            daily("A", "2020-01-01", 72.0),
        ];
        let mappings = vec![mapping("A", "N1"), mapping("A", "N2")];
        let normals = vec![
            normal("N1", "01-01", 60.0),
            normal("N1", "01-01", 61.0),
            normal("N1", "01-02", 62.0),
        ];

        let (combined, report) = DataMerger::new().merge(daily_rows, mappings, normals).unwrap();

        assert_eq!(report.duplicate_mappings, 1);
        assert_eq!(report.duplicate_daily, 1);
        assert_eq!(report.duplicate_normals, 1);
        assert_eq!(report.duplicate_composite_keys, 0);
        // Same station and month-day in two different years
        assert_eq!(report.multiple_mappings, 1);
        assert_eq!(report.warnings.len(), 4);
        assert!(report.warnings[1].contains("1 duplicates found in daily data"));

        assert_eq!(combined.len(), 2);
        assert_eq!(combined[0].daily.max_temp, Some(70.0));
        assert_eq!(combined[0].normal.as_ref().unwrap().avg_temp, Some(60.0));
        assert_eq!(
            combined[0].mapping.as_ref().unwrap().normal_station.as_deref(),
            Some("N1")
        );
    }

    #[test]
    fn test_output_rows_match_deduplicated_daily_rows() {
        let daily_rows: Vec<DailyRecord> = (1..=28)
            .map(|d| daily("A", &format!("2019-02-{:02}", d), 50.0 + d as f64))
            .collect();
        let normals: Vec<NormalRecord> = (1..=28)
            .map(|d| normal("N1", &format!("02-{:02}", d), 40.0))
            .collect();

        let (combined, report) = DataMerger::new()
            .merge(daily_rows, vec![mapping("A", "N1")], normals)
            .unwrap();

        assert_eq!(combined.len(), report.daily_rows);
        assert!(combined.iter().all(|r| r.has_normal()));

        let keys: HashSet<_> = combined.iter().filter_map(|r| r.composite_key.clone()).collect();
        assert_eq!(keys.len(), combined.len());
    }

    #[test]
    fn test_run_writes_combined_csv() {
        let temp_dir = TempDir::new().unwrap();
        let daily_path = temp_dir.path().join("daily.csv");
        let normals_path = temp_dir.path().join("normals.csv");
        let mapping_path = temp_dir.path().join("mapping.csv");
        let output = temp_dir.path().join("Combined_Daily_Normals.csv");

        CsvWriter::new()
            .write_records(&[daily("72295023174", "2019-01-05", 61.0)], &daily_path)
            .unwrap();
        CsvWriter::new()
            .write_records(&[normal("USW00023174", "01-05", 58.2)], &normals_path)
            .unwrap();
        CsvWriter::new()
            .write_records(&[mapping("72295023174", "USW00023174")], &mapping_path)
            .unwrap();

        let (report, connections) = DataMerger::new()
            .run(&daily_path, &normals_path, &mapping_path, &output, None)
            .unwrap();
        assert_eq!(report.combined_rows, 1);
        assert_eq!(connections.unique_stations, 1);
        assert_eq!(connections.grouped_rows, 1);

        let table = CsvReader::new().read_table(&output).unwrap();
        assert_eq!(table.headers().len(), CombinedRecord::headers().len());
        let key = table.require_column("CompositeKey").unwrap();
        let avg = table.require_column("normalAvgTemp").unwrap();
        assert_eq!(table.value(0, key), "USW00023174-01-05");
        assert_eq!(table.value(0, avg), "58.2");
    }
}
