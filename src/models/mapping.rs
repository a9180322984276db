use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::CsvRecord;
use crate::utils::na;

/// Daily station paired with its nearest climate-normals station
/// (`{state}_Station_Mapping.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationMapping {
    #[serde(rename = "DailyStation", deserialize_with = "na::deserialize_station_id")]
    pub daily_station: String,
    #[serde(rename = "DailyLong", default, deserialize_with = "na::deserialize_f64")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub daily_long: Option<f64>,
    #[serde(rename = "DailyLat", default, deserialize_with = "na::deserialize_f64")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub daily_lat: Option<f64>,
    #[serde(rename = "DailyCounty", default, deserialize_with = "na::deserialize_string")]
    pub daily_county: Option<String>,
    #[serde(rename = "DailyStationName", default, deserialize_with = "na::deserialize_string")]
    pub daily_station_name: Option<String>,
    #[serde(rename = "NormalStation", default, deserialize_with = "na::deserialize_string")]
    pub normal_station: Option<String>,
    #[serde(rename = "NormalLong", default, deserialize_with = "na::deserialize_f64")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub normal_long: Option<f64>,
    #[serde(rename = "NormalLat", default, deserialize_with = "na::deserialize_f64")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub normal_lat: Option<f64>,
    #[serde(rename = "NormalCounty", default, deserialize_with = "na::deserialize_string")]
    pub normal_county: Option<String>,
    /// Metres between the two stations in the projected CRS used for matching
    #[serde(rename = "Distance", default, deserialize_with = "na::deserialize_f64")]
    pub distance: Option<f64>,
}

impl StationMapping {
    pub fn daily_coordinates(&self) -> Option<(f64, f64)> {
        Some((self.daily_long?, self.daily_lat?))
    }

    pub fn normal_coordinates(&self) -> Option<(f64, f64)> {
        Some((self.normal_long?, self.normal_lat?))
    }

    pub fn is_matched(&self) -> bool {
        self.normal_station.is_some()
    }
}

impl CsvRecord for StationMapping {
    const HEADERS: &'static [&'static str] = &[
        "DailyStation",
        "DailyLong",
        "DailyLat",
        "DailyCounty",
        "DailyStationName",
        "NormalStation",
        "NormalLong",
        "NormalLat",
        "NormalCounty",
        "Distance",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_mapping_without_distance_column() {
        // Mapping files produced before the distance column existed
        let data = "DailyStation,DailyLong,DailyLat,DailyCounty,DailyStationName,NormalStation,NormalLong,NormalLat,NormalCounty\n\
                    72290023188.0,-117.17,32.73,San Diego,SAN DIEGO INTL,USW00023188,-117.18,32.73,San Diego\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let mapping: StationMapping = reader.deserialize().next().unwrap().unwrap();

        assert_eq!(mapping.daily_station, "72290023188");
        assert_eq!(mapping.normal_station.as_deref(), Some("USW00023188"));
        assert_eq!(mapping.distance, None);
        assert!(mapping.is_matched());
        assert!(mapping.validate().is_ok());
    }
}
