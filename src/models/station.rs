use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::CsvRecord;
use crate::utils::na;

/// Unique station location with its county assignment
/// (`{state}StationsReady.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationLocation {
    #[serde(rename = "STATION", deserialize_with = "na::deserialize_station_id")]
    #[validate(length(min = 1))]
    pub station: String,

    #[serde(rename = "COUNTY", default, deserialize_with = "na::deserialize_string")]
    pub county: Option<String>,

    #[serde(rename = "STATE_CODE", default, deserialize_with = "na::deserialize_string")]
    pub state_code: Option<String>,

    #[serde(rename = "Lat", default, deserialize_with = "na::deserialize_f64")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[serde(rename = "Long", default, deserialize_with = "na::deserialize_f64")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

impl StationLocation {
    pub fn new(station: String, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        Self {
            station,
            county: None,
            state_code: None,
            latitude,
            longitude,
        }
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.longitude?, self.latitude?))
    }
}

impl CsvRecord for StationLocation {
    const HEADERS: &'static [&'static str] = &[
        "STATION",
        "COUNTY",
        "STATE_CODE",
        "Lat",
        "Long",
    ];
}
