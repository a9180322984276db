use serde::{Deserialize, Serialize};

use crate::utils::constants::COMPOSITE_KEY_SEPARATOR;
use crate::models::CsvRecord;
use crate::utils::na;

/// One row of the NOAA 1991-2020 daily climate normals export.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNormalRecord {
    #[serde(rename = "STATION", deserialize_with = "na::deserialize_station_id")]
    pub station: String,
    #[serde(rename = "DATE")]
    pub date: String,
    #[serde(rename = "LATITUDE", default, deserialize_with = "na::deserialize_f64")]
    pub latitude: Option<f64>,
    #[serde(rename = "LONGITUDE", default, deserialize_with = "na::deserialize_f64")]
    pub longitude: Option<f64>,
    #[serde(rename = "ELEVATION", default, deserialize_with = "na::deserialize_f64")]
    pub elevation: Option<f64>,
    #[serde(rename = "DLY-TAVG-NORMAL", default, deserialize_with = "na::deserialize_f64")]
    pub tavg_normal: Option<f64>,
    #[serde(rename = "DLY-TAVG-STDDEV", default, deserialize_with = "na::deserialize_f64")]
    pub tavg_stddev: Option<f64>,
    #[serde(rename = "DLY-TMAX-NORMAL", default, deserialize_with = "na::deserialize_f64")]
    pub tmax_normal: Option<f64>,
    #[serde(rename = "DLY-TMAX-STDDEV", default, deserialize_with = "na::deserialize_f64")]
    pub tmax_stddev: Option<f64>,
    #[serde(rename = "DLY-TMIN-NORMAL", default, deserialize_with = "na::deserialize_f64")]
    pub tmin_normal: Option<f64>,
    #[serde(rename = "DLY-TMIN-STDDEV", default, deserialize_with = "na::deserialize_f64")]
    pub tmin_stddev: Option<f64>,
    #[serde(rename = "MTD-PRCP-NORMAL", default, deserialize_with = "na::deserialize_f64")]
    pub mtd_prcp_normal: Option<f64>,
    #[serde(rename = "MTD-SNOW-NORMAL", default, deserialize_with = "na::deserialize_f64")]
    pub mtd_snow_normal: Option<f64>,
}

/// Climate normal for one station and month-day (`{state}NormalsReady.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalRecord {
    /// Month-day, e.g. `07-04`
    #[serde(rename = "DATE")]
    pub date: String,
    #[serde(rename = "normalAvgTemp", default, deserialize_with = "na::deserialize_f64")]
    pub avg_temp: Option<f64>,
    #[serde(rename = "normalAvgTempStd", default, deserialize_with = "na::deserialize_f64")]
    pub avg_temp_std: Option<f64>,
    #[serde(rename = "normalMaxTemp", default, deserialize_with = "na::deserialize_f64")]
    pub max_temp: Option<f64>,
    #[serde(rename = "normalMaxTempStd", default, deserialize_with = "na::deserialize_f64")]
    pub max_temp_std: Option<f64>,
    #[serde(rename = "normalMinTemp", default, deserialize_with = "na::deserialize_f64")]
    pub min_temp: Option<f64>,
    #[serde(rename = "normalMinTempStd", default, deserialize_with = "na::deserialize_f64")]
    pub min_temp_std: Option<f64>,
    #[serde(rename = "normalMtdPrcp", default, deserialize_with = "na::deserialize_f64")]
    pub mtd_prcp: Option<f64>,
    #[serde(rename = "normalMtdSnow", default, deserialize_with = "na::deserialize_f64")]
    pub mtd_snow: Option<f64>,
    #[serde(rename = "ELEVATION", default, deserialize_with = "na::deserialize_f64")]
    pub elevation: Option<f64>,
    #[serde(rename = "STATION", deserialize_with = "na::deserialize_station_id")]
    pub station: String,
    #[serde(rename = "Long", default, deserialize_with = "na::deserialize_f64")]
    pub longitude: Option<f64>,
    #[serde(rename = "Lat", default, deserialize_with = "na::deserialize_f64")]
    pub latitude: Option<f64>,
    #[serde(rename = "COUNTY", default, deserialize_with = "na::deserialize_string")]
    pub county: Option<String>,
    #[serde(rename = "STATE_CODE", default, deserialize_with = "na::deserialize_string")]
    pub state_code: Option<String>,
}

impl NormalRecord {
    /// `STATION-MM-DD`, the join key against daily records
    pub fn composite_key(&self) -> String {
        composite_key(&self.station, &self.date)
    }
}

pub fn composite_key(station: &str, month_day: &str) -> String {
    format!("{}{}{}", station, COMPOSITE_KEY_SEPARATOR, month_day)
}

impl CsvRecord for NormalRecord {
    const HEADERS: &'static [&'static str] = &[
        "DATE",
        "normalAvgTemp",
        "normalAvgTempStd",
        "normalMaxTemp",
        "normalMaxTempStd",
        "normalMinTemp",
        "normalMinTempStd",
        "normalMtdPrcp",
        "normalMtdSnow",
        "ELEVATION",
        "STATION",
        "Long",
        "Lat",
        "COUNTY",
        "STATE_CODE",
    ];
}
