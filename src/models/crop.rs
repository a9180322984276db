use serde::{Deserialize, Serialize};

use crate::models::CsvRecord;
use crate::utils::na;

/// Crop-type raster legend row (`Value`, `Category`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegendEntry {
    #[serde(rename = "Value")]
    pub value: i64,
    #[serde(rename = "Category", default, deserialize_with = "na::deserialize_string")]
    pub category: Option<String>,
}

/// One crop-raster pixel centre in WGS84 (`{state}TopCropLonLat_{year}.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropPoint {
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    /// Legend category; missing when the pixel value has no legend entry
    #[serde(rename = "CropTypes", default, deserialize_with = "na::deserialize_string")]
    pub crop_type: Option<String>,
    #[serde(rename = "Year")]
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdviPoint {
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "NDVI")]
    pub ndvi: f64,
}

/// Crop points counted per county and crop type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropCountyCount {
    #[serde(rename = "County")]
    pub county: String,
    #[serde(rename = "CropTypes")]
    pub crop_type: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "STATEFP")]
    pub state_fp: String,
    #[serde(rename = "COUNTYFP")]
    pub county_fp: String,
    #[serde(rename = "GEOID")]
    pub geoid: String,
    #[serde(rename = "ALAND", default, deserialize_with = "na::deserialize_f64")]
    pub aland: Option<f64>,
    #[serde(rename = "AWATER", default, deserialize_with = "na::deserialize_f64")]
    pub awater: Option<f64>,
    #[serde(rename = "Count")]
    pub count: u64,
}

/// Crop points counted per nearest daily station and crop type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropStationCount {
    #[serde(rename = "DailyStation")]
    pub daily_station: String,
    #[serde(rename = "CropTypes")]
    pub crop_type: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Count")]
    pub count: u64,
}

impl CsvRecord for CropPoint {
    const HEADERS: &'static [&'static str] = &[
        "Longitude",
        "Latitude",
        "CropTypes",
        "Year",
    ];
}

impl CsvRecord for NdviPoint {
    const HEADERS: &'static [&'static str] = &[
        "Longitude",
        "Latitude",
        "NDVI",
    ];
}

impl CsvRecord for CropCountyCount {
    const HEADERS: &'static [&'static str] = &[
        "County",
        "CropTypes",
        "Year",
        "STATEFP",
        "COUNTYFP",
        "GEOID",
        "ALAND",
        "AWATER",
        "Count",
    ];
}

impl CsvRecord for CropStationCount {
    const HEADERS: &'static [&'static str] = &[
        "DailyStation",
        "CropTypes",
        "Year",
        "Count",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_crop_points_with_unknown_category() {
        let data = "Longitude,Latitude,CropTypes,Year\n\
                    -121.5,38.2,Almonds,2019\n\
                    -121.6,38.3,,2019\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let points: Vec<CropPoint> = reader.deserialize().collect::<Result<_, _>>().unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].crop_type.as_deref(), Some("Almonds"));
        assert_eq!(points[1].crop_type, None);
    }
}
