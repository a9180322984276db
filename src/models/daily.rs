use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::CsvRecord;
use crate::utils::na;

/// One row of a NOAA Global Summary of the Day export, restricted to the
/// columns the pipeline uses. Other columns in the file are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDailyRecord {
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
    #[serde(rename = "NAME", default, deserialize_with = "na::deserialize_string")]
    pub name: Option<String>,
    #[serde(rename = "TEMP", default, deserialize_with = "na::deserialize_f64")]
    pub temp: Option<f64>,
    #[serde(rename = "DEWP", default, deserialize_with = "na::deserialize_f64")]
    pub dewp: Option<f64>,
    #[serde(rename = "MAX", default, deserialize_with = "na::deserialize_f64")]
    pub max: Option<f64>,
    #[serde(rename = "MIN", default, deserialize_with = "na::deserialize_f64")]
    pub min: Option<f64>,
    #[serde(rename = "MXSPD", default, deserialize_with = "na::deserialize_f64")]
    pub mxspd: Option<f64>,
    #[serde(rename = "GUST", default, deserialize_with = "na::deserialize_f64")]
    pub gust: Option<f64>,
    #[serde(rename = "PRCP", default, deserialize_with = "na::deserialize_f64")]
    pub prcp: Option<f64>,
    #[serde(rename = "WDSP", default, deserialize_with = "na::deserialize_f64")]
    pub wdsp: Option<f64>,
    #[serde(rename = "FRSHTT", default, deserialize_with = "na::deserialize_string")]
    pub frshtt: Option<String>,
}

/// Daily record after renaming, sentinel replacement and county join
/// (`{state}DailyReady.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapedDailyRecord {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "DewPoint", default, deserialize_with = "na::deserialize_f64")]
    pub dew_point: Option<f64>,
    #[serde(rename = "WeatherType", default, deserialize_with = "na::deserialize_string")]
    pub weather_type: Option<String>,
    #[serde(rename = "WindGust", default, deserialize_with = "na::deserialize_f64")]
    pub wind_gust: Option<f64>,
    #[serde(rename = "MaxTemp", default, deserialize_with = "na::deserialize_f64")]
    pub max_temp: Option<f64>,
    #[serde(rename = "MinTemp", default, deserialize_with = "na::deserialize_f64")]
    pub min_temp: Option<f64>,
    #[serde(rename = "MaxWindSpeed", default, deserialize_with = "na::deserialize_f64")]
    pub max_wind_speed: Option<f64>,
    #[serde(rename = "Precipitation", default, deserialize_with = "na::deserialize_f64")]
    pub precipitation: Option<f64>,
    #[serde(rename = "AvgTemp", default, deserialize_with = "na::deserialize_f64")]
    pub avg_temp: Option<f64>,
    #[serde(rename = "WindSpeed", default, deserialize_with = "na::deserialize_f64")]
    pub wind_speed: Option<f64>,
    #[serde(rename = "Elevation", default, deserialize_with = "na::deserialize_f64")]
    pub elevation: Option<f64>,
    #[serde(rename = "STATION", deserialize_with = "na::deserialize_station_id")]
    pub station: String,
    #[serde(rename = "StationName", default, deserialize_with = "na::deserialize_string")]
    pub station_name: Option<String>,
    #[serde(rename = "Long", default, deserialize_with = "na::deserialize_f64")]
    pub longitude: Option<f64>,
    #[serde(rename = "Lat", default, deserialize_with = "na::deserialize_f64")]
    pub latitude: Option<f64>,
    #[serde(rename = "COUNTY", default, deserialize_with = "na::deserialize_string")]
    pub county: Option<String>,
    #[serde(rename = "STATE_CODE", default, deserialize_with = "na::deserialize_string")]
    pub state_code: Option<String>,
}

/// Decoded GSOD weather-condition indicators (FRSHTT digits).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeatherFlags {
    pub fog: u8,
    pub rain_drizzle: u8,
    pub snow_ice: u8,
    pub hail: u8,
    pub thunder: u8,
    pub tornado_funnel: u8,
}

impl WeatherFlags {
    pub fn from_digits(digits: [u8; 6]) -> Self {
        Self {
            fog: digits[0],
            rain_drizzle: digits[1],
            snow_ice: digits[2],
            hail: digits[3],
            thunder: digits[4],
            tornado_funnel: digits[5],
        }
    }

    pub fn any(&self) -> bool {
        self.fog + self.rain_drizzle + self.snow_ice + self.hail + self.thunder + self.tornado_funnel
            > 0
    }
}

/// Fully cleaned daily record (`{state}DailyCleaned.csv`). Missing values are
/// written as the literal `NA`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "DewPoint", with = "na::na_literal", default)]
    pub dew_point: Option<f64>,
    #[serde(rename = "WindGust", with = "na::na_literal", default)]
    pub wind_gust: Option<f64>,
    #[serde(rename = "MaxTemp", with = "na::na_literal", default)]
    pub max_temp: Option<f64>,
    #[serde(rename = "MinTemp", with = "na::na_literal", default)]
    pub min_temp: Option<f64>,
    #[serde(rename = "MaxWindSpeed", with = "na::na_literal", default)]
    pub max_wind_speed: Option<f64>,
    #[serde(rename = "Precipitation", with = "na::na_literal", default)]
    pub precipitation: Option<f64>,
    #[serde(rename = "AvgTemp", with = "na::na_literal", default)]
    pub avg_temp: Option<f64>,
    #[serde(rename = "WindSpeed", with = "na::na_literal", default)]
    pub wind_speed: Option<f64>,
    #[serde(rename = "Elevation", with = "na::na_literal", default)]
    pub elevation: Option<f64>,
    #[serde(rename = "STATION", deserialize_with = "na::deserialize_station_id")]
    pub station: String,
    #[serde(
        rename = "StationName",
        default,
        serialize_with = "na::na_literal::serialize",
        deserialize_with = "na::deserialize_string"
    )]
    pub station_name: Option<String>,
    #[serde(rename = "Long", with = "na::na_literal", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "Lat", with = "na::na_literal", default)]
    pub latitude: Option<f64>,
    #[serde(
        rename = "COUNTY",
        default,
        serialize_with = "na::na_literal::serialize",
        deserialize_with = "na::deserialize_string"
    )]
    pub county: Option<String>,
    #[serde(
        rename = "STATE_CODE",
        default,
        serialize_with = "na::na_literal::serialize",
        deserialize_with = "na::deserialize_string"
    )]
    pub state_code: Option<String>,
    #[serde(rename = "Fog", with = "na::na_literal_flag", default)]
    pub fog: Option<u8>,
    #[serde(rename = "Rain_Drizzle", with = "na::na_literal_flag", default)]
    pub rain_drizzle: Option<u8>,
    #[serde(rename = "Snow_Ice", with = "na::na_literal_flag", default)]
    pub snow_ice: Option<u8>,
    #[serde(rename = "Hail", with = "na::na_literal_flag", default)]
    pub hail: Option<u8>,
    #[serde(rename = "Thunder", with = "na::na_literal_flag", default)]
    pub thunder: Option<u8>,
    #[serde(rename = "Tornado_Funnel", with = "na::na_literal_flag", default)]
    pub tornado_funnel: Option<u8>,
}

impl DailyRecord {
    pub fn set_weather_flags(&mut self, flags: Option<WeatherFlags>) {
        self.fog = flags.map(|f| f.fog);
        self.rain_drizzle = flags.map(|f| f.rain_drizzle);
        self.snow_ice = flags.map(|f| f.snow_ice);
        self.hail = flags.map(|f| f.hail);
        self.thunder = flags.map(|f| f.thunder);
        self.tornado_funnel = flags.map(|f| f.tornado_funnel);
    }

    pub fn weather_flags(&self) -> Option<WeatherFlags> {
        Some(WeatherFlags {
            fog: self.fog?,
            rain_drizzle: self.rain_drizzle?,
            snow_ice: self.snow_ice?,
            hail: self.hail?,
            thunder: self.thunder?,
            tornado_funnel: self.tornado_funnel?,
        })
    }
}

impl CsvRecord for ShapedDailyRecord {
    const HEADERS: &'static [&'static str] = &[
        "Date",
        "DewPoint",
        "WeatherType",
        "WindGust",
        "MaxTemp",
        "MinTemp",
        "MaxWindSpeed",
        "Precipitation",
        "AvgTemp",
        "WindSpeed",
        "Elevation",
        "STATION",
        "StationName",
        "Long",
        "Lat",
        "COUNTY",
        "STATE_CODE",
    ];
}

impl CsvRecord for DailyRecord {
    const HEADERS: &'static [&'static str] = &[
        "Date",
        "DewPoint",
        "WindGust",
        "MaxTemp",
        "MinTemp",
        "MaxWindSpeed",
        "Precipitation",
        "AvgTemp",
        "WindSpeed",
        "Elevation",
        "STATION",
        "StationName",
        "Long",
        "Lat",
        "COUNTY",
        "STATE_CODE",
        "Fog",
        "Rain_Drizzle",
        "Snow_Ice",
        "Hail",
        "Thunder",
        "Tornado_Funnel",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_flags_roundtrip_on_record() {
        let mut record = DailyRecord {
            date: NaiveDate::from_ymd_opt(2020, 7, 4).unwrap(),
            dew_point: Some(70.1),
            wind_gust: None,
            max_temp: Some(91.0),
            min_temp: Some(75.0),
            max_wind_speed: None,
            precipitation: Some(0.0),
            avg_temp: Some(82.3),
            wind_speed: Some(5.2),
            elevation: Some(3.0),
            station: "72205012815".to_string(),
            station_name: Some("ORLANDO INTL".to_string()),
            longitude: Some(-81.325),
            latitude: Some(28.434),
            county: Some("Orange".to_string()),
            state_code: Some("12".to_string()),
            fog: None,
            rain_drizzle: None,
            snow_ice: None,
            hail: None,
            thunder: None,
            tornado_funnel: None,
        };

        assert!(record.weather_flags().is_none());

        let flags = WeatherFlags::from_digits([0, 1, 0, 0, 1, 0]);
        record.set_weather_flags(Some(flags));

        assert_eq!(record.weather_flags(), Some(flags));
        assert!(flags.any());
    }
}
