use crate::models::{DailyRecord, NormalRecord, StationMapping};

/// Daily record left-joined to its station mapping and matching normal
/// (`Combined_Daily_Normals.csv`).
///
/// Normals columns that collide with daily column names carry a `_norm`
/// suffix in the output.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRecord {
    pub daily: DailyRecord,
    pub month_day: String,
    pub mapping: Option<StationMapping>,
    pub composite_key: Option<String>,
    pub normal: Option<NormalRecord>,
}

const DAILY_COLUMNS: [&str; 22] = [
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

const MAPPING_COLUMNS: [&str; 10] = [
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

const NORMAL_COLUMNS: [&str; 15] = [
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
    "STATION_norm",
    "Long_norm",
    "Lat_norm",
    "COUNTY_norm",
    "STATE_CODE_norm",
];

fn num(value: Option<f64>) -> String {
    value.map(|v| format!("{:?}", v)).unwrap_or_default()
}

fn flag(value: Option<u8>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

impl CombinedRecord {
    pub fn headers() -> Vec<&'static str> {
        let mut headers = Vec::with_capacity(
            DAILY_COLUMNS.len() + MAPPING_COLUMNS.len() + NORMAL_COLUMNS.len() + 2,
        );
        headers.extend_from_slice(&DAILY_COLUMNS);
        headers.push("MonthDay");
        headers.extend_from_slice(&MAPPING_COLUMNS);
        headers.push("CompositeKey");
        headers.extend_from_slice(&NORMAL_COLUMNS);
        headers
    }

    pub fn to_fields(&self) -> Vec<String> {
        let d = &self.daily;
        let mut fields = vec![
            d.date.format("%Y-%m-%d").to_string(),
            num(d.dew_point),
            num(d.wind_gust),
            num(d.max_temp),
            num(d.min_temp),
            num(d.max_wind_speed),
            num(d.precipitation),
            num(d.avg_temp),
            num(d.wind_speed),
            num(d.elevation),
            d.station.clone(),
            text(&d.station_name),
            num(d.longitude),
            num(d.latitude),
            text(&d.county),
            text(&d.state_code),
            flag(d.fog),
            flag(d.rain_drizzle),
            flag(d.snow_ice),
            flag(d.hail),
            flag(d.thunder),
            flag(d.tornado_funnel),
            self.month_day.clone(),
        ];

        match &self.mapping {
            Some(m) => fields.extend([
                m.daily_station.clone(),
                num(m.daily_long),
                num(m.daily_lat),
                text(&m.daily_county),
                text(&m.daily_station_name),
                text(&m.normal_station),
                num(m.normal_long),
                num(m.normal_lat),
                text(&m.normal_county),
                num(m.distance),
            ]),
            None => fields.extend(std::iter::repeat(String::new()).take(MAPPING_COLUMNS.len())),
        }

        fields.push(text(&self.composite_key));

        match &self.normal {
            Some(n) => fields.extend([
                n.date.clone(),
                num(n.avg_temp),
                num(n.avg_temp_std),
                num(n.max_temp),
                num(n.max_temp_std),
                num(n.min_temp),
                num(n.min_temp_std),
                num(n.mtd_prcp),
                num(n.mtd_snow),
                num(n.elevation),
                n.station.clone(),
                num(n.longitude),
                num(n.latitude),
                text(&n.county),
                text(&n.state_code),
            ]),
            None => fields.extend(std::iter::repeat(String::new()).take(NORMAL_COLUMNS.len())),
        }

        fields
    }

    pub fn has_normal(&self) -> bool {
        self.normal.is_some()
    }
}
