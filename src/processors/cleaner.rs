use crate::error::{ProcessingError, Result};
use crate::models::{DailyRecord, ShapedDailyRecord, WeatherFlags};
use crate::readers::CsvReader;
use crate::utils::constants::{
    DAILY_DATE_FORMAT, PRECIP_PLACEHOLDER, TEMP_PLACEHOLDER, WIND_PLACEHOLDER,
};
use crate::utils::na::normalize_station_id;
use crate::writers::{CsvWriter, FileInfo};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info};

fn clear_placeholder(value: Option<f64>, placeholder: f64) -> Option<f64> {
    value.filter(|v| *v != placeholder)
}

/// Decode a GSOD FRSHTT code into its six indicator digits.
///
/// The code may have lost its leading zeros (and gained a `.0`) on the way
/// through a float column, so it is zero-padded back to six digits.
pub fn decode_weather_type(code: Option<&str>) -> Result<Option<WeatherFlags>> {
    let code = match code.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(code) => normalize_station_id(code),
    };

    if code.is_empty() || code.len() > 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ProcessingError::InvalidFormat(format!(
            "weather type code '{}' is not a six digit indicator",
            code
        )));
    }

    let padded = format!("{:0>6}", code);
    let mut digits = [0u8; 6];
    for (slot, byte) in digits.iter_mut().zip(padded.bytes()) {
        *slot = byte - b'0';
    }
    Ok(Some(WeatherFlags::from_digits(digits)))
}

#[derive(Debug, Clone)]
pub struct CleanReport {
    pub records: usize,
    pub with_weather_type: usize,
    pub with_conditions: usize,
    pub output: Option<FileInfo>,
}

impl CleanReport {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Cleaned {} daily records ({} with a weather type, {} reporting a condition)",
            self.records, self.with_weather_type, self.with_conditions
        );
        if let Some(output) = &self.output {
            summary.push('\n');
            summary.push_str(&output.summary());
        }
        summary
    }
}

/// Turns `{state}DailyReady.csv` into `{state}DailyCleaned.csv`.
pub struct DailyCleaner;

impl DailyCleaner {
    pub fn new() -> Self {
        Self
    }

    pub fn clean_record(&self, record: ShapedDailyRecord) -> Result<DailyRecord> {
        let date = NaiveDate::parse_from_str(record.date.trim(), DAILY_DATE_FORMAT)?;
        let flags = decode_weather_type(record.weather_type.as_deref())?;

        let mut cleaned = DailyRecord {
            date,
            dew_point: clear_placeholder(record.dew_point, TEMP_PLACEHOLDER),
            wind_gust: clear_placeholder(record.wind_gust, WIND_PLACEHOLDER),
            max_temp: clear_placeholder(record.max_temp, TEMP_PLACEHOLDER),
            min_temp: clear_placeholder(record.min_temp, TEMP_PLACEHOLDER),
            max_wind_speed: clear_placeholder(record.max_wind_speed, WIND_PLACEHOLDER),
            precipitation: clear_placeholder(record.precipitation, PRECIP_PLACEHOLDER),
            avg_temp: record.avg_temp,
            wind_speed: clear_placeholder(record.wind_speed, WIND_PLACEHOLDER),
            elevation: record.elevation,
            station: record.station,
            station_name: record.station_name,
            longitude: record.longitude,
            latitude: record.latitude,
            county: record.county,
            state_code: record.state_code,
            fog: None,
            rain_drizzle: None,
            snow_ice: None,
            hail: None,
            thunder: None,
            tornado_funnel: None,
        };
        cleaned.set_weather_flags(flags);
        Ok(cleaned)
    }

    pub fn clean(&self, records: Vec<ShapedDailyRecord>) -> Result<Vec<DailyRecord>> {
        records
            .into_iter()
            .map(|record| self.clean_record(record))
            .collect()
    }

    pub fn run(&self, input: &Path, output: &Path) -> Result<CleanReport> {
        let shaped: Vec<ShapedDailyRecord> = CsvReader::new().read_records(input)?;
        info!("Read {} shaped daily records from {}", shaped.len(), input.display());

        let with_weather_type = shaped.iter().filter(|r| r.weather_type.is_some()).count();
        let cleaned = self.clean(shaped)?;
        let with_conditions = cleaned
            .iter()
            .filter(|r| r.weather_flags().map_or(false, |f| f.any()))
            .count();
        debug!("{} records report at least one weather condition", with_conditions);

        let info = CsvWriter::new().write_records(&cleaned, output)?;
        Ok(CleanReport {
            records: cleaned.len(),
            with_weather_type,
            with_conditions,
            output: Some(info),
        })
    }
}

impl Default for DailyCleaner {
    fn default() -> Self {
        Self::new()
    }
}
