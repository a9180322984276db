/// Generic missing-value sentinel used by NOAA CSV exports
pub const MISSING_SENTINEL: f64 = -9999.0;

/// GSOD per-column missing-value placeholders
pub const TEMP_PLACEHOLDER: f64 = 9999.9;
pub const WIND_PLACEHOLDER: f64 = 999.9;
pub const PRECIP_PLACEHOLDER: f64 = 99.99;

/// Date formats
pub const DAILY_DATE_FORMAT: &str = "%Y-%m-%d";
pub const MONTH_DAY_FORMAT: &str = "%m-%d";

/// Imputation defaults
pub const DEFAULT_IMPUTATION_WINDOW: usize = 6;
pub const IMPUTED_COLUMNS: [&str; 6] = [
    "MaxTemp",
    "MinTemp",
    "MaxWindSpeed",
    "WindSpeed",
    "Precipitation",
    "DewPoint",
];
pub const MISSING_REPORT_STATION_LIMIT: usize = 10;

/// Crop tooling defaults
pub const DEFAULT_CROP_START_YEAR: i32 = 2010;
pub const DEFAULT_CROP_END_YEAR: i32 = 2020;

/// Default raw daily year segments
pub const DEFAULT_YEAR_RANGES: [&str; 3] = ["2010-2014", "2015-2018", "2019-2020"];

/// Default county boundaries (TIGER/Line 2019)
pub const DEFAULT_COUNTY_SHAPEFILE: &str = "Shape_Files/tl_2019_us_county.shp";

/// Composite key separator between station id and month-day
pub const COMPOSITE_KEY_SEPARATOR: &str = "-";

/// Processing defaults
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

/// VegScape service endpoints
pub const VEGSCAPE_GETFILE_URL: &str = "https://nassgeodata.gmu.edu/VegService/GetFile";
pub const VEGSCAPE_NDVI_CACHE_URL: &str = "https://nassgeo.csiss.gmu.edu/ndvi_data_cache/byfips";
