use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "agclimate-processor")]
#[command(about = "Weather, climate normals and crop raster pipeline for county-level agricultural research")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Only log warnings and hide progress bars")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Pipeline TOML file [default: agclimate.toml if present]")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "State of interest, e.g. Florida")]
    pub state: Option<String>,

    #[arg(long, global = true, help = "Root of the data directory")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    pub max_workers: Option<usize>,
}

/// Inclusive year range for the crop stages, defaulting to the configured one
#[derive(Args, Debug, Clone, Copy)]
pub struct YearRange {
    #[arg(long)]
    pub start_year: Option<i32>,

    #[arg(long)]
    pub end_year: Option<i32>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointMode {
    /// Non-zero crop codes joined with the legend
    Crop,
    /// Non-negative NDVI values
    Ndvi,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Concatenate the raw daily year-range segments
    CombineRaw {
        #[arg(long, value_delimiter = ',', help = "Segments such as 2010-2014,2015-2018")]
        year_ranges: Option<Vec<String>>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Select and rename daily columns and attach counties
    ShapeDaily {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(long, help = "County boundary shapefile")]
        shapefile: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        stations_output: Option<PathBuf>,
    },

    /// Select and rename normals columns and attach counties
    ShapeNormals {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(long, help = "County boundary shapefile")]
        shapefile: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        stations_output: Option<PathBuf>,
    },

    /// Replace placeholders and decode weather-condition codes
    CleanDaily {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Pair each daily station with its nearest normals station
    MapStations {
        #[arg(long)]
        daily: Option<PathBuf>,

        #[arg(long)]
        normals: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, help = "Also write station connections as GeoJSON")]
        geojson: Option<PathBuf>,

        #[arg(long, help = "Override the UTM zone used for matching")]
        utm_zone: Option<u8>,
    },

    /// Join daily records with their mapped normals
    Merge {
        #[arg(long)]
        daily: Option<PathBuf>,

        #[arg(long)]
        normals: Option<PathBuf>,

        #[arg(long)]
        mapping: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, help = "Also write station connections as GeoJSON")]
        geojson: Option<PathBuf>,
    },

    /// Fill gaps with a per-station centred rolling mean
    Impute {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, help = "Rolling window size in rows")]
        window: Option<usize>,
    },

    /// Convert GeoTIFF rasters into lon/lat point tables
    RasterToPoints {
        #[arg(short, long, value_enum, default_value = "crop")]
        mode: PointMode,

        #[arg(short, long, help = "Single raster; omit to loop over the year range")]
        input: Option<PathBuf>,

        #[arg(short, long, requires = "input")]
        output: Option<PathBuf>,

        #[arg(long, help = "Crop legend CSV (Value, Category)")]
        legend: Option<PathBuf>,

        #[arg(long, help = "Year stamped on single-file crop output")]
        year: Option<i32>,

        #[command(flatten)]
        years: YearRange,
    },

    /// Count crop points per county for each year
    CropCounty {
        #[arg(long, help = "County boundary shapefile")]
        shapefile: Option<PathBuf>,

        #[command(flatten)]
        years: YearRange,
    },

    /// Count crop points per nearest daily station for each year
    CropStation {
        #[arg(long)]
        mapping: Option<PathBuf>,

        #[arg(long, help = "Override the UTM zone used for matching")]
        utm_zone: Option<u8>,

        #[command(flatten)]
        years: YearRange,
    },

    /// Stack the yearly county crop counts
    CropCombine {
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        years: YearRange,
    },

    /// Standardise and stack the yearly crop production reports
    CropReport {
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        years: YearRange,
    },

    /// Download NDVI rasters from VegScape
    Vegscape {
        #[arg(long, help = "County FIPS code, e.g. 19015")]
        fips: String,

        #[arg(long, help = "GetFile date, e.g. 2012.07.09")]
        date: Option<String>,

        #[arg(long, help = "Weekly product name for a cached tile, e.g. weekly_ndvi_28")]
        weekly_ndvi: Option<String>,

        #[arg(long, requires = "weekly_ndvi", help = "Cached tile dates, e.g. 2012.07.09_2012.07.15")]
        date_range: Option<String>,

        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[arg(long, default_value = "60", help = "Request timeout in seconds")]
        timeout: u64,

        #[arg(long, help = "Skip TLS certificate verification")]
        insecure: bool,
    },
}
