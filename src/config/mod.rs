//! Layered pipeline settings: built-in defaults, then an optional TOML file,
//! then `AGCLIMATE_*` environment variables. CLI flags are applied on top by
//! the caller before [`PipelineConfig::validated`].

use crate::error::Result;
use crate::utils::constants::{
    DEFAULT_COUNTY_SHAPEFILE, DEFAULT_CROP_END_YEAR, DEFAULT_CROP_START_YEAR,
    DEFAULT_IMPUTATION_WINDOW, DEFAULT_YEAR_RANGES,
};
use crate::utils::filename::DataLayout;
use ::config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

pub const DEFAULT_CONFIG_FILE: &str = "agclimate.toml";
pub const ENV_PREFIX: &str = "AGCLIMATE";

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[validate(schema(function = "validate_crop_years"))]
pub struct PipelineConfig {
    #[validate(length(min = 1))]
    pub state: String,
    pub data_dir: PathBuf,
    /// Raw daily export segments, e.g. `2010-2014`
    #[validate(length(min = 1))]
    pub year_ranges: Vec<String>,
    pub crop_start_year: i32,
    pub crop_end_year: i32,
    pub county_shapefile: PathBuf,
    #[validate(range(min = 1, max = 365))]
    pub imputation_window: usize,
    /// Forces the UTM zone used for nearest-station matching
    #[serde(default)]
    #[validate(range(min = 1, max = 60))]
    pub utm_zone: Option<u8>,
    #[validate(range(min = 1))]
    pub max_workers: usize,
}

fn validate_crop_years(config: &PipelineConfig) -> std::result::Result<(), ValidationError> {
    if config.crop_start_year > config.crop_end_year {
        return Err(ValidationError::new("crop_start_year_after_end_year"));
    }
    Ok(())
}

impl PipelineConfig {
    /// Load defaults, `path` (or `agclimate.toml` when present) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("state", "Florida")?
            .set_default("data_dir", "Data")?
            .set_default(
                "year_ranges",
                DEFAULT_YEAR_RANGES.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
            )?
            .set_default("crop_start_year", DEFAULT_CROP_START_YEAR as i64)?
            .set_default("crop_end_year", DEFAULT_CROP_END_YEAR as i64)?
            .set_default("county_shapefile", DEFAULT_COUNTY_SHAPEFILE)?
            .set_default("imputation_window", DEFAULT_IMPUTATION_WINDOW as i64)?
            .set_default("max_workers", num_cpus::get() as i64)?;

        builder = match path {
            Some(path) => builder.add_source(File::from(path).format(FileFormat::Toml)),
            None => builder.add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false)),
        };

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("year_ranges"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data_dir, &self.state)
    }

    pub fn crop_years(&self) -> Vec<i32> {
        (self.crop_start_year..=self.crop_end_year).collect()
    }

    /// Relative shapefile paths resolve under `data_dir`
    pub fn county_shapefile_path(&self) -> PathBuf {
        if self.county_shapefile.is_absolute() {
            self.county_shapefile.clone()
        } else {
            self.data_dir.join(&self.county_shapefile)
        }
    }
}
