use std::path::{Path, PathBuf};

/// Default file locations for one state's pipeline run.
///
/// Every stage reads the previous stage's output from these paths unless the
/// CLI overrides them explicitly.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
    state: String,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>, state: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            state: state.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Raw_Daily_Data/{state}DailyRaw{range}.csv
    pub fn daily_raw_segment(&self, year_range: &str) -> PathBuf {
        self.root
            .join("Raw_Daily_Data")
            .join(format!("{}DailyRaw{}.csv", self.state, year_range))
    }

    /// Raw_Daily_Data/{state}DailyRaw.csv
    pub fn daily_raw(&self) -> PathBuf {
        self.root
            .join("Raw_Daily_Data")
            .join(format!("{}DailyRaw.csv", self.state))
    }

    pub fn daily_ready(&self) -> PathBuf {
        self.root
            .join("Clean_Daily_Data")
            .join(format!("{}DailyReady.csv", self.state))
    }

    pub fn daily_stations(&self) -> PathBuf {
        self.root
            .join("Clean_Daily_Data")
            .join(format!("{}StationsReady.csv", self.state))
    }

    pub fn daily_cleaned(&self) -> PathBuf {
        self.root
            .join("Clean_Daily_Data")
            .join(format!("{}DailyCleaned.csv", self.state))
    }

    pub fn normals_raw(&self) -> PathBuf {
        self.root
            .join("Raw_Normal_Data")
            .join(format!("{}NormalsRaw.csv", self.state))
    }

    pub fn normals_ready(&self) -> PathBuf {
        self.root
            .join("Clean_Normal_Data")
            .join(format!("{}NormalsReady.csv", self.state))
    }

    pub fn normals_stations(&self) -> PathBuf {
        self.root
            .join("Clean_Normal_Data")
            .join(format!("{}StationsReady.csv", self.state))
    }

    pub fn station_mapping(&self) -> PathBuf {
        self.root
            .join("Station_Mapping")
            .join(format!("{}_Station_Mapping.csv", self.state))
    }

    pub fn combined(&self) -> PathBuf {
        self.root.join("Main_Data").join("Combined_Daily_Normals.csv")
    }

    pub fn imputed(&self) -> PathBuf {
        self.root
            .join("Main_Data")
            .join("Imputed_Combined_Daily_Normals.csv")
    }

    /// {state}_{year}.tif
    pub fn crop_raster(&self, year: i32) -> PathBuf {
        self.root
            .join("Crop_Rasters")
            .join(format!("{}_{}.tif", self.state, year))
    }

    pub fn crop_points_dir(&self) -> PathBuf {
        self.root.join(format!("{}CropData", self.state))
    }

    /// Member name of one year's crop points inside `{state}Data.zip`
    pub fn crop_points_name(&self, year: i32) -> String {
        format!("{}TopCropLonLat_{}.csv", self.state, year)
    }

    pub fn crop_archive(&self) -> PathBuf {
        self.root.join(format!("{}Data.zip", self.state))
    }

    pub fn crop_output_dir(&self) -> PathBuf {
        self.root.join("Output_CSVs").join(&self.state)
    }

    pub fn crop_county_grouped(&self, year: i32) -> PathBuf {
        self.crop_output_dir().join(format!(
            "{}TopCropLonLat_{}_with_County_Grouped.csv",
            self.state, year
        ))
    }

    pub fn crop_station_grouped(&self, year: i32) -> PathBuf {
        self.crop_output_dir().join(format!(
            "{}TopCropLonLat_{}_GroupedByStation.csv",
            self.state, year
        ))
    }

    pub fn crops_county_ready(&self) -> PathBuf {
        self.crop_output_dir()
            .join(format!("{}CropsCountyReady.csv", self.state))
    }

    pub fn crop_report(&self, year: i32) -> PathBuf {
        self.root
            .join("Crop_Production_Data")
            .join(format!("Crop_Report_{}.csv", year))
    }

    pub fn crop_report_combined(&self, start_year: i32, end_year: i32) -> PathBuf {
        self.root
            .join("Crop_Production_Data")
            .join(format!("Crop_Report_{}_{}.csv", start_year, end_year))
    }

    pub fn ndvi_output_dir(&self) -> PathBuf {
        self.root.join(format!("{}NDVIData", self.state))
    }

    /// {state}_ndvi_week1_{year}.tif
    pub fn ndvi_raster(&self, year: i32) -> PathBuf {
        self.root
            .join(format!("{}_ndvi_week1_{}.tif", self.state, year))
    }

    pub fn ndvi_points(&self, year: i32) -> PathBuf {
        self.ndvi_output_dir()
            .join(format!("{}_NDVI_{}.csv", self.state, year))
    }

    pub fn crop_legend(&self) -> PathBuf {
        self.root.join("Legend.csv")
    }
}
