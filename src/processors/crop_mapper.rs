//! Crop raster conversion and point-to-county / point-to-station counting.

use crate::error::{ProcessingError, Result};
use crate::models::{
    County, CropCountyCount, CropPoint, CropStationCount, LegendEntry, NdviPoint, StationMapping,
};
use crate::processors::ParallelProcessor;
use crate::readers::{ArchiveExtractor, CountyLocator, CsvReader, GeoRaster, RasterReader};
use crate::utils::filename::DataLayout;
use crate::utils::na;
use crate::utils::nearest::NearestStationIndex;
use crate::utils::progress::ProgressReporter;
use crate::utils::projection::{utm_zone_for_median, Crs};
use crate::writers::{CsvWriter, FileInfo};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Which pixels become points, and what value column they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterMode {
    /// Non-zero crop codes, labelled through the legend
    Crop,
    /// Non-negative NDVI values
    Ndvi,
}

pub type Legend = HashMap<i64, Option<String>>;

pub fn read_legend(path: &Path) -> Result<Legend> {
    let entries: Vec<LegendEntry> = CsvReader::new().read_records(path)?;
    let mut legend = Legend::with_capacity(entries.len());
    for entry in entries {
        // first entry wins on duplicate codes
        legend.entry(entry.value).or_insert(entry.category);
    }
    Ok(legend)
}

/// Outcome of a multi-year loop: files written plus years skipped and why.
#[derive(Debug, Clone, Default)]
pub struct YearlyRunReport {
    pub written: Vec<FileInfo>,
    pub skipped: Vec<(i32, String)>,
}

impl YearlyRunReport {
    fn skip(&mut self, year: i32, reason: String, progress: &ProgressReporter) {
        warn!("{}", reason);
        progress.println(&reason);
        self.skipped.push((year, reason));
    }

    pub fn summary(&self) -> String {
        let rows: usize = self.written.iter().map(|f| f.total_rows).sum();
        let mut summary = format!(
            "Wrote {} files ({} rows), skipped {} years",
            self.written.len(),
            rows,
            self.skipped.len()
        );
        for info in &self.written {
            summary.push_str(&format!("\n  {}", info.path.display()));
        }
        summary
    }
}

/// GeoTIFF to lon/lat point CSV conversion.
pub struct RasterConverter {
    reader: RasterReader,
}

impl RasterConverter {
    pub fn new() -> Self {
        Self {
            reader: RasterReader::new(),
        }
    }

    pub fn crop_points(&self, raster: &GeoRaster, legend: &Legend, year: i32) -> Vec<CropPoint> {
        raster
            .points(|v| v != 0.0)
            .into_iter()
            .map(|(longitude, latitude, value)| CropPoint {
                longitude,
                latitude,
                crop_type: legend.get(&(value as i64)).cloned().flatten(),
                year,
            })
            .collect()
    }

    pub fn ndvi_points(&self, raster: &GeoRaster) -> Vec<NdviPoint> {
        raster
            .points(|v| v >= 0.0)
            .into_iter()
            .map(|(longitude, latitude, ndvi)| NdviPoint {
                longitude,
                latitude,
                ndvi,
            })
            .collect()
    }

    /// Convert one raster file. `legend` and `year` are required in crop mode.
    pub fn convert(
        &self,
        mode: RasterMode,
        input: &Path,
        output: &Path,
        legend: Option<&Legend>,
        year: Option<i32>,
    ) -> Result<FileInfo> {
        let source = self.reader.read(input)?;
        let raster = source.to_geographic_grid()?;
        info!(
            "Read {}x{} raster in {} from {}, resampled to {}x{} WGS84 cells",
            source.width,
            source.height,
            source.crs,
            input.display(),
            raster.width,
            raster.height
        );

        let writer = CsvWriter::new();
        match mode {
            RasterMode::Crop => {
                let (legend, year) = legend.zip(year).ok_or_else(|| {
                    ProcessingError::Config(
                        "crop conversion needs a legend and a year".to_string(),
                    )
                })?;
                writer.write_records(&self.crop_points(&raster, legend, year), output)
            }
            RasterMode::Ndvi => writer.write_records(&self.ndvi_points(&raster), output),
        }
    }

    /// Convert `{state}_{year}.tif` for every year of the range
    pub fn convert_crop_years(
        &self,
        layout: &DataLayout,
        legend: &Legend,
        years: &[i32],
        progress: &ProgressReporter,
    ) -> Result<YearlyRunReport> {
        let mut report = YearlyRunReport::default();
        for &year in years {
            progress.set_message(&year.to_string());
            let input = layout.crop_raster(year);
            if !input.exists() {
                report.skip(year, format!("File not found: {}", input.display()), progress);
                progress.increment(1);
                continue;
            }

            let output = layout.crop_points_dir().join(layout.crop_points_name(year));
            let info = self.convert(RasterMode::Crop, &input, &output, Some(legend), Some(year))?;
            report.written.push(info);
            progress.increment(1);
        }
        progress.finish_with_message("Rasters converted");
        Ok(report)
    }

    /// Convert `{state}_ndvi_week1_{year}.tif` for every year of the range
    pub fn convert_ndvi_years(
        &self,
        layout: &DataLayout,
        years: &[i32],
        progress: &ProgressReporter,
    ) -> Result<YearlyRunReport> {
        let mut report = YearlyRunReport::default();
        for &year in years {
            progress.set_message(&year.to_string());
            let input = layout.ndvi_raster(year);
            if input.exists() {
                let info = self.convert(RasterMode::Ndvi, &input, &layout.ndvi_points(year), None, None)?;
                report.written.push(info);
            } else {
                report.skip(year, format!("File not found: {}", input.display()), progress);
            }
            progress.increment(1);
        }
        progress.finish_with_message("NDVI rasters converted");
        Ok(report)
    }
}

impl Default for RasterConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Points of one year, or the reason the year has to be skipped.
pub type YearPoints = std::result::Result<Vec<CropPoint>, String>;

/// Load one year's crop points from the state archive. A missing or corrupt
/// archive, or a missing member, is a skip reason rather than an error.
pub fn load_crop_points(zip_path: &Path, member: &str) -> Result<YearPoints> {
    let members = match ArchiveExtractor::list_members(zip_path) {
        Ok(members) => members,
        Err(_) => {
            return Ok(Err(format!(
                "Zip file not found or is corrupted: {}",
                zip_path.display()
            )))
        }
    };
    let suffix = format!("/{}", member);
    if !members.iter().any(|m| m == member || m.ends_with(&suffix)) {
        return Ok(Err(format!("File not found in zip: {}", member)));
    }

    let bytes = ArchiveExtractor::read_member(zip_path, member)?;
    Ok(Ok(CsvReader::new().read_records_from_bytes(&bytes)?))
}

fn sort_key_f64(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

/// Counts crop points per county polygon.
pub struct CropCountyMapper {
    locator: CountyLocator,
    processor: ParallelProcessor,
}

impl CropCountyMapper {
    pub fn new(locator: CountyLocator, max_workers: usize) -> Self {
        Self {
            locator,
            processor: ParallelProcessor::new(max_workers),
        }
    }

    /// Group by county attributes, crop type and year. Points outside every
    /// county or without a crop type are dropped.
    pub fn count_by_county(&self, points: &[CropPoint]) -> Result<Vec<CropCountyCount>> {
        let located: Vec<Option<&County>> = self
            .processor
            .map_chunked(points, |p| self.locator.locate(p.longitude, p.latitude))?;

        let mut counts: HashMap<(usize, &str, i32), (&County, u64)> = HashMap::new();
        for (point, county) in points.iter().zip(located) {
            let (Some(county), Some(crop)) = (county, point.crop_type.as_deref()) else {
                continue;
            };
            counts
                .entry((county.index, crop, point.year))
                .or_insert((county, 0))
                .1 += 1;
        }

        let mut rows: Vec<CropCountyCount> = counts
            .into_iter()
            .map(|((_, crop, year), (county, count))| CropCountyCount {
                county: county.name.clone(),
                crop_type: crop.to_string(),
                year,
                state_fp: county.state_fp.clone(),
                county_fp: county.county_fp.clone(),
                geoid: county.geoid.clone(),
                aland: county.aland,
                awater: county.awater,
                count,
            })
            .collect();

        rows.sort_by(|a, b| {
            a.county
                .cmp(&b.county)
                .then_with(|| a.crop_type.cmp(&b.crop_type))
                .then_with(|| a.year.cmp(&b.year))
                .then_with(|| a.state_fp.cmp(&b.state_fp))
                .then_with(|| a.county_fp.cmp(&b.county_fp))
                .then_with(|| a.geoid.cmp(&b.geoid))
                .then_with(|| sort_key_f64(a.aland).total_cmp(&sort_key_f64(b.aland)))
                .then_with(|| sort_key_f64(a.awater).total_cmp(&sort_key_f64(b.awater)))
        });
        Ok(rows)
    }

    pub fn run(
        &self,
        layout: &DataLayout,
        years: &[i32],
        progress: &ProgressReporter,
    ) -> Result<YearlyRunReport> {
        let zip_path = layout.crop_archive();
        let mut report = YearlyRunReport::default();

        for &year in years {
            progress.set_message(&year.to_string());
            let member = layout.crop_points_name(year);
            let points = match load_crop_points(&zip_path, &member)? {
                Ok(points) => points,
                Err(reason) => {
                    report.skip(year, reason, progress);
                    progress.increment(1);
                    continue;
                }
            };

            let rows = self.count_by_county(&points)?;
            info!(
                "{}: {} points grouped into {} county rows",
                year,
                points.len(),
                rows.len()
            );
            let info = CsvWriter::new().write_records(&rows, &layout.crop_county_grouped(year))?;
            report.written.push(info);
            progress.increment(1);
        }

        progress.finish_with_message("County grouping complete");
        Ok(report)
    }
}

/// Station id and coordinates taken from the daily side of a mapping file.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyStationLocation {
    pub station: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

pub fn daily_station_locations(mappings: &[StationMapping]) -> Vec<DailyStationLocation> {
    let mut seen = HashSet::new();
    mappings
        .iter()
        .filter(|m| {
            seen.insert((
                m.daily_station.clone(),
                m.daily_long.map(f64::to_bits),
                m.daily_lat.map(f64::to_bits),
            ))
        })
        .map(|m| DailyStationLocation {
            station: m.daily_station.clone(),
            longitude: m.daily_long,
            latitude: m.daily_lat,
        })
        .collect()
}

/// Counts crop points per nearest daily weather station.
pub struct CropStationMapper {
    stations: Vec<DailyStationLocation>,
    index: NearestStationIndex,
    processor: ParallelProcessor,
}

impl CropStationMapper {
    /// Stations are projected into the UTM zone of their median longitude
    /// unless `utm_zone` is given.
    pub fn new(
        stations: Vec<DailyStationLocation>,
        utm_zone: Option<u8>,
        max_workers: usize,
    ) -> Result<Self> {
        let zone = match utm_zone {
            Some(zone) if (1..=60).contains(&zone) => zone,
            Some(zone) => {
                return Err(ProcessingError::Projection(format!(
                    "UTM zone {} is outside 1..=60",
                    zone
                )))
            }
            None => {
                let longitudes: Vec<f64> = stations.iter().filter_map(|s| s.longitude).collect();
                utm_zone_for_median(&longitudes)?
            }
        };
        let index = NearestStationIndex::new(
            Crs::Utm { zone },
            stations.iter().map(|s| {
                (
                    s.station.as_str(),
                    s.longitude.unwrap_or(f64::NAN),
                    s.latitude.unwrap_or(f64::NAN),
                )
            }),
        );
        if index.is_empty() {
            return Err(ProcessingError::MissingData(
                "no daily stations with coordinates in the station mapping".to_string(),
            ));
        }

        Ok(Self {
            stations,
            index,
            processor: ParallelProcessor::new(max_workers),
        })
    }

    pub fn from_mapping_file(path: &Path, utm_zone: Option<u8>, max_workers: usize) -> Result<Self> {
        let mappings: Vec<StationMapping> = CsvReader::new().read_records(path)?;
        Self::new(daily_station_locations(&mappings), utm_zone, max_workers)
    }

    pub fn crs(&self) -> Crs {
        self.index.crs()
    }

    pub fn count_by_station(&self, points: &[CropPoint]) -> Result<Vec<CropStationCount>> {
        let nearest: Vec<Option<usize>> = self.processor.map_chunked(points, |p| {
            self.index.nearest(p.longitude, p.latitude).map(|hit| hit.slot)
        })?;

        let mut counts: HashMap<(&str, &str, i32), u64> = HashMap::new();
        for (point, slot) in points.iter().zip(nearest) {
            let (Some(slot), Some(crop)) = (slot, point.crop_type.as_deref()) else {
                continue;
            };
            *counts
                .entry((self.stations[slot].station.as_str(), crop, point.year))
                .or_insert(0) += 1;
        }

        let mut rows: Vec<CropStationCount> = counts
            .into_iter()
            .map(|((station, crop, year), count)| CropStationCount {
                daily_station: station.to_string(),
                crop_type: crop.to_string(),
                year,
                count,
            })
            .collect();
        rows.sort_by(|a, b| {
            na::compare_ids(&a.daily_station, &b.daily_station)
                .then_with(|| a.crop_type.cmp(&b.crop_type))
                .then_with(|| a.year.cmp(&b.year))
        });
        Ok(rows)
    }

    pub fn run(
        &self,
        layout: &DataLayout,
        years: &[i32],
        progress: &ProgressReporter,
    ) -> Result<YearlyRunReport> {
        let zip_path = layout.crop_archive();
        let mut report = YearlyRunReport::default();
        info!("Matching crop points to {} stations in {}", self.stations.len(), self.crs());

        for &year in years {
            progress.set_message(&year.to_string());
            let member = layout.crop_points_name(year);
            let points = match load_crop_points(&zip_path, &member)? {
                Ok(points) => points,
                Err(reason) => {
                    report.skip(year, reason, progress);
                    progress.increment(1);
                    continue;
                }
            };

            let rows = self.count_by_station(&points)?;
            let output: PathBuf = layout.crop_station_grouped(year);
            report.written.push(CsvWriter::new().write_records(&rows, &output)?);
            progress.increment(1);
        }

        progress.finish_with_message("Station grouping complete");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::CropCountyCombiner;
    use crate::readers::GeoTransform;
    use geo::{MultiPolygon, Rect};
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn county(index: usize, name: &str, x0: f64, y0: f64) -> County {
        County::new(
            index,
            "12".to_string(),
            format!("{:03}", index),
            format!("12{:03}", index),
            name.to_string(),
            Some(1000.0),
            Some(10.0),
            MultiPolygon::new(vec![Rect::new((x0, y0), (x0 + 1.0, y0 + 1.0)).to_polygon()]),
        )
        .unwrap()
    }

    fn point(lon: f64, lat: f64, crop: Option<&str>) -> CropPoint {
        CropPoint {
            longitude: lon,
            latitude: lat,
            crop_type: crop.map(str::to_string),
            year: 2019,
        }
    }

    #[test]
    fn test_crop_and_ndvi_filters() {
        let raster = GeoRaster::new(
            2,
            2,
            GeoTransform::from_scale_and_tiepoint(&[1.0, 1.0], &[0.0, 0.0, 0.0, -82.0, 29.0, 0.0])
                .unwrap(),
            Crs::Geographic,
            vec![0.0, 1.0, 5.0, -0.2],
        )
        .unwrap();
        let legend: Legend = [(1, Some("Corn".to_string())), (5, None)].into_iter().collect();

        let converter = RasterConverter::new();
        let crops = converter.crop_points(&raster, &legend, 2020);
        assert_eq!(crops.len(), 3);
        assert_eq!(crops[0].crop_type.as_deref(), Some("Corn"));
        assert_eq!((crops[0].longitude, crops[0].latitude), (-80.5, 28.5));
        assert_eq!(crops[1].crop_type, None);
        assert_eq!(crops[0].year, 2020);

        let ndvi = converter.ndvi_points(&raster);
        assert_eq!(ndvi.len(), 3);
        assert_eq!(ndvi[0].ndvi, 0.0);
    }

    #[test]
    fn test_count_by_county() {
        let mapper = CropCountyMapper::new(
            CountyLocator::new(vec![county(0, "Alachua", -83.0, 29.0), county(1, "Baker", -82.0, 29.0)]),
            2,
        );
        let points = vec![
            point(-81.5, 29.5, Some("Corn")),
            point(-82.5, 29.5, Some("Corn")),
            point(-82.4, 29.4, Some("Corn")),
            point(-82.4, 29.4, Some("Cotton")),
            point(-82.4, 29.4, None),
            point(-70.0, 29.4, Some("Corn")),
        ];

        let rows = mapper.count_by_county(&points).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].county.as_str(), rows[0].crop_type.as_str(), rows[0].count), ("Alachua", "Corn", 2));
        assert_eq!((rows[1].county.as_str(), rows[1].crop_type.as_str(), rows[1].count), ("Alachua", "Cotton", 1));
        assert_eq!(rows[2].county, "Baker");
        assert_eq!(rows[2].geoid, "12001");
    }

    #[test]
    fn test_count_by_station() {
        let stations = vec![
            DailyStationLocation {
                station: "722050".to_string(),
                longitude: Some(-81.3),
                latitude: Some(28.4),
            },
            DailyStationLocation {
                station: "72201".to_string(),
                longitude: Some(-80.3),
                latitude: Some(25.8),
            },
        ];
        let mapper = CropStationMapper::new(stations, None, 2).unwrap();
        assert_eq!(mapper.crs(), Crs::Utm { zone: 17 });

        let points = vec![
            point(-81.2, 28.5, Some("Citrus")),
            point(-80.4, 25.9, Some("Citrus")),
            point(-80.4, 25.7, Some("Sugarcane")),
            point(-80.4, 25.7, None),
        ];
        let rows = mapper.count_by_station(&points).unwrap();
        assert_eq!(rows.len(), 3);
        // numeric id order
        assert_eq!(rows[0].daily_station, "72201");
        assert_eq!(rows[0].crop_type, "Citrus");
        assert_eq!(rows[2].daily_station, "722050");
    }

    #[test]
    fn test_run_skips_missing_years() {
        let temp_dir = TempDir::new().unwrap();
        let layout = DataLayout::new(temp_dir.path(), "Florida");

        let file = std::fs::File::create(layout.crop_archive()).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file(layout.crop_points_name(2019), FileOptions::default())
            .unwrap();
        zip.write_all(b"Longitude,Latitude,CropTypes,Year\n-82.5,29.5,Corn,2019\n-82.5,29.6,Corn,2019\n")
            .unwrap();
        zip.finish().unwrap();

        let mapper = CropCountyMapper::new(CountyLocator::new(vec![county(0, "Alachua", -83.0, 29.0)]), 1);
        let report = mapper
            .run(&layout, &[2018, 2019], &ProgressReporter::silent())
            .unwrap();

        assert_eq!(report.written.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].1.starts_with("File not found in zip"));

        let content = std::fs::read_to_string(layout.crop_county_grouped(2019)).unwrap();
        assert_eq!(
            content,
            "County,CropTypes,Year,STATEFP,COUNTYFP,GEOID,ALAND,AWATER,Count\nAlachua,Corn,2019,12,000,12000,1000.0,10.0,2\n"
        );
    }

    #[test]
    fn test_missing_archive_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_crop_points(&temp_dir.path().join("none.zip"), "x.csv").unwrap();
        assert!(result.unwrap_err().starts_with("Zip file not found or is corrupted"));
    }

    #[test]
    fn test_year_without_county_hits_still_combines() {
        let temp_dir = TempDir::new().unwrap();
        let layout = DataLayout::new(temp_dir.path(), "Florida");

        let file = std::fs::File::create(layout.crop_archive()).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file(layout.crop_points_name(2019), FileOptions::default())
            .unwrap();
        zip.write_all(b"Longitude,Latitude,CropTypes,Year\n-70.0,29.5,Corn,2019\n")
            .unwrap();
        zip.start_file(layout.crop_points_name(2020), FileOptions::default())
            .unwrap();
        zip.write_all(b"Longitude,Latitude,CropTypes,Year\n-82.5,29.5,Corn,2020\n")
            .unwrap();
        zip.finish().unwrap();

        let mapper = CropCountyMapper::new(CountyLocator::new(vec![county(0, "Alachua", -83.0, 29.0)]), 1);
        let report = mapper
            .run(&layout, &[2019, 2020], &ProgressReporter::silent())
            .unwrap();
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.written[0].total_rows, 0);
        assert_eq!(
            std::fs::read_to_string(layout.crop_county_grouped(2019)).unwrap(),
            "County,CropTypes,Year,STATEFP,COUNTYFP,GEOID,ALAND,AWATER,Count\n"
        );

        let output = layout.crops_county_ready();
        let combined = CropCountyCombiner::new()
            .run(&layout, &[2019, 2020], &output, &ProgressReporter::silent())
            .unwrap();
        assert_eq!(combined.found.len(), 2);
        assert_eq!(combined.rows, 1);

        let rows: Vec<CropCountyCount> = CsvReader::new().read_records(&output).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year, 2020);
    }
}
