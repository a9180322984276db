use crate::error::Result;
use crate::models::{CsvRecord, Table};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes stage outputs as comma-separated files, creating parent
/// directories as needed.
pub struct CsvWriter {
    buffer_size: usize,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    fn open(&self, path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::with_capacity(self.buffer_size, file)))
    }

    /// Serialize typed records under `T::HEADERS`; an empty slice still
    /// writes the header row.
    pub fn write_records<T: CsvRecord>(&self, records: &[T], path: &Path) -> Result<FileInfo> {
        let mut writer = self.open(path)?;
        writer.write_record(T::HEADERS)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        let info = FileInfo::from_path(path, records.len())?;
        info!("Wrote {} rows to {}", records.len(), path.display());
        Ok(info)
    }

    pub fn write_table(&self, table: &Table, path: &Path) -> Result<FileInfo> {
        self.write_rows(table.headers(), table.rows().iter().cloned(), path)
    }

    pub fn write_rows<H, I>(&self, headers: &[H], rows: I, path: &Path) -> Result<FileInfo>
    where
        H: AsRef<str>,
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut writer = self.open(path)?;
        writer.write_record(headers.iter().map(|h| h.as_ref()))?;

        let mut count = 0usize;
        for row in rows {
            writer.write_record(&row)?;
            count += 1;
        }
        writer.flush()?;

        let info = FileInfo::from_path(path, count)?;
        info!("Wrote {} rows to {}", count, path.display());
        Ok(info)
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub total_rows: usize,
    pub file_size: u64,
}

impl FileInfo {
    fn from_path(path: &Path, total_rows: usize) -> Result<Self> {
        let file_size = std::fs::metadata(path)?.len();
        Ok(Self {
            path: path.to_path_buf(),
            total_rows,
            file_size,
        })
    }

    pub fn summary(&self) -> String {
        format!(
            "CSV File Summary:\n\
            - Path: {}\n\
            - Total rows: {}\n\
            - File size: {:.2} MB",
            self.path.display(),
            self.total_rows,
            self.file_size as f64 / 1_048_576.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CropCountyCount, CropPoint, CropStationCount, NdviPoint, StationLocation, StationMapping};
    use crate::readers::CsvReader;
    use tempfile::TempDir;

    #[test]
    fn test_write_records_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Output_CSVs").join("grouped.csv");

        let rows = vec![CropStationCount {
            daily_station: "72295023174".to_string(),
            crop_type: "Almonds".to_string(),
            year: 2019,
            count: 12,
        }];

        let info = CsvWriter::new().write_records(&rows, &path).unwrap();
        assert_eq!(info.total_rows, 1);
        assert!(info.file_size > 0);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "DailyStation,CropTypes,Year,Count\n72295023174,Almonds,2019,12\n"
        );
    }

    #[test]
    fn test_empty_records_keep_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("grouped.csv");

        let info = CsvWriter::new()
            .write_records::<CropCountyCount>(&[], &path)
            .unwrap();
        assert_eq!(info.total_rows, 0);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "County,CropTypes,Year,STATEFP,COUNTYFP,GEOID,ALAND,AWATER,Count\n"
        );

        let table = CsvReader::new().read_table(&path).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers().len(), 9);
    }

    #[test]
    fn test_headers_match_serialized_fields() {
        fn serialized_header<T: serde::Serialize>(record: &T) -> String {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.serialize(record).unwrap();
            let bytes = writer.into_inner().unwrap();
            String::from_utf8(bytes).unwrap().lines().next().unwrap().to_string()
        }

        let mapping = StationMapping {
            daily_station: "72205012815".to_string(),
            daily_long: Some(-81.325),
            daily_lat: Some(28.434),
            daily_county: None,
            daily_station_name: None,
            normal_station: None,
            normal_long: None,
            normal_lat: None,
            normal_county: None,
            distance: None,
        };
        assert_eq!(serialized_header(&mapping), StationMapping::HEADERS.join(","));

        let station = StationLocation::new("72205012815".to_string(), Some(28.434), Some(-81.325));
        assert_eq!(serialized_header(&station), StationLocation::HEADERS.join(","));

        let point = CropPoint {
            longitude: -121.5,
            latitude: 38.2,
            crop_type: Some("Almonds".to_string()),
            year: 2019,
        };
        assert_eq!(serialized_header(&point), CropPoint::HEADERS.join(","));

        let ndvi = NdviPoint {
            longitude: -93.7,
            latitude: 42.0,
            ndvi: 0.61,
        };
        assert_eq!(serialized_header(&ndvi), NdviPoint::HEADERS.join(","));
    }

    #[test]
    fn test_write_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("table.csv");
        let table = Table::from_rows(
            vec!["A".to_string(), "B".to_string()],
            vec![vec!["1".to_string(), String::new()]],
        )
        .unwrap();

        let info = CsvWriter::new().write_table(&table, &path).unwrap();
        assert_eq!(info.total_rows, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A,B\n1,\n");
        assert!(info.summary().contains("Total rows: 1"));
    }
}
