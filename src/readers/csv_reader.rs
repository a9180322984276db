use crate::error::{ProcessingError, Result};
use crate::models::Table;
use encoding_rs::WINDOWS_1252;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Reads stage outputs either into typed records or into a loosely-typed
/// [`Table`].
pub struct CsvReader {
    trim_headers: bool,
}

impl CsvReader {
    pub fn new() -> Self {
        Self {
            trim_headers: false,
        }
    }

    /// Strip surrounding whitespace from header names
    pub fn with_trim_headers(trim_headers: bool) -> Self {
        Self { trim_headers }
    }

    /// Deserialize every row of `path` into `T`, with the same UTF-8 /
    /// Windows-1252 decoding as [`CsvReader::read_table`]
    pub fn read_records<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        let records = self.read_records_from_bytes(&read_bytes(path)?)?;

        debug!("Read {} records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Deserialize records from an in-memory CSV, e.g. an archive member
    pub fn read_records_from_bytes<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<Vec<T>> {
        let text = decode_text(bytes);
        self.deserialize_from(text.as_bytes())
    }

    fn deserialize_from<T: DeserializeOwned, R: Read>(&self, source: R) -> Result<Vec<T>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(self.trim_mode())
            .from_reader(source);

        let mut records = Vec::new();
        for result in reader.deserialize() {
            records.push(result?);
        }
        Ok(records)
    }

    /// Read `path` into a [`Table`], decoding as UTF-8 and falling back to
    /// Windows-1252 when the bytes are not valid UTF-8
    pub fn read_table(&self, path: &Path) -> Result<Table> {
        let table = self.read_table_from_bytes(&read_bytes(path)?)?;

        debug!(
            "Read {} rows x {} columns from {}",
            table.len(),
            table.headers().len(),
            path.display()
        );
        Ok(table)
    }

    /// A zero-byte input is an empty table without columns.
    pub fn read_table_from_bytes(&self, bytes: &[u8]) -> Result<Table> {
        let text = decode_text(bytes);
        if text.trim().is_empty() {
            return Ok(Table::default());
        }
        let mut reader = csv::ReaderBuilder::new()
            .trim(self.trim_mode())
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        if headers.is_empty() {
            return Err(ProcessingError::InvalidFormat(
                "CSV file has no header row".to_string(),
            ));
        }

        let width = headers.len();
        let mut table = Table::new(headers);
        for result in reader.records() {
            let record = result?;
            let mut row: Vec<String> = record.iter().map(|f| f.to_string()).collect();
            // Short rows are padded, extra trailing fields are dropped
            row.resize(width, String::new());
            table.push_row(row)?;
        }

        Ok(table)
    }

    fn trim_mode(&self) -> csv::Trim {
        if self.trim_headers {
            csv::Trim::Headers
        } else {
            csv::Trim::None
        }
    }
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// UTF-8 if valid, otherwise Windows-1252.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (decoded, _, _) = WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StationLocation;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_records() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "STATION,COUNTY,STATE_CODE,Lat,Long").unwrap();
        writeln!(file, "72295023174,Los Angeles,06,33.938,-118.389").unwrap();
        writeln!(file, "72290023188.0,,,32.73,-117.17").unwrap();
        file.flush().unwrap();

        let reader = CsvReader::new();
        let stations: Vec<StationLocation> = reader.read_records(file.path()).unwrap();

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1].station, "72290023188");
        assert_eq!(stations[1].county, None);
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "Año" with a Windows-1252 encoded n-tilde
        let bytes = b"County,Crop Name\nA\xF1o,Grapes\n";
        let reader = CsvReader::new();
        let table = reader.read_table_from_bytes(bytes).unwrap();

        assert_eq!(table.value(0, 0), "A\u{f1}o");
        assert_eq!(table.value(0, 1), "Grapes");
    }

    #[test]
    fn test_trimmed_headers_and_padded_rows() {
        let bytes = b" Year , Value \n2019\n";
        let reader = CsvReader::with_trim_headers(true);
        let table = reader.read_table_from_bytes(bytes).unwrap();

        assert_eq!(table.headers(), &["Year".to_string(), "Value".to_string()][..]);
        assert_eq!(table.rows()[0], vec!["2019".to_string(), String::new()]);
    }

    #[test]
    fn test_typed_records_with_windows_1252_names() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"STATION,COUNTY,STATE_CODE,Lat,Long\n72206013889,Do\xF1a Ana,35,32.3,-106.8\n")
            .unwrap();
        file.flush().unwrap();

        let stations: Vec<StationLocation> = CsvReader::new().read_records(file.path()).unwrap();
        assert_eq!(stations[0].county.as_deref(), Some("Do\u{f1}a Ana"));
    }

    #[test]
    fn test_zero_byte_file_is_empty_table() {
        let file = NamedTempFile::new().unwrap();
        let reader = CsvReader::new();

        let table = reader.read_table(file.path()).unwrap();
        assert!(table.is_empty());
        assert!(table.headers().is_empty());

        let stations: Vec<StationLocation> = reader.read_records(file.path()).unwrap();
        assert!(stations.is_empty());
    }
}
