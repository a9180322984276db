//! Multi-year concatenation of the county crop counts and crop reports.

use crate::error::{ProcessingError, Result};
use crate::models::Table;
use crate::readers::CsvReader;
use crate::utils::filename::DataLayout;
use crate::utils::na;
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, FileInfo};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Columns coerced to numbers in the crop reports; unparseable cells become missing.
pub const REPORT_NUMERIC_COLUMNS: [&str; 8] = [
    "Year",
    "Commodity Code",
    "County Code",
    "Harvested Acres",
    "Yield",
    "Production",
    "Price P/U",
    "Value",
];

#[derive(Debug, Clone, Default)]
pub struct CombineReport {
    pub found: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
    pub rows: usize,
    /// `None` when no input file existed and nothing was written
    pub output: Option<FileInfo>,
}

impl CombineReport {
    pub fn summary(&self) -> String {
        match &self.output {
            Some(info) => format!(
                "Combined {} files ({} missing) into {} rows\n{}",
                self.found.len(),
                self.missing.len(),
                self.rows,
                info.summary()
            ),
            None => format!("No input files found ({} missing)", self.missing.len()),
        }
    }
}

/// Concatenate per-year tables by column name.
fn concat_years<F>(
    paths: Vec<PathBuf>,
    reader: &CsvReader,
    progress: &ProgressReporter,
    mut prepare: F,
) -> Result<(Option<Table>, CombineReport)>
where
    F: FnMut(&Path, Table) -> Result<Table>,
{
    let mut report = CombineReport::default();
    let mut combined: Option<Table> = None;

    for path in paths {
        if !path.exists() {
            let message = format!("File not found: {}", path.display());
            warn!("{}", message);
            progress.println(&message);
            report.missing.push(path);
            progress.increment(1);
            continue;
        }

        let table = prepare(&path, reader.read_table(&path)?)?;
        info!("Successfully processed file: {} ({} rows)", path.display(), table.len());
        match combined.as_mut() {
            Some(all) => all.append(table),
            None => combined = Some(table),
        }
        report.found.push(path);
        progress.increment(1);
    }

    report.rows = combined.as_ref().map_or(0, Table::len);
    Ok((combined, report))
}

fn write_combined(
    combined: Option<Table>,
    mut report: CombineReport,
    output: &Path,
    empty_message: &str,
) -> Result<CombineReport> {
    match combined {
        Some(table) => {
            let info = CsvWriter::new().write_table(&table, output)?;
            info!("Combined data saved to {}", output.display());
            report.output = Some(info);
        }
        None => warn!("{}", empty_message),
    }
    Ok(report)
}

/// Stacks the yearly `..._with_County_Grouped.csv` files.
pub struct CropCountyCombiner {
    reader: CsvReader,
}

impl CropCountyCombiner {
    pub fn new() -> Self {
        Self {
            reader: CsvReader::new(),
        }
    }

    pub fn run(
        &self,
        layout: &DataLayout,
        years: &[i32],
        output: &Path,
        progress: &ProgressReporter,
    ) -> Result<CombineReport> {
        let paths = years.iter().map(|&y| layout.crop_county_grouped(y)).collect();
        let (combined, report) = concat_years(paths, &self.reader, progress, |_, t| Ok(t))?;
        progress.finish_with_message("County files combined");
        write_combined(combined, report, output, "No combined data to save.")
    }
}

impl Default for CropCountyCombiner {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalises and stacks the yearly `Crop_Report_{year}.csv` files.
pub struct CropReportCombiner {
    reader: CsvReader,
    renames: Vec<(Regex, &'static str)>,
}

impl CropReportCombiner {
    pub fn new() -> Result<Self> {
        let renames = [
            ("Yield.*", "Yield"),
            ("Price.*", "Price P/U"),
            ("Value.*", "Value"),
        ]
        .into_iter()
        .map(|(pattern, name)| {
            Regex::new(pattern)
                .map(|re| (re, name))
                .map_err(|e| ProcessingError::Config(e.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            reader: CsvReader::with_trim_headers(true),
            renames,
        })
    }

    /// Header after trimming and the unit-suffix rewrites; the match may
    /// start anywhere in the name.
    pub fn standardize_header(&self, header: &str) -> String {
        self.renames
            .iter()
            .fold(header.trim().to_string(), |name, (re, replacement)| {
                re.replace_all(&name, *replacement).into_owned()
            })
    }

    pub fn standardize(&self, table: Table) -> Result<Table> {
        let (headers, mut rows) = table.into_parts();
        let headers: Vec<String> = headers.iter().map(|h| self.standardize_header(h)).collect();

        let numeric: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| REPORT_NUMERIC_COLUMNS.contains(&h.as_str()))
            .map(|(i, _)| i)
            .collect();
        for row in &mut rows {
            for &i in &numeric {
                let cell = row[i].trim();
                let coerced = match na::parse_f64(cell) {
                    Some(_) => cell.to_string(),
                    None => String::new(),
                };
                row[i] = coerced;
            }
        }

        Table::from_rows(headers, rows)
    }

    pub fn run(
        &self,
        layout: &DataLayout,
        years: &[i32],
        output: &Path,
        progress: &ProgressReporter,
    ) -> Result<CombineReport> {
        let paths = years.iter().map(|&y| layout.crop_report(y)).collect();
        let (combined, report) = concat_years(paths, &self.reader, progress, |path, table| {
            let table = self.standardize(table)?;
            info!("Column names for {}: {:?}", path.display(), table.headers());
            Ok(table)
        })?;
        progress.finish_with_message("Crop reports combined");
        write_combined(combined, report, output, "No crop report data to save.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_standardize_header() {
        let combiner = CropReportCombiner::new().unwrap();
        assert_eq!(combiner.standardize_header(" Yield (Unit/Acre) "), "Yield");
        assert_eq!(combiner.standardize_header("Price (Dollars/Unit)"), "Price P/U");
        assert_eq!(combiner.standardize_header("Value (Dollars)"), "Value");
        assert_eq!(combiner.standardize_header("Avg Yield per acre"), "Avg Yield");
        assert_eq!(combiner.standardize_header("County"), "County");
    }

    #[test]
    fn test_numeric_coercion() {
        let combiner = CropReportCombiner::new().unwrap();
        let table = Table::from_rows(
            vec!["Year".into(), "Crop Name".into(), "Value (Dollars)".into()],
            vec![
                vec!["2015".into(), "Oranges".into(), " 1200.5".into()],
                vec!["2015".into(), "Hay".into(), "(D)".into()],
            ],
        )
        .unwrap();

        let table = combiner.standardize(table).unwrap();
        assert_eq!(table.headers(), &["Year", "Crop Name", "Value"]);
        assert_eq!(table.value(0, 2), "1200.5");
        assert_eq!(table.value(1, 2), "");
        assert_eq!(table.value(1, 1), "Hay");
    }

    #[test]
    fn test_report_years_are_aligned_by_name() {
        let temp_dir = TempDir::new().unwrap();
        let layout = DataLayout::new(temp_dir.path(), "Florida");
        std::fs::create_dir_all(layout.crop_report(2010).parent().unwrap()).unwrap();
        std::fs::write(
            layout.crop_report(2010),
            "Year,County,Yield (Unit/Acre),Value (Dollars)\n2010,Polk,1.5,100\n",
        )
        .unwrap();
        std::fs::write(
            layout.crop_report(2011),
            "Year, County ,Value,Yield\n2011,Lake,200,x\n",
        )
        .unwrap();

        let output = layout.crop_report_combined(2010, 2012);
        let report = CropReportCombiner::new()
            .unwrap()
            .run(&layout, &[2010, 2011, 2012], &output, &ProgressReporter::silent())
            .unwrap();

        assert_eq!(report.found.len(), 2);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.rows, 2);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "Year,County,Yield,Value\n2010,Polk,1.5,100\n2011,Lake,,200\n"
        );
    }

    #[test]
    fn test_county_combine_without_inputs_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let layout = DataLayout::new(temp_dir.path(), "Florida");
        let output = layout.crops_county_ready();

        let report = CropCountyCombiner::new()
            .run(&layout, &[2010, 2011], &output, &ProgressReporter::silent())
            .unwrap();
        assert!(report.output.is_none());
        assert_eq!(report.missing.len(), 2);
        assert!(!output.exists());
    }

    #[test]
    fn test_county_combine_stacks_years() {
        let temp_dir = TempDir::new().unwrap();
        let layout = DataLayout::new(temp_dir.path(), "Florida");
        std::fs::create_dir_all(layout.crop_output_dir()).unwrap();
        let header = "County,CropTypes,Year,STATEFP,COUNTYFP,GEOID,ALAND,AWATER,Count\n";
        std::fs::write(
            layout.crop_county_grouped(2010),
            format!("{}Polk,Citrus,2010,12,105,12105,1.0,2.0,5\n", header),
        )
        .unwrap();
        std::fs::write(
            layout.crop_county_grouped(2012),
            format!("{}Lake,Citrus,2012,12,069,12069,1.0,2.0,7\n", header),
        )
        .unwrap();

        let output = layout.crops_county_ready();
        let report = CropCountyCombiner::new()
            .run(&layout, &[2010, 2011, 2012], &output, &ProgressReporter::silent())
            .unwrap();
        assert_eq!(report.rows, 2);
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.ends_with("Lake,Citrus,2012,12,069,12069,1.0,2.0,7\n"));
    }
}
