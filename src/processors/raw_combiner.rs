use crate::error::{ProcessingError, Result};
use crate::models::Table;
use crate::readers::CsvReader;
use crate::utils::filename::DataLayout;
use crate::utils::progress::ProgressReporter;
use crate::writers::CsvWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct SegmentReport {
    pub files_read: Vec<PathBuf>,
    pub files_missing: Vec<PathBuf>,
    pub total_rows: usize,
    pub output: PathBuf,
}

impl SegmentReport {
    pub fn summary(&self) -> String {
        format!(
            "Combined {} of {} raw segments ({} rows) into {}",
            self.files_read.len(),
            self.files_read.len() + self.files_missing.len(),
            self.total_rows,
            self.output.display()
        )
    }
}

/// Concatenates the year-range segments of a state's raw daily export.
pub struct RawCombiner {
    year_ranges: Vec<String>,
}

impl RawCombiner {
    pub fn new(year_ranges: Vec<String>) -> Self {
        Self { year_ranges }
    }

    /// Read every `{state}DailyRaw{range}.csv` that exists, in range order
    pub fn combine_segments(
        &self,
        layout: &DataLayout,
        progress: &ProgressReporter,
    ) -> Result<(Table, SegmentReport)> {
        let reader = CsvReader::new();
        let mut combined: Option<Table> = None;
        let mut report = SegmentReport::default();

        for range in &self.year_ranges {
            let path = layout.daily_raw_segment(range);
            progress.set_message(range);

            if !path.exists() {
                warn!("File not found: {}", path.display());
                progress.println(&format!("File not found: {}", path.display()));
                report.files_missing.push(path);
                progress.increment(1);
                continue;
            }

            let table = reader.read_table(&path)?;
            info!("Read {} rows from {}", table.len(), path.display());
            match combined {
                Some(ref mut acc) => acc.append(table),
                None => combined = Some(table),
            }
            report.files_read.push(path);
            progress.increment(1);
        }

        let combined = combined.ok_or_else(|| {
            ProcessingError::MissingData(format!(
                "no raw daily files found for {} ({} ranges checked)",
                layout.state(),
                self.year_ranges.len()
            ))
        })?;
        report.total_rows = combined.len();

        Ok((combined, report))
    }

    pub fn run(
        &self,
        layout: &DataLayout,
        output: &Path,
        progress: &ProgressReporter,
    ) -> Result<SegmentReport> {
        let (combined, mut report) = self.combine_segments(layout, progress)?;

        CsvWriter::new().write_table(&combined, output)?;
        report.output = output.to_path_buf();

        progress.finish_with_message("Raw segments combined");
        Ok(report)
    }
}
