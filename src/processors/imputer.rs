//! Rolling-mean gap filling of the combined daily/normals table.

use crate::analyzers::{comparison_summary, ImputationComparison, MissingReport, MissingValueAnalyzer};
use crate::error::{ProcessingError, Result};
use crate::models::Table;
use crate::processors::ParallelProcessor;
use crate::readers::CsvReader;
use crate::utils::constants::{DEFAULT_IMPUTATION_WINDOW, IMPUTED_COLUMNS, MISSING_REPORT_STATION_LIMIT};
use crate::utils::na;
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, FileInfo};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info, warn};

/// Columns with no use after the merge
pub const DROPPED_COLUMNS: [&str; 11] = [
    "STATION",
    "StationName",
    "Long",
    "Lat",
    "COUNTY",
    "STATION_norm",
    "Long_norm",
    "Lat_norm",
    "COUNTY_norm",
    "DATE",
    "WindGust",
];

const STATION_COLUMN: &str = "DailyStation";
const STATION_NAME_COLUMN: &str = "DailyStationName";
const DATE_COLUMN: &str = "Date";

/// Centred rolling mean fill.
///
/// A missing value at `i` becomes the mean of the present values in
/// `[i - window/2, i + (window-1)/2]`, clipped to the slice. Present values
/// are never changed, and a window with nothing present leaves the gap.
pub fn rolling_mean_fill(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    let before = window / 2;
    let after = (window - 1) / 2;

    // prefix sums over present values
    let mut sums = Vec::with_capacity(values.len() + 1);
    let mut counts = Vec::with_capacity(values.len() + 1);
    sums.push(0.0);
    counts.push(0usize);
    for v in values {
        sums.push(sums[sums.len() - 1] + v.unwrap_or(0.0));
        counts.push(counts[counts.len() - 1] + usize::from(v.is_some()));
    }

    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if v.is_some() {
                return *v;
            }
            let start = i.saturating_sub(before);
            let end = (i + after + 1).min(values.len());
            let n = counts[end] - counts[start];
            (n > 0).then(|| (sums[end] - sums[start]) / n as f64)
        })
        .collect()
}

/// Contiguous row ranges sharing a station id, skipping rows without one.
fn station_groups(table: &Table, station_col: usize) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    while start < table.len() {
        let station = table.value(start, station_col);
        let mut end = start + 1;
        while end < table.len() && table.value(end, station_col) == station {
            end += 1;
        }
        if !na::is_missing(station) {
            groups.push(start..end);
        }
        start = end;
    }
    groups
}

#[derive(Debug, Clone)]
pub struct ImputationReport {
    pub before: MissingReport,
    pub station_reports: Vec<MissingReport>,
    pub after_drop: MissingReport,
    pub after: MissingReport,
    pub comparisons: Vec<ImputationComparison>,
    pub stations: usize,
    pub rows_without_station: usize,
    pub output: Option<FileInfo>,
}

impl ImputationReport {
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&self.before.summary());
        for report in &self.station_reports {
            summary.push('\n');
            summary.push_str(&report.summary());
        }
        summary.push('\n');
        summary.push_str(&self.after_drop.summary());
        summary.push('\n');
        summary.push_str(&comparison_summary(&self.comparisons));
        summary.push('\n');
        summary.push_str(&self.after.summary());
        if let Some(output) = &self.output {
            summary.push('\n');
            summary.push_str(&output.summary());
        }
        summary
    }
}

pub struct Imputer {
    window: usize,
    columns: Vec<String>,
    processor: ParallelProcessor,
}

impl Imputer {
    pub fn new(window: usize, max_workers: usize) -> Self {
        Self {
            window,
            columns: IMPUTED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            processor: ParallelProcessor::new(max_workers),
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Sort by (DailyStation, Date) and fill gaps per station in place.
    pub fn impute_table(
        &self,
        table: &mut Table,
        progress: Option<&ProgressReporter>,
    ) -> Result<(Vec<ImputationComparison>, usize)> {
        if self.window == 0 {
            return Err(ProcessingError::Config(
                "imputation window must be at least 1".to_string(),
            ));
        }

        let station_col = table.require_column(STATION_COLUMN)?;
        let date_col = table.require_column(DATE_COLUMN)?;
        let columns: Vec<usize> = self
            .columns
            .iter()
            .map(|c| table.require_column(c))
            .collect::<Result<_>>()?;

        table.sort_rows_by(|a, b| {
            na::compare_ids(&a[station_col], &b[station_col])
                .then_with(|| a[date_col].cmp(&b[date_col]))
        });

        let groups = station_groups(table, station_col);
        debug!("Imputing {} stations with window {}", groups.len(), self.window);

        let originals: Vec<Vec<Option<f64>>> =
            columns.iter().map(|&c| table.numeric_column(c)).collect();

        let window = self.window;
        let filled_groups = self.processor.map(&groups, progress, |range| {
            originals
                .iter()
                .map(|values| rolling_mean_fill(&values[range.clone()], window))
                .collect::<Vec<_>>()
        })?;

        let mut after = originals.clone();
        for (range, filled) in groups.iter().zip(filled_groups) {
            for (column_values, group_values) in after.iter_mut().zip(filled) {
                column_values[range.clone()].copy_from_slice(&group_values);
            }
        }

        for ((&col, before), after) in columns.iter().zip(&originals).zip(&after) {
            for (row, (b, a)) in before.iter().zip(after).enumerate() {
                if let (None, Some(value)) = (b, a) {
                    table.set_value(row, col, format!("{:?}", value));
                }
            }
        }

        let comparisons = self
            .columns
            .iter()
            .zip(originals.iter().zip(&after))
            .map(|(name, (before, after))| ImputationComparison::new(name, before, after))
            .collect();

        Ok((comparisons, groups.len()))
    }

    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        progress: &ProgressReporter,
    ) -> Result<ImputationReport> {
        let mut table = CsvReader::new().read_table(input)?;
        info!("Read {} combined rows from {}", table.len(), input.display());

        let analyzer = MissingValueAnalyzer::new();
        let before = analyzer.analyze(&table, "Combined data");
        let station_reports = if table.column_index(STATION_NAME_COLUMN).is_some() {
            analyzer.analyze_by_station(&table, STATION_NAME_COLUMN, MISSING_REPORT_STATION_LIMIT)?
        } else {
            warn!("No {} column, skipping per-station reports", STATION_NAME_COLUMN);
            Vec::new()
        };

        table.drop_columns(&DROPPED_COLUMNS);
        let after_drop = analyzer.analyze(&table, "After column drop");

        let station_col = table.require_column(STATION_COLUMN)?;
        let rows_without_station = (0..table.len())
            .filter(|&r| na::is_missing(table.value(r, station_col)))
            .count();
        if rows_without_station > 0 {
            warn!(
                "{} rows have no {} and are left unimputed",
                rows_without_station, STATION_COLUMN
            );
        }

        let (comparisons, stations) = self.impute_table(&mut table, Some(progress))?;
        progress.finish_with_message("Imputation complete");
        let after = analyzer.analyze(&table, "After imputation");

        let info = CsvWriter::new().write_table(&table, output)?;
        Ok(ImputationReport {
            before,
            station_reports,
            after_drop,
            after,
            comparisons,
            stations,
            rows_without_station,
            output: Some(info),
        })
    }
}

impl Default for Imputer {
    fn default() -> Self {
        Self::new(DEFAULT_IMPUTATION_WINDOW, num_cpus::get())
    }
}
