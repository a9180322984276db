use crate::error::Result;
use crate::models::Table;
use crate::utils::na;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMissing {
    pub name: String,
    pub missing: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MissingReport {
    pub label: String,
    pub total_rows: usize,
    pub columns: Vec<ColumnMissing>,
    /// Rows where every column has a value
    pub complete_rows: usize,
}

impl MissingReport {
    pub fn column(&self, name: &str) -> Option<&ColumnMissing> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(|c| c.missing).sum()
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str(&format!("=== Missing Values: {} ===\n", self.label));
        summary.push_str(&format!("Total Rows: {}\n", self.total_rows));
        summary.push_str(&format!("Missing Values: {}\n", self.total_missing()));
        summary.push_str(&format!(
            "Complete Rows: {} ({:.1}%)\n",
            self.complete_rows,
            percent(self.complete_rows, self.total_rows)
        ));

        let width = self
            .columns
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0);
        for column in self.columns.iter().filter(|c| c.missing > 0) {
            summary.push_str(&format!(
                "  {:<width$}  {:>8}  ({:.1}%)\n",
                column.name,
                column.missing,
                column.percent,
                width = width
            ));
        }

        summary
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

/// Missing-value reports over loosely-typed tables.
pub struct MissingValueAnalyzer;

impl MissingValueAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, table: &Table, label: &str) -> MissingReport {
        let rows: Vec<usize> = (0..table.len()).collect();
        self.analyze_rows(table, &rows, label)
    }

    fn analyze_rows(&self, table: &Table, rows: &[usize], label: &str) -> MissingReport {
        let mut counts = vec![0usize; table.headers().len()];
        let mut complete_rows = 0;

        for &row in rows {
            let mut complete = true;
            for (col, count) in counts.iter_mut().enumerate() {
                if na::is_missing(table.value(row, col)) {
                    *count += 1;
                    complete = false;
                }
            }
            if complete {
                complete_rows += 1;
            }
        }

        let columns = table
            .headers()
            .iter()
            .zip(counts)
            .map(|(name, missing)| ColumnMissing {
                name: name.clone(),
                missing,
                percent: percent(missing, rows.len()),
            })
            .collect();

        MissingReport {
            label: label.to_string(),
            total_rows: rows.len(),
            columns,
            complete_rows,
        }
    }

    /// One report per distinct value of `station_column`, in first-appearance
    /// order, for at most `limit` stations. Rows with no station are skipped.
    pub fn analyze_by_station(
        &self,
        table: &Table,
        station_column: &str,
        limit: usize,
    ) -> Result<Vec<MissingReport>> {
        let col = table.require_column(station_column)?;

        let mut order: Vec<String> = Vec::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for row in 0..table.len() {
            let station = table.value(row, col);
            if na::is_missing(station) {
                continue;
            }
            match order.iter().position(|s| s == station) {
                Some(idx) => groups[idx].push(row),
                None if order.len() < limit => {
                    order.push(station.to_string());
                    groups.push(vec![row]);
                }
                None => {}
            }
        }

        Ok(order
            .iter()
            .zip(&groups)
            .map(|(station, rows)| self.analyze_rows(table, rows, station))
            .collect())
    }
}

impl Default for MissingValueAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
