//! Loosely-typed CSV table for stages that operate on whatever columns an
//! upstream file happens to carry (concatenation, column drops, imputation).

use crate::error::{ProcessingError, Result};
use crate::utils::na;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ProcessingError::MissingData(format!("column '{}' not found", name)))
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(ProcessingError::InvalidFormat(format!(
                "row has {} fields, expected {}",
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn value(&self, row: usize, column: usize) -> &str {
        &self.rows[row][column]
    }

    pub fn set_value(&mut self, row: usize, column: usize, value: String) {
        self.rows[row][column] = value;
    }

    /// Column values parsed as optional floats; unparseable text is missing
    pub fn numeric_column(&self, column: usize) -> Vec<Option<f64>> {
        self.rows.iter().map(|row| na::parse_f64(&row[column])).collect()
    }

    /// Drop the named columns; names not present are ignored
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<usize> = (0..self.headers.len())
            .filter(|&i| !names.contains(&self.headers[i].as_str()))
            .collect();
        if keep.len() == self.headers.len() {
            return;
        }

        self.headers = keep.iter().map(|&i| self.headers[i].clone()).collect();
        for row in &mut self.rows {
            *row = keep.iter().map(|&i| std::mem::take(&mut row[i])).collect();
        }
    }

    /// Append another table, aligning columns by name.
    ///
    /// The result's header is the union of both headers in first-seen order;
    /// cells for columns a table lacks are left empty.
    pub fn append(&mut self, other: Table) {
        let mut positions = Vec::with_capacity(other.headers.len());
        for header in &other.headers {
            let idx = match self.column_index(header) {
                Some(idx) => idx,
                None => {
                    self.headers.push(header.clone());
                    for row in &mut self.rows {
                        row.push(String::new());
                    }
                    self.headers.len() - 1
                }
            };
            positions.push(idx);
        }

        let width = self.headers.len();
        for row in other.rows {
            let mut aligned = vec![String::new(); width];
            for (value, &idx) in row.into_iter().zip(&positions) {
                aligned[idx] = value;
            }
            self.rows.push(aligned);
        }
    }

    /// Stable sort of rows with a caller-supplied comparator
    pub fn sort_rows_by<F>(&mut self, compare: F)
    where
        F: FnMut(&Vec<String>, &Vec<String>) -> std::cmp::Ordering,
    {
        self.rows.sort_by(compare);
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.headers, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_append_aligns_columns() {
        let mut first =
            Table::from_rows(headers(&["STATION", "DATE"]), vec![row(&["A", "2010-01-01"])])
                .unwrap();
        let second = Table::from_rows(
            headers(&["DATE", "STATION", "TEMP"]),
            vec![row(&["2015-01-01", "B", "70.1"])],
        )
        .unwrap();

        first.append(second);

        assert_eq!(first.headers(), &headers(&["STATION", "DATE", "TEMP"])[..]);
        assert_eq!(first.rows()[0], row(&["A", "2010-01-01", ""]));
        assert_eq!(first.rows()[1], row(&["B", "2015-01-01", "70.1"]));
    }

    #[test]
    fn test_drop_and_rename() {
        let mut table = Table::from_rows(
            headers(&["NAME", "GUST", "TEMP"]),
            vec![row(&["X", "999.9", "60"])],
        )
        .unwrap();

        table.drop_columns(&["GUST", "NOT_THERE"]);

        assert_eq!(table.headers(), &headers(&["NAME", "TEMP"])[..]);
        assert_eq!(table.rows()[0], row(&["X", "60"]));
    }

    #[test]
    fn test_push_row_width_checked() {
        let mut table = Table::new(headers(&["A", "B"]));
        assert!(table.push_row(row(&["1"])).is_err());
        assert!(table.push_row(row(&["1", "2"])).is_ok());
    }

    #[test]
    fn test_sort_rows_by() {
        let mut table = Table::from_rows(
            headers(&["S", "D"]),
            vec![row(&["b", "1"]), row(&["a", "2"]), row(&["a", "1"])],
        )
        .unwrap();
        table.sort_rows_by(|a, b| a[0].cmp(&b[0]).then_with(|| a[1].cmp(&b[1])));
        assert_eq!(table.rows()[0], row(&["a", "1"]));
        assert_eq!(table.rows()[2], row(&["b", "1"]));
    }
}
