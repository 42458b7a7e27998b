//! Labeled Sensor Table

use crate::error::DataError;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Time-ordered sensor samples stored as named, equal-length columns.
///
/// Rows are samples (one engine cycle each), columns are unit id, cycle
/// index, operational settings and sensor channels. Missing values are NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorTable {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl SensorTable {
    /// Build a table from column names and column-major values
    pub fn new(names: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self, DataError> {
        if names.len() != columns.len() {
            return Err(DataError::ColumnCountMismatch {
                expected: names.len(),
                actual: columns.len(),
            });
        }

        let rows = columns.first().map_or(0, Vec::len);
        for (name, values) in names.iter().zip(&columns) {
            if values.len() != rows {
                return Err(DataError::LengthMismatch {
                    column: name.clone(),
                    expected: rows,
                    actual: values.len(),
                });
            }
        }

        Ok(Self { names, columns })
    }

    /// Build a table from row-major records
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, DataError> {
        let width = names.len();
        let mut columns = vec![Vec::with_capacity(rows.len()); width];

        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(DataError::RaggedRow {
                    row: row_idx,
                    expected: width,
                    actual: row.len(),
                });
            }
            for (column, &value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }

        Self::new(names, columns)
    }

    /// Number of rows (samples)
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Number of columns
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// Column names in order
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Position of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of a named column
    pub fn column(&self, name: &str) -> Result<&[f64], DataError> {
        self.column_index(name)
            .map(|idx| self.columns[idx].as_slice())
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    }

    /// Mutable values of a named column
    pub fn column_mut(&mut self, name: &str) -> Result<&mut Vec<f64>, DataError> {
        match self.column_index(name) {
            Some(idx) => Ok(&mut self.columns[idx]),
            None => Err(DataError::MissingColumn(name.to_string())),
        }
    }

    /// Column values by position
    pub fn column_at(&self, idx: usize) -> Option<&[f64]> {
        self.columns.get(idx).map(Vec::as_slice)
    }

    /// Insert a column, replacing any existing column of the same name
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), DataError> {
        let name = name.into();
        if self.n_cols() > 0 && values.len() != self.n_rows() {
            return Err(DataError::LengthMismatch {
                column: name,
                expected: self.n_rows(),
                actual: values.len(),
            });
        }

        match self.column_index(&name) {
            Some(idx) => self.columns[idx] = values,
            None => {
                self.names.push(name);
                self.columns.push(values);
            }
        }
        Ok(())
    }

    /// Remove named columns; unknown names are ignored
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) {
        let (kept_names, kept_columns): (Vec<_>, Vec<_>) = self
            .names
            .drain(..)
            .zip(self.columns.drain(..))
            .filter(|(name, _)| !names.iter().any(|n| n.as_ref() == name))
            .unzip();
        self.names = kept_names;
        self.columns = kept_columns;
    }

    /// Remove columns by position; out-of-range indices are ignored
    pub fn drop_column_indices(&mut self, indices: &[usize]) {
        let doomed: Vec<String> = indices
            .iter()
            .filter_map(|&idx| self.names.get(idx).cloned())
            .collect();
        self.drop_columns(&doomed);
    }

    /// Replace every column name; the count must match exactly
    pub fn rename_columns(&mut self, names: Vec<String>) -> Result<(), DataError> {
        if names.len() != self.n_cols() {
            return Err(DataError::ColumnCountMismatch {
                expected: names.len(),
                actual: self.n_cols(),
            });
        }
        self.names = names;
        Ok(())
    }

    /// One row across all columns
    pub fn row(&self, idx: usize) -> Option<Vec<f64>> {
        if idx >= self.n_rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| c[idx]).collect())
    }

    /// Row indices grouped by the value of a key column (e.g. unit number),
    /// in order of first appearance. Rows with a missing key belong to no group.
    pub fn unit_groups(&self, key: &str) -> Result<Vec<(i64, Vec<usize>)>, DataError> {
        let keys = self.column(key)?;
        let mut order: Vec<(i64, Vec<usize>)> = Vec::new();
        let mut slot: HashMap<i64, usize> = HashMap::new();
        let mut skipped = 0usize;

        for (row, &value) in keys.iter().enumerate() {
            if !value.is_finite() {
                skipped += 1;
                continue;
            }
            let unit = value as i64;
            let idx = *slot.entry(unit).or_insert_with(|| {
                order.push((unit, Vec::new()));
                order.len() - 1
            });
            order[idx].1.push(row);
        }

        if skipped > 0 {
            warn!("{} rows have no '{}' value and are left out of every group", skipped, key);
        }
        Ok(order)
    }

    /// Persist the table as comma-separated text with a header row
    pub fn write_csv(&self, path: &Path) -> Result<(), DataError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.names)?;

        for row in 0..self.n_rows() {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|c| if c[row].is_nan() { String::new() } else { c[row].to_string() })
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;

        info!("Wrote {} rows x {} columns to {}", self.n_rows(), self.n_cols(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> SensorTable {
        SensorTable::from_rows(
            names(&["unit", "time", "s1"]),
            &[
                vec![1.0, 1.0, 10.0],
                vec![1.0, 2.0, 11.0],
                vec![2.0, 1.0, 20.0],
                vec![1.0, 3.0, 12.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_and_access() {
        let table = sample();
        assert_eq!(table.shape(), (4, 3));
        assert_eq!(table.column("s1").unwrap(), &[10.0, 11.0, 20.0, 12.0]);
        assert_eq!(table.row(2).unwrap(), vec![2.0, 1.0, 20.0]);
        assert!(table.row(4).is_none());
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let err = SensorTable::new(names(&["a", "b"]), vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, DataError::LengthMismatch { .. }));
    }

    #[test]
    fn test_insert_replaces_same_name() {
        let mut table = sample();
        table.insert_column("s1_x", vec![0.0; 4]).unwrap();
        assert_eq!(table.n_cols(), 4);
        table.insert_column("s1_x", vec![1.0; 4]).unwrap();
        assert_eq!(table.n_cols(), 4);
        assert_eq!(table.column("s1_x").unwrap()[0], 1.0);
        assert!(table.insert_column("short", vec![1.0]).is_err());
    }

    #[test]
    fn test_rename_count_mismatch() {
        let mut table = sample();
        let err = table.rename_columns(names(&["a", "b"])).unwrap_err();
        assert!(matches!(err, DataError::ColumnCountMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_drop_by_index() {
        let mut table = sample();
        table.drop_column_indices(&[1, 7]);
        assert_eq!(table.column_names(), &names(&["unit", "s1"])[..]);
    }

    #[test]
    fn test_unit_groups_first_appearance() {
        let groups = sample().unit_groups("unit").unwrap();
        assert_eq!(groups, vec![(1, vec![0, 1, 3]), (2, vec![2])]);
    }

    #[test]
    fn test_unit_groups_skip_missing_keys() {
        let mut table = sample();
        table.column_mut("unit").unwrap()[1] = f64::NAN;
        let groups = table.unit_groups("unit").unwrap();
        assert_eq!(groups, vec![(1, vec![0, 3]), (2, vec![2])]);
        assert!(groups.iter().all(|(unit, _)| *unit != 0));
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        let mut table = sample();
        table.column_mut("s1").unwrap()[0] = f64::NAN;
        table.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("unit,time,s1"));
        assert_eq!(lines.next(), Some("1,1,"));
    }
}
