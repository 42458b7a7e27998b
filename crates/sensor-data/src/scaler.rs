//! Standard Scaling with Explicit Fit/Apply State

use crate::error::DataError;
use crate::table::SensorTable;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-column scaling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    /// Column name
    pub column: String,
    /// Mean of the fitted values
    pub mean: f64,
    /// Population standard deviation; zero spread is stored as 1.0
    pub scale: f64,
}

/// Z-score scaler fitted once and applied to any table with the same columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    scales: Vec<ColumnScale>,
}

impl StandardScaler {
    /// Learn mean and standard deviation of each listed column (NaN ignored)
    pub fn fit<S: AsRef<str>>(table: &SensorTable, columns: &[S]) -> Result<Self, DataError> {
        let mut scales = Vec::with_capacity(columns.len());

        for name in columns {
            let name = name.as_ref();
            let values = table.column(name)?;
            let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();

            let (mean, scale) = if valid.is_empty() {
                (0.0, 1.0)
            } else {
                let n = valid.len() as f64;
                let mean = valid.iter().sum::<f64>() / n;
                let variance = valid.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
                let std = variance.sqrt();
                (mean, if std > 0.0 { std } else { 1.0 })
            };

            scales.push(ColumnScale {
                column: name.to_string(),
                mean,
                scale,
            });
        }

        debug!("Fitted standard scaler on {} columns", scales.len());
        Ok(Self { scales })
    }

    /// Rescale the fitted columns of `table` in place
    pub fn transform(&self, table: &mut SensorTable) -> Result<(), DataError> {
        for s in &self.scales {
            let column = table.column_mut(&s.column)?;
            for v in column.iter_mut() {
                *v = (*v - s.mean) / s.scale;
            }
        }
        Ok(())
    }

    /// Fit on `table` and rescale it
    pub fn fit_transform<S: AsRef<str>>(table: &mut SensorTable, columns: &[S]) -> Result<Self, DataError> {
        let scaler = Self::fit(table, columns)?;
        scaler.transform(table)?;
        Ok(scaler)
    }

    /// Scale a single value of a fitted column
    pub fn scale_value(&self, column: &str, value: f64) -> Option<f64> {
        self.scales
            .iter()
            .find(|s| s.column == column)
            .map(|s| (value - s.mean) / s.scale)
    }

    /// Fitted parameters in column order
    pub fn scales(&self) -> &[ColumnScale] {
        &self.scales
    }

    pub fn is_fitted(&self) -> bool {
        !self.scales.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SensorTable {
        SensorTable::from_rows(
            vec!["a".into(), "flat".into()],
            &[vec![1.0, 3.0], vec![2.0, 3.0], vec![3.0, 3.0], vec![f64::NAN, 3.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_fit_then_apply_to_other_table() {
        let train = table();
        let scaler = StandardScaler::fit(&train, &["a", "flat"]).unwrap();

        let mut live = table();
        scaler.transform(&mut live).unwrap();

        let a = live.column("a").unwrap();
        assert!((a[1] - 0.0).abs() < 1e-12);
        assert!((a[2] - 1.224_744_871).abs() < 1e-6);
        assert!(a[3].is_nan());
        // zero spread only centers
        assert!(live.column("flat").unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_transform_missing_column() {
        let scaler = StandardScaler::fit(&table(), &["a"]).unwrap();
        let mut other = SensorTable::from_rows(vec!["b".into()], &[vec![1.0]]).unwrap();
        assert!(matches!(scaler.transform(&mut other), Err(DataError::MissingColumn(_))));
    }

    #[test]
    fn test_scale_value() {
        let scaler = StandardScaler::fit(&table(), &["a"]).unwrap();
        assert_eq!(scaler.scale_value("a", 2.0), Some(0.0));
        assert_eq!(scaler.scale_value("zzz", 2.0), None);
    }
}
