//! Column Cleaning

use crate::table::SensorTable;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Direction used to fill NaN gaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    /// Carry the last valid value forward
    Forward,
    /// Carry the next valid value backward
    #[default]
    Backward,
}

/// Sample standard deviation (ddof = 1) ignoring NaN
pub fn nan_std(values: &[f64]) -> f64 {
    let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.len() < 2 {
        return f64::NAN;
    }
    let n = valid.len() as f64;
    let mean = valid.iter().sum::<f64>() / n;
    let ss: f64 = valid.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (n - 1.0)).sqrt()
}

/// Drop columns whose sample standard deviation is below `threshold`.
///
/// Columns listed in `keep` are never dropped. Returns the dropped names.
pub fn drop_low_std_columns(table: &mut SensorTable, threshold: f64, keep: &[String]) -> Vec<String> {
    let doomed: Vec<String> = table
        .column_names()
        .iter()
        .enumerate()
        .filter(|(_, name)| !keep.contains(name))
        .filter_map(|(idx, name)| {
            let std = nan_std(table.column_at(idx).unwrap_or(&[]));
            (std < threshold).then(|| name.clone())
        })
        .collect();

    if !doomed.is_empty() {
        info!("Dropping {} low-variance columns: {:?}", doomed.len(), doomed);
        table.drop_columns(&doomed);
    }
    doomed
}

/// Fill NaN gaps in a single series; gaps with no donor stay NaN
pub fn fill_series(values: &mut [f64], method: FillMethod) {
    let mut last = f64::NAN;
    let mut fill = |v: &mut f64| {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    };

    match method {
        FillMethod::Forward => values.iter_mut().for_each(&mut fill),
        FillMethod::Backward => values.iter_mut().rev().for_each(&mut fill),
    }
}

/// Fill NaN gaps in every column
pub fn fill_missing(table: &mut SensorTable, method: FillMethod) {
    let names: Vec<String> = table.column_names().to_vec();
    for name in &names {
        if let Ok(column) = table.column_mut(name) {
            fill_series(column, method);
        }
    }
    debug!("Filled missing values ({:?}) across {} columns", method, names.len());
}
