//! Remaining-Useful-Life Labels

use crate::error::DataError;
use crate::table::SensorTable;
use tracing::debug;

/// Label every row with `max(time) - time` of its unit.
///
/// Run-to-failure logs end at the failing cycle, so the last row of each
/// unit gets RUL 0.
pub fn add_rul_labels(
    table: &mut SensorTable,
    unit_col: &str,
    time_col: &str,
    target_col: &str,
) -> Result<(), DataError> {
    let groups = table.unit_groups(unit_col)?;
    let time = table.column(time_col)?;
    let mut rul = vec![f64::NAN; table.n_rows()];

    for (_, rows) in &groups {
        let max_cycle = rows.iter().map(|&r| time[r]).fold(f64::NEG_INFINITY, f64::max);
        for &r in rows {
            rul[r] = max_cycle - time[r];
        }
    }

    debug!("Labeled {} units with '{}'", groups.len(), target_col);
    table.insert_column(target_col, rul)
}
