//! Tabular Loader for Delimited Sensor Logs

use crate::config::{DataConfig, Delimiter};
use crate::error::DataError;
use crate::manifest::{load_column_names, save_column_names};
use crate::table::SensorTable;
use csv::{ReaderBuilder, Trim};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

/// Raw parse result before names are settled
struct RawTable {
    header: Option<Vec<String>>,
    rows: Vec<Vec<f64>>,
}

/// Load a sensor log into a labeled table.
///
/// Missing input is reported before any parsing. For headerless logs the
/// names come from the configured manifest (exact count required) or are
/// synthesized as `col_{i}` and optionally written back to the manifest.
pub fn load_table(config: &DataConfig) -> Result<SensorTable, DataError> {
    let path = config.input_path.as_path();
    if !path.exists() {
        error!("File not found: {}", path.display());
        return Err(DataError::FileNotFound(path.to_path_buf()));
    }

    let manifest_names = if config.has_header {
        None
    } else {
        load_column_names(config.column_names_path.as_deref())?
    };

    let raw = match config.delimiter.as_byte() {
        Some(delimiter) => read_delimited(path, delimiter, config.has_header)?,
        None => read_whitespace(path, config.has_header)?,
    };

    let width = raw.rows.first().map_or_else(|| raw.header.as_ref().map_or(0, Vec::len), Vec::len);
    let placeholder: Vec<String> = (0..width).map(|i| format!("col_{}", i)).collect();
    let mut table = SensorTable::from_rows(raw.header.unwrap_or(placeholder), &raw.rows)?;

    if !config.drop_column_indices.is_empty() {
        debug!("Dropping raw columns {:?}", config.drop_column_indices);
        table.drop_column_indices(&config.drop_column_indices);
    }

    if !config.has_header {
        match manifest_names {
            Some(names) => table.rename_columns(names)?,
            None => {
                let inferred: Vec<String> = (0..table.n_cols()).map(|i| format!("col_{}", i)).collect();
                table.rename_columns(inferred.clone())?;
                if config.save_inferred_columns {
                    if let Some(col_path) = &config.column_names_path {
                        save_column_names(&inferred, col_path)?;
                    }
                }
            }
        }
    }

    let (rows, cols) = table.shape();
    info!("Data loaded successfully. Shape: ({}, {})", rows, cols);
    Ok(table)
}

fn parse_field(field: &str, row: usize, column: usize) -> Result<f64, DataError> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(f64::NAN);
    }
    field.parse::<f64>().map_err(|_| DataError::Parse {
        row,
        column,
        value: field.to_string(),
    })
}

fn parse_record<'a>(
    fields: impl Iterator<Item = &'a str>,
    row: usize,
    expected: Option<usize>,
) -> Result<Vec<f64>, DataError> {
    let values = fields
        .enumerate()
        .map(|(column, field)| parse_field(field, row, column))
        .collect::<Result<Vec<f64>, DataError>>()?;

    if let Some(expected) = expected {
        if values.len() != expected {
            return Err(DataError::RaggedRow {
                row,
                expected,
                actual: values.len(),
            });
        }
    }
    Ok(values)
}

fn read_delimited(path: &Path, delimiter: u8, has_header: bool) -> Result<RawTable, DataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(has_header)
        .delimiter(delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)?;

    let header = if has_header {
        Some(reader.headers()?.iter().map(String::from).collect::<Vec<_>>())
    } else {
        None
    };

    let mut expected = header.as_ref().map(Vec::len);
    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let values = parse_record(record.iter(), row, expected)?;
        expected.get_or_insert(values.len());
        rows.push(values);
    }

    Ok(RawTable { header, rows })
}

fn read_whitespace(path: &Path, has_header: bool) -> Result<RawTable, DataError> {
    let text = fs::read_to_string(path)?;
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header = if has_header {
        lines
            .next()
            .map(|line| line.split_whitespace().map(String::from).collect::<Vec<_>>())
    } else {
        None
    };

    let mut expected = header.as_ref().map(Vec::len);
    let mut rows = Vec::new();
    for (row, line) in lines.enumerate() {
        let values = parse_record(line.split_whitespace(), row, expected)?;
        expected.get_or_insert(values.len());
        rows.push(values);
    }

    Ok(RawTable { header, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn headerless(input: PathBuf, manifest: Option<PathBuf>) -> DataConfig {
        DataConfig {
            input_path: input,
            has_header: false,
            column_names_path: manifest,
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_input_file() {
        let config = DataConfig {
            input_path: PathBuf::from("/definitely/not/here.csv"),
            ..Default::default()
        };
        assert!(matches!(load_table(&config), Err(DataError::FileNotFound(_))));
    }

    #[test]
    fn test_header_row_names_columns() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "log.csv", "unit,time,s1\n1,1,0.5\n1,2,\n");
        let config = DataConfig {
            input_path: input,
            ..Default::default()
        };

        let table = load_table(&config).unwrap();
        assert_eq!(table.shape(), (2, 3));
        assert_eq!(table.column_names()[2], "s1");
        assert!(table.column("s1").unwrap()[1].is_nan());
    }

    #[test]
    fn test_manifest_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "log.csv", "1,1,0.5\n1,2,0.7\n");
        let manifest = write(dir.path(), "columns.yaml", "columns_names: [unit, time]\n");

        let err = load_table(&headerless(input, Some(manifest))).unwrap_err();
        assert!(matches!(err, DataError::ColumnCountMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_manifest_names_applied() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "log.csv", "1,1,0.5\n1,2,0.7\n");
        let manifest = write(dir.path(), "columns.yaml", "columns_names: [unit, time, s1]\n");

        let table = load_table(&headerless(input, Some(manifest))).unwrap();
        assert_eq!(table.column("time").unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn test_inferred_names_saved_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "log.txt", "1 1  0.5 7\n1 2 0.7   8\n");
        let manifest = dir.path().join("columns.yaml");
        let config = DataConfig {
            delimiter: Delimiter::Whitespace,
            save_inferred_columns: true,
            ..headerless(input, Some(manifest.clone()))
        };

        let first = load_table(&config).unwrap();
        assert_eq!(first.column_names(), &["col_0", "col_1", "col_2", "col_3"]);
        assert!(manifest.exists());

        let second = load_table(&config).unwrap();
        assert_eq!(second.column_names(), first.column_names());
        assert_eq!(second.n_cols(), first.n_cols());
    }

    #[test]
    fn test_drop_indices_before_naming() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "log.txt", "1 1 9 0.5\n1 2 9 0.7\n");
        let manifest = write(dir.path(), "columns.yaml", "columns_names: [unit, time, s1]\n");
        let config = DataConfig {
            delimiter: Delimiter::Whitespace,
            drop_column_indices: vec![2],
            ..headerless(input, Some(manifest))
        };

        let table = load_table(&config).unwrap();
        assert_eq!(table.column("s1").unwrap(), &[0.5, 0.7]);
    }

    #[test]
    fn test_ragged_row_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "log.csv", "1,1,0.5\n1,2\n");
        let err = load_table(&headerless(input, None)).unwrap_err();
        assert!(matches!(err, DataError::RaggedRow { row: 1, expected: 3, actual: 2 }));
    }

    #[test]
    fn test_bad_number_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "log.csv", "1,abc,0.5\n");
        let err = load_table(&headerless(input, None)).unwrap_err();
        assert!(matches!(err, DataError::Parse { row: 0, column: 1, .. }));
    }
}
