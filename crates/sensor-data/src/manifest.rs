//! Column-Name Manifest

use crate::error::DataError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// YAML document holding the column names of a headerless log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnManifest {
    #[serde(default)]
    pub columns_names: Vec<String>,
}

/// Read column names from a manifest.
///
/// Returns `Ok(None)` when no manifest is configured or the file does not
/// exist. A document that is not UTF-8 YAML, a missing field, or an empty list is
/// warned about and also yields `Ok(None)` so the loader falls back to
/// synthesized names.
pub fn load_column_names(path: Option<&Path>) -> Result<Option<Vec<String>>, DataError> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }

    let text = match String::from_utf8(fs::read(path)?) {
        Ok(text) => text,
        Err(e) => {
            warn!("Column manifest {} is not valid UTF-8: {}", path.display(), e);
            return Ok(None);
        }
    };
    let manifest: ColumnManifest = if text.trim().is_empty() {
        ColumnManifest::default()
    } else {
        match serde_yaml::from_str(&text) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("'columns_names' is invalid in {}: {}", path.display(), e);
                return Ok(None);
            }
        }
    };

    if manifest.columns_names.is_empty() {
        warn!("'columns_names' is empty or invalid in {}", path.display());
        return Ok(None);
    }

    Ok(Some(manifest.columns_names))
}

/// Write column names to a manifest
pub fn save_column_names(columns: &[String], path: &Path) -> Result<(), DataError> {
    let manifest = ColumnManifest {
        columns_names: columns.to_vec(),
    };
    let text = serde_yaml::to_string(&manifest).map_err(|e| DataError::Manifest(e.to_string()))?;
    fs::write(path, text)?;

    info!("Saved inferred column names to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_path_or_file() {
        assert_eq!(load_column_names(None).unwrap(), None);
        assert_eq!(load_column_names(Some(Path::new("/no/such/columns.yaml"))).unwrap(), None);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("columns.yaml");
        let names: Vec<String> = (0..5).map(|i| format!("col_{}", i)).collect();

        save_column_names(&names, &path).unwrap();
        let loaded = load_column_names(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, names);
    }

    #[test]
    fn test_empty_list_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("columns.yaml");
        fs::write(&path, "columns_names: []\n").unwrap();
        assert_eq!(load_column_names(Some(&path)).unwrap(), None);
    }

    #[test]
    fn test_wrong_shape_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("columns.yaml");
        fs::write(&path, "columns_names: not-a-list\n").unwrap();
        assert_eq!(load_column_names(Some(&path)).unwrap(), None);

        fs::write(&path, "").unwrap();
        assert_eq!(load_column_names(Some(&path)).unwrap(), None);

        fs::write(&path, "other: [a, b]\n").unwrap();
        assert_eq!(load_column_names(Some(&path)).unwrap(), None);
    }

    #[test]
    fn test_non_utf8_manifest_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("columns.yaml");
        fs::write(&path, b"columns_names: [\xff\xfe, time]\n").unwrap();
        assert_eq!(load_column_names(Some(&path)).unwrap(), None);
    }
}
