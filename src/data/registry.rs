//! Data registry: source tracking for each local table.
//! Written by `sync` after it rewrites a table; read by `validate` to show "data as of".

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tables::TableError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSetEntry {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    pub path: String,
}

pub type Registry = BTreeMap<String, DataSetEntry>;

pub const REGISTRY_FILE: &str = "registry.json";

/// Missing or unreadable registry reads as empty.
pub fn load_registry(path: &Path) -> Registry {
    if !path.exists() {
        return Registry::new();
    }
    match fs::read_to_string(path).map(|raw| serde_json::from_str(&raw)) {
        Ok(Ok(registry)) => registry,
        Ok(Err(err)) => {
            warn!(path = %path.display(), error = %err, "ignoring malformed registry");
            Registry::new()
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unreadable registry");
            Registry::new()
        }
    }
}

/// Stamp each `(dataset, file)` with the current UTC time and persist the registry.
pub fn record_datasets(
    path: &Path,
    source: &str,
    datasets: &[(&str, &str)],
) -> Result<Registry, TableError> {
    let mut registry = load_registry(path);
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    for (dataset, file) in datasets {
        registry.insert(
            dataset.to_string(),
            DataSetEntry {
                source: source.to_string(),
                last_updated: Some(now.clone()),
                path: file.to_string(),
            },
        );
    }
    let io_err = |source: std::io::Error| TableError::Io {
        path: path.display().to_string(),
        source,
    };
    let raw = serde_json::to_string_pretty(&registry).map_err(|err| io_err(err.into()))?;
    fs::write(path, raw).map_err(io_err)?;
    Ok(registry)
}
