//! Directory-backed YAML loading.
//!
//! Providers, models and presets can each be defined as one YAML file per entry under a
//! configuration directory. A bad file never aborts loading: it is logged and skipped,
//! and the entries from every other file are still returned.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Extensions recognised as YAML, in lookup order.
pub const YAML_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Locates the YAML file for `stem` under `dir`.
///
/// Returns `<stem>.yml` if it exists, else `<stem>.yaml` if it exists, else the `.yml`
/// path (which does not exist) so callers can report it.
pub fn find_yaml_file(dir: &Path, stem: &str) -> PathBuf {
    for ext in YAML_EXTENSIONS {
        let path = dir.join(format!("{}.{}", stem, ext));

        if path.is_file() {
            return path;
        }
    }

    dir.join(format!("{}.{}", stem, YAML_EXTENSIONS[0]))
}

/// Stems of the YAML files directly under `dir`, sorted. A stem present under both
/// extensions is listed once.
pub fn yaml_stems(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|err| Error::load(dir, err))?;

    let stems: BTreeSet<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| YAML_EXTENSIONS.contains(&ext))
        })
        .filter_map(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .map(|stem| stem.to_string())
        })
        .collect();

    Ok(stems.into_iter().collect())
}

/// Reads and parses one YAML file.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).map_err(|err| Error::load(path, err))?;

    serde_yml::from_str(&raw).map_err(|err| Error::load(path, err))
}

/// Parses every YAML file under `dir`, keyed by file stem.
///
/// A missing directory yields nothing. Files that fail to read or parse are logged and
/// left out.
pub fn load_dir<T: DeserializeOwned>(dir: &Path) -> Vec<(String, T)> {
    if !dir.is_dir() {
        debug!("no configuration directory at {}", dir.display());
        return Vec::new();
    }

    let stems = match yaml_stems(dir) {
        Ok(stems) => stems,
        Err(err) => {
            warn!("{}", err);
            return Vec::new();
        }
    };

    let mut loaded = Vec::with_capacity(stems.len());

    for stem in stems {
        let path = find_yaml_file(dir, &stem);

        match read_yaml(&path) {
            Ok(value) => {
                debug!("loaded {}", path.display());
                loaded.push((stem, value));
            }
            Err(err) => warn!("skipping file: {}", err),
        }
    }

    loaded
}
