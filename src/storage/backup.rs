//! Backup files for tracked state.
//!
//! A backup is the pretty-printed JSON of the whole state, saved as
//! `<key>-backup-<YYYY-MM-DD>.json`. Restoring replaces state wholesale.

use crate::{Error, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// File name for a backup of `key` taken on `date`.
pub fn backup_filename(key: &str, date: NaiveDate) -> String {
    format!("{}-backup-{}.json", key, date.format("%Y-%m-%d"))
}

/// Write `state` as pretty-printed JSON into `dir`, returning the file path.
pub fn download_backup<T: Serialize>(state: &T, key: &str, dir: &Path) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(state)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(backup_filename(key, Utc::now().date_naive()));
    fs::write(&path, json)?;
    tracing::info!(path = %path.display(), "backup written");
    Ok(path)
}

/// Read a backup file back into state.
///
/// Fails with `InvalidFile` when no file is given, the file can't be read,
/// or its content is not JSON of the expected shape.
pub fn upload_backup<T: DeserializeOwned>(path: Option<&Path>) -> Result<T> {
    let path = path.ok_or_else(|| Error::InvalidFile("No file selected".to_string()))?;
    let text = fs::read_to_string(path)
        .map_err(|e| Error::InvalidFile(format!("{}: {}", path.display(), e)))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|_| Error::InvalidFile("Invalid JSON file".to_string()))?;
    serde_json::from_value(value)
        .map_err(|e| Error::InvalidFile(format!("Unexpected backup content: {}", e)))
}
