//! On-disk target lists.
//!
//! Network hosts are stored one per line, sorted. Database targets are stored as a JSON
//! object keyed by name, passwords included.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use thiserror::Error;

use super::models::DatabaseTarget;

/// Persistence error types.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid database file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read the host list. Returns `None` when the file does not exist.
pub fn read_hosts(path: &Path) -> Result<Option<BTreeSet<String>>, PersistError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let hosts = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Some(hosts))
}

/// Write the host list, one sorted hostname per line.
pub fn write_hosts(path: &Path, hosts: &BTreeSet<String>) -> Result<(), PersistError> {
    let mut content = String::new();
    for host in hosts {
        content.push_str(host);
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

/// Read the database map. Returns `None` when the file does not exist.
pub fn read_databases(
    path: &Path,
) -> Result<Option<BTreeMap<String, DatabaseTarget>>, PersistError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if content.trim().is_empty() {
        return Ok(Some(BTreeMap::new()));
    }
    Ok(Some(serde_json::from_str(&content)?))
}

/// Write the database map as pretty-printed JSON.
pub fn write_databases(
    path: &Path,
    databases: &BTreeMap<String, DatabaseTarget>,
) -> Result<(), PersistError> {
    let content = serde_json::to_string_pretty(databases)?;
    fs::write(path, content)?;
    Ok(())
}
