//! In-memory registry of monitored targets.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use super::models::{DatabaseTarget, Target};

/// Maximum hostname length (RFC 1035 presentation form).
pub const MAX_HOST_LEN: usize = 253;
/// Maximum database target name length.
pub const MAX_DATABASE_NAME_LEN: usize = 100;

/// Registry error types, surfaced to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0} is already being monitored")]
    AlreadyExists(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("database support is not available")]
    CapabilityUnavailable,
}

/// Normalize and validate a network hostname.
pub fn validate_host(raw: &str) -> Result<String, StoreError> {
    let host = raw.trim();
    if host.is_empty() {
        return Err(StoreError::InvalidInput("Host cannot be empty".to_string()));
    }
    if host.chars().count() > MAX_HOST_LEN {
        return Err(StoreError::InvalidInput("Host name too long".to_string()));
    }
    // The host file holds one name per line and names are passed to `ping` as arguments
    if host.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(StoreError::InvalidInput(
            "Host cannot contain whitespace or control characters".to_string(),
        ));
    }
    if host.starts_with('-') {
        return Err(StoreError::InvalidInput(
            "Host cannot start with '-'".to_string(),
        ));
    }
    Ok(host.to_string())
}

/// Normalize and validate a database target name.
pub fn validate_database_name(raw: &str) -> Result<String, StoreError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidInput(
            "Database name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_DATABASE_NAME_LEN {
        return Err(StoreError::InvalidInput(
            "Database name too long".to_string(),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(StoreError::InvalidInput(
            "Database name cannot contain control characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

/// Normalize a database descriptor, rejecting missing connection fields.
pub fn validate_database(target: DatabaseTarget) -> Result<DatabaseTarget, StoreError> {
    let target = DatabaseTarget {
        host: target.host.trim().to_string(),
        port: target.port,
        service: target.service.trim().to_string(),
        user: target.user.trim().to_string(),
        password: target.password,
    };

    let missing: Vec<&str> = [
        ("host", target.host.is_empty()),
        ("service", target.service.is_empty()),
        ("user", target.user.is_empty()),
        ("password", target.password.is_empty()),
    ]
    .iter()
    .filter(|(_, empty)| *empty)
    .map(|(field, _)| *field)
    .collect();

    if !missing.is_empty() {
        return Err(StoreError::InvalidInput(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }
    if target.port == 0 {
        return Err(StoreError::InvalidInput("Port must be non-zero".to_string()));
    }
    Ok(target)
}

/// Immutable copy of the registry taken for one poll cycle or one read.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub hosts: Vec<String>,
    pub databases: Vec<(String, DatabaseTarget)>,
}

impl RegistrySnapshot {
    /// All targets, hosts first.
    pub fn targets(&self) -> Vec<Target> {
        self.hosts
            .iter()
            .cloned()
            .map(Target::Host)
            .chain(self.databases.iter().map(|(name, target)| Target::Database {
                name: name.clone(),
                target: target.clone(),
            }))
            .collect()
    }
}

/// Monitored hosts and databases. Hostnames and database names are separate namespaces.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    hosts: BTreeSet<String>,
    databases: BTreeMap<String, DatabaseTarget>,
}

impl Registry {
    pub fn new(hosts: BTreeSet<String>, databases: BTreeMap<String, DatabaseTarget>) -> Self {
        Self { hosts, databases }
    }

    pub fn hosts(&self) -> &BTreeSet<String> {
        &self.hosts
    }

    pub fn databases(&self) -> &BTreeMap<String, DatabaseTarget> {
        &self.databases
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            hosts: self.hosts.iter().cloned().collect(),
            databases: self
                .databases
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Validate and insert a host. Returns the normalized hostname.
    pub fn add_host(&mut self, raw: &str) -> Result<String, StoreError> {
        let host = validate_host(raw)?;
        if self.hosts.contains(&host) {
            return Err(StoreError::AlreadyExists(host));
        }
        self.hosts.insert(host.clone());
        Ok(host)
    }

    /// Remove a host. Returns the normalized hostname.
    pub fn remove_host(&mut self, raw: &str) -> Result<String, StoreError> {
        let host = raw.trim();
        if !self.hosts.remove(host) {
            return Err(StoreError::NotFound(host.to_string()));
        }
        Ok(host.to_string())
    }

    /// Validate and insert a database target. Returns the normalized name.
    pub fn add_database(
        &mut self,
        raw_name: &str,
        target: DatabaseTarget,
    ) -> Result<String, StoreError> {
        let name = validate_database_name(raw_name)?;
        let target = validate_database(target)?;
        if self.databases.contains_key(&name) {
            return Err(StoreError::AlreadyExists(name));
        }
        self.databases.insert(name.clone(), target);
        Ok(name)
    }

    /// Remove a database target. Returns the normalized name.
    pub fn remove_database(&mut self, raw_name: &str) -> Result<String, StoreError> {
        let name = raw_name.trim();
        if self.databases.remove(name).is_none() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(name.to_string())
    }

    /// Adopt a persisted host set if it is non-empty and differs. Returns whether it changed.
    pub fn replace_hosts(&mut self, hosts: BTreeSet<String>) -> bool {
        if hosts.is_empty() || hosts == self.hosts {
            return false;
        }
        self.hosts = hosts;
        true
    }

    /// Adopt a persisted database map if it is non-empty and differs.
    pub fn replace_databases(&mut self, databases: BTreeMap<String, DatabaseTarget>) -> bool {
        if databases.is_empty() || databases == self.databases {
            return false;
        }
        self.databases = databases;
        true
    }
}
