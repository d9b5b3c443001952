//! Shared monitor state: registry, sample history and persistence behind one lock.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;

use super::history::HistoryStore;
use super::models::{DatabaseTarget, LatestSample, MaskedDatabase, ProbeSample, Target};
use super::persistence;
use super::registry::{Registry, RegistrySnapshot, StoreError};
use crate::config::ServerConfig;

/// Options for opening a store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub host_file: PathBuf,
    pub database_file: PathBuf,
    /// Hosts used when the host file is missing, empty or unreadable
    pub default_hosts: Vec<String>,
    pub max_history: usize,
}

impl From<&ServerConfig> for StoreOptions {
    fn from(cfg: &ServerConfig) -> Self {
        Self {
            host_file: cfg.host_file.clone(),
            database_file: cfg.database_file.clone(),
            default_hosts: cfg.monitored_hosts.clone(),
            max_history: cfg.max_history(),
        }
    }
}

/// Full host history as served to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct LatencyOverview {
    pub hosts: Vec<String>,
    pub data: BTreeMap<String, Vec<ProbeSample>>,
}

/// A database target with its history, credentials removed.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseView {
    #[serde(flatten)]
    pub descriptor: MaskedDatabase,
    pub data: Vec<ProbeSample>,
}

/// Sample count and latest sample of one series.
#[derive(Debug, Clone, Serialize)]
pub struct DataStatus {
    pub data_points: usize,
    pub latest: Option<ProbeSample>,
}

struct State {
    registry: Registry,
    host_history: HistoryStore,
    database_history: HistoryStore,
    started: bool,
}

/// Thread-safe monitor state.
///
/// Registry mutations write the backing file before the lock is released, so a
/// successful add or remove is visible on disk when the call returns.
pub struct Store {
    state: Mutex<State>,
    host_file: PathBuf,
    database_file: PathBuf,
}

impl Store {
    /// Open a store, loading persisted targets.
    pub fn open(options: StoreOptions) -> Self {
        let hosts = load_hosts(&options.host_file, &options.default_hosts);
        let databases = load_databases(&options.database_file);

        let mut host_history = HistoryStore::new(options.max_history);
        for host in &hosts {
            host_history.ensure(host);
        }
        let mut database_history = HistoryStore::new(options.max_history);
        for name in databases.keys() {
            database_history.ensure(name);
        }

        Self {
            state: Mutex::new(State {
                registry: Registry::new(hosts, databases),
                host_history,
                database_history,
                started: false,
            }),
            host_file: options.host_file,
            database_file: options.database_file,
        }
    }

    pub fn max_history(&self) -> usize {
        self.state.lock().host_history.capacity()
    }

    /// Copy of the current target set.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.state.lock().registry.snapshot()
    }

    /// Set the started flag. Returns `true` only for the first caller.
    pub fn mark_started(&self) -> bool {
        let mut state = self.state.lock();
        if state.started {
            return false;
        }
        state.started = true;
        true
    }

    // --- Network hosts ---

    /// Current hosts after reconciling with the host file.
    pub fn list_hosts(&self) -> Vec<String> {
        let mut state = self.state.lock();
        self.reconcile_hosts(&mut state);
        state.registry.hosts().iter().cloned().collect()
    }

    /// Add a host. Returns the normalized host and the new host count.
    pub fn add_host(&self, raw: &str) -> Result<(String, usize), StoreError> {
        let mut state = self.state.lock();
        let host = state.registry.add_host(raw)?;
        state.host_history.ensure(&host);
        self.persist_hosts(state.registry.hosts());

        let count = state.registry.hosts().len();
        tracing::info!("Added new host: {}. Total hosts: {}", host, count);
        Ok((host, count))
    }

    /// Remove a host. Its history is kept.
    pub fn remove_host(&self, raw: &str) -> Result<(String, usize), StoreError> {
        let mut state = self.state.lock();
        let host = state.registry.remove_host(raw)?;
        self.persist_hosts(state.registry.hosts());

        let count = state.registry.hosts().len();
        tracing::info!("Removed host: {}. Remaining hosts: {}", host, count);
        Ok((host, count))
    }

    /// History for one host, including hosts that are no longer monitored.
    pub fn host_history(&self, host: &str) -> Option<Vec<ProbeSample>> {
        self.state.lock().host_history.get(host)
    }

    /// History for every current host, after reconciling with the host file.
    pub fn latency_overview(&self) -> LatencyOverview {
        let mut state = self.state.lock();
        self.reconcile_hosts(&mut state);

        let hosts: Vec<String> = state.registry.hosts().iter().cloned().collect();
        let data = hosts
            .iter()
            .map(|h| (h.clone(), state.host_history.get_or_empty(h)))
            .collect();
        LatencyOverview { hosts, data }
    }

    /// Most recent sample per current host.
    pub fn current(&self) -> BTreeMap<String, LatestSample> {
        let state = self.state.lock();
        state
            .registry
            .hosts()
            .iter()
            .map(|h| {
                let latest = state
                    .host_history
                    .latest(h)
                    .map(LatestSample::from)
                    .unwrap_or_else(LatestSample::unknown);
                (h.clone(), latest)
            })
            .collect()
    }

    /// Sample counts for every host series ever recorded.
    pub fn data_status(&self) -> BTreeMap<String, DataStatus> {
        let state = self.state.lock();
        state
            .host_history
            .ids()
            .map(|id| {
                (
                    id.to_string(),
                    DataStatus {
                        data_points: state.host_history.len(id),
                        latest: state.host_history.latest(id),
                    },
                )
            })
            .collect()
    }

    // --- Databases ---

    /// Add a database target. Returns the normalized name and the new count.
    pub fn add_database(
        &self,
        raw_name: &str,
        target: DatabaseTarget,
    ) -> Result<(String, usize), StoreError> {
        let mut state = self.state.lock();
        let name = state.registry.add_database(raw_name, target)?;
        state.database_history.ensure(&name);
        self.persist_databases(state.registry.databases());

        let count = state.registry.databases().len();
        tracing::info!("Added database: {}. Total databases: {}", name, count);
        Ok((name, count))
    }

    /// Remove a database target. Its history is kept.
    pub fn remove_database(&self, raw_name: &str) -> Result<(String, usize), StoreError> {
        let mut state = self.state.lock();
        let name = state.registry.remove_database(raw_name)?;
        self.persist_databases(state.registry.databases());

        let count = state.registry.databases().len();
        tracing::info!("Removed database: {}. Remaining databases: {}", name, count);
        Ok((name, count))
    }

    #[cfg(test)]
    pub fn database_history(&self, name: &str) -> Option<Vec<ProbeSample>> {
        self.state.lock().database_history.get(name)
    }

    /// Masked descriptors and history for every current database target.
    pub fn database_overview(&self) -> Vec<DatabaseView> {
        let mut state = self.state.lock();
        self.reconcile_databases(&mut state);

        state
            .registry
            .databases()
            .iter()
            .map(|(name, target)| DatabaseView {
                descriptor: target.masked(name),
                data: state.database_history.get_or_empty(name),
            })
            .collect()
    }

    // --- Samples ---

    /// Append a sample to the target's series, creating it if needed.
    pub fn record(&self, target: &Target, sample: ProbeSample) {
        let mut state = self.state.lock();
        match target {
            Target::Host(host) => state.host_history.append(host, sample),
            Target::Database { name, .. } => state.database_history.append(name, sample),
        }
    }

    // --- Persistence ---

    fn persist_hosts(&self, hosts: &BTreeSet<String>) {
        match persistence::write_hosts(&self.host_file, hosts) {
            Ok(()) => tracing::debug!("Saved {} hosts to persistent storage", hosts.len()),
            Err(e) => tracing::warn!(
                "Failed to save hosts to {}: {}",
                self.host_file.display(),
                e
            ),
        }
    }

    fn persist_databases(&self, databases: &BTreeMap<String, DatabaseTarget>) {
        match persistence::write_databases(&self.database_file, databases) {
            Ok(()) => tracing::debug!("Saved {} databases to persistent storage", databases.len()),
            Err(e) => tracing::warn!(
                "Failed to save databases to {}: {}",
                self.database_file.display(),
                e
            ),
        }
    }

    fn reconcile_hosts(&self, state: &mut State) {
        match persistence::read_hosts(&self.host_file) {
            Ok(Some(hosts)) => {
                if state.registry.replace_hosts(hosts) {
                    for host in state.registry.hosts().clone() {
                        state.host_history.ensure(&host);
                    }
                    tracing::info!(
                        "Reloaded {} hosts from file",
                        state.registry.hosts().len()
                    );
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Error reloading hosts: {}", e),
        }
    }

    fn reconcile_databases(&self, state: &mut State) {
        match persistence::read_databases(&self.database_file) {
            Ok(Some(databases)) => {
                if state.registry.replace_databases(databases) {
                    for name in state.registry.databases().keys().cloned().collect::<Vec<_>>() {
                        state.database_history.ensure(&name);
                    }
                    tracing::info!(
                        "Reloaded {} databases from file",
                        state.registry.databases().len()
                    );
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Error reloading databases: {}", e),
        }
    }
}

fn load_hosts(path: &Path, defaults: &[String]) -> BTreeSet<String> {
    match persistence::read_hosts(path) {
        Ok(Some(hosts)) if !hosts.is_empty() => {
            tracing::info!("Loaded {} unique hosts from persistent storage", hosts.len());
            return hosts;
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Error loading hosts from {}: {}", path.display(), e),
    }

    tracing::info!("Using default hosts from environment");
    defaults
        .iter()
        .map(|h| h.trim())
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

fn load_databases(path: &Path) -> BTreeMap<String, DatabaseTarget> {
    match persistence::read_databases(path) {
        Ok(Some(databases)) => {
            tracing::info!("Loaded {} databases from persistent storage", databases.len());
            databases
        }
        Ok(None) => BTreeMap::new(),
        Err(e) => {
            tracing::warn!("Error loading databases from {}: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}
