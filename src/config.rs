//! Configuration module for the latency monitor.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Seconds of history kept per target.
pub const RETENTION_SECONDS: u64 = 86_400;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Hosts monitored when nothing has been persisted yet
    pub monitored_hosts: Vec<String>,
    /// Seconds between poll cycles (default: 60)
    pub check_interval: u64,
    /// Port used by the HTTP and TCP probes (default: 443)
    pub tcp_port: u16,
    /// Newline-delimited list of monitored hosts
    pub host_file: PathBuf,
    /// JSON map of monitored database targets
    pub database_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            monitored_hosts: vec!["google.com".to_string(), "cloudflare.com".to_string()],
            check_interval: 60,
            tcp_port: 443,
            host_file: PathBuf::from("/tmp/monitored_hosts.txt"),
            database_file: PathBuf::from("/tmp/monitored_databases.json"),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: HTTP port (default: 8080)
    /// - `MONITORED_HOSTS`: comma-separated default hosts
    /// - `CHECK_INTERVAL`: poll interval in seconds (default: 60)
    /// - `TCP_PORT`: probe port (default: 443)
    /// - `HOST_FILE`: host list path (default: "/tmp/monitored_hosts.txt")
    /// - `DATABASE_FILE`: database map path (default: "/tmp/monitored_databases.json")
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = lookup("PORT").and_then(|s| s.trim().parse().ok()) {
            cfg.http_port = port;
        }

        if let Some(hosts) = lookup("MONITORED_HOSTS") {
            cfg.monitored_hosts = parse_host_list(&hosts);
        }

        if let Some(interval) = lookup("CHECK_INTERVAL").and_then(|s| s.trim().parse::<u64>().ok()) {
            if interval > 0 {
                cfg.check_interval = interval;
            }
        }

        if let Some(port) = lookup("TCP_PORT").and_then(|s| s.trim().parse().ok()) {
            cfg.tcp_port = port;
        }

        if let Some(path) = lookup("HOST_FILE") {
            cfg.host_file = PathBuf::from(path);
        }

        if let Some(path) = lookup("DATABASE_FILE") {
            cfg.database_file = PathBuf::from(path);
        }

        cfg
    }

    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval.max(1))
    }

    /// Number of samples that covers 24 hours at the configured interval.
    pub fn max_history(&self) -> usize {
        ((RETENTION_SECONDS / self.check_interval.max(1)) as usize).max(1)
    }

    /// Retention window in hours, as reported to API consumers.
    pub fn retention_hours(&self) -> u64 {
        RETENTION_SECONDS / 3600
    }
}

/// Split a comma-separated host list, dropping blanks.
pub fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.check_interval, 60);
        assert_eq!(cfg.tcp_port, 443);
        assert_eq!(cfg.max_history(), 1440);
        assert_eq!(cfg.retention_hours(), 24);
    }

    #[test]
    fn test_max_history_follows_interval() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[("CHECK_INTERVAL", "30")]));
        assert_eq!(cfg.max_history(), 2880);

        let cfg = ServerConfig::from_lookup(lookup_from(&[("CHECK_INTERVAL", "7")]));
        assert_eq!(cfg.max_history(), 12342);

        // Longer than the retention window still keeps one sample
        let cfg = ServerConfig::from_lookup(lookup_from(&[("CHECK_INTERVAL", "100000")]));
        assert_eq!(cfg.max_history(), 1);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            ("CHECK_INTERVAL", "0"),
            ("TCP_PORT", "not-a-port"),
            ("PORT", "70000"),
        ]));
        assert_eq!(cfg.check_interval, 60);
        assert_eq!(cfg.tcp_port, 443);
        assert_eq!(cfg.http_port, 8080);
    }

    #[test]
    fn test_env_overrides() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("MONITORED_HOSTS", " a.example , ,b.example,"),
            ("TCP_PORT", "80"),
            ("HOST_FILE", "/var/lib/hosts.txt"),
        ]));
        assert_eq!(cfg.http_port, 9000);
        assert_eq!(cfg.monitored_hosts, vec!["a.example", "b.example"]);
        assert_eq!(cfg.tcp_port, 80);
        assert_eq!(cfg.host_file, PathBuf::from("/var/lib/hosts.txt"));
        assert_eq!(cfg.poll_interval(), Duration::from_secs(60));
    }
}
