//! Probe module for latency measurement.
//!
//! Network hosts go through a fallback chain: an HTTP HEAD request, then a raw TCP
//! connect, then ICMP ping. Database targets are probed with a client connection.

mod database;
mod diagnostics;
mod http;
mod ping;
mod tcp;

pub use database::*;
pub use diagnostics::*;
pub use http::*;
pub use ping::*;
pub use tcp::*;

use crate::store::{DatabaseTarget, Target};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected HTTP status: {0}")]
    Status(u16),
    #[error("command failed: {0}")]
    Command(String),
    #[error("unparsable output: {0}")]
    Parse(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("database support is not available")]
    Unavailable,
}

/// One way of measuring latency to a host.
#[async_trait]
pub trait ProbeMethod: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// How many times the method is attempted before falling back.
    fn attempts(&self) -> usize {
        3
    }

    /// Run one attempt, returning latency in milliseconds.
    async fn measure(&self, host: &str, port: u16) -> Result<f64, ProbeError>;
}

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Run each method in order until one produces at least one successful attempt.
///
/// The result is the mean of that method's successful attempts only.
pub async fn run_fallback_chain(
    methods: &[Box<dyn ProbeMethod>],
    host: &str,
    port: u16,
) -> Option<f64> {
    for method in methods {
        let mut latencies = Vec::with_capacity(method.attempts());

        for attempt in 1..=method.attempts() {
            match method.measure(host, port).await {
                Ok(ms) => {
                    tracing::debug!("{} latency to {}: {:.2}ms", method.name(), host, ms);
                    latencies.push(ms);
                }
                Err(e) => {
                    tracing::debug!(
                        "{} probe to {} attempt {} failed: {}",
                        method.name(),
                        host,
                        attempt,
                        e
                    );
                }
            }
        }

        if let Some(avg) = mean(&latencies) {
            tracing::debug!("Average {} latency to {}: {:.2}ms", method.name(), host, avg);
            return Some(avg);
        }
        tracing::debug!("{} failed for {}, trying next method", method.name(), host);
    }

    tracing::warn!("All latency check methods failed for {}", host);
    None
}

/// Latency prober for all target kinds.
pub struct Prober {
    methods: Vec<Box<dyn ProbeMethod>>,
    port: u16,
    database_enabled: bool,
}

impl Prober {
    /// Create a prober with the standard HTTP, TCP, ping chain.
    pub fn new(port: u16, database_enabled: bool) -> Result<Self, ProbeError> {
        let methods: Vec<Box<dyn ProbeMethod>> = vec![
            Box::new(HttpProbe::new(HTTP_TIMEOUT)?),
            Box::new(TcpProbe::new(TCP_TIMEOUT)),
            Box::new(PingProbe::default()),
        ];
        Ok(Self::with_methods(methods, port, database_enabled))
    }

    /// Create a prober with a custom method chain.
    pub fn with_methods(
        methods: Vec<Box<dyn ProbeMethod>>,
        port: u16,
        database_enabled: bool,
    ) -> Self {
        Self {
            methods,
            port,
            database_enabled,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database_enabled(&self) -> bool {
        self.database_enabled
    }

    /// Probe any target. Returns latency in milliseconds, or `None` if it is down.
    pub async fn probe(&self, target: &Target) -> Option<f64> {
        match target {
            Target::Host(host) => self.probe_host(host).await,
            Target::Database { name, target } => {
                let latency = self.probe_database(target).await;
                if latency.is_none() {
                    tracing::debug!("Database {} is down", name);
                }
                latency
            }
        }
    }

    pub async fn probe_host(&self, host: &str) -> Option<f64> {
        run_fallback_chain(&self.methods, host, self.port).await
    }

    pub async fn probe_database(&self, target: &DatabaseTarget) -> Option<f64> {
        if !self.database_enabled {
            return None;
        }

        match run_database_probe(target).await {
            Ok(ms) => Some(ms),
            Err(e) => {
                tracing::warn!(
                    "Database probe to {} failed: {}",
                    target.connect_string(),
                    e
                );
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedMethod;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[10.0, 20.0]), Some(15.0));
    }

    #[tokio::test]
    async fn test_falls_back_to_tcp_mean_of_successes() {
        let http = ScriptedMethod::failing("http");
        let tcp = ScriptedMethod::new("tcp", &[Some(10.0), None, Some(20.0)]);
        let ping = ScriptedMethod::constant("ping", 99.0);
        let (http_calls, tcp_calls, ping_calls) =
            (http.calls.clone(), tcp.calls.clone(), ping.calls.clone());

        let methods: Vec<Box<dyn ProbeMethod>> = vec![Box::new(http), Box::new(tcp), Box::new(ping)];
        let latency = run_fallback_chain(&methods, "example.com", 443).await;

        assert_eq!(latency, Some(15.0));
        assert_eq!(http_calls.load(Ordering::SeqCst), 3);
        assert_eq!(tcp_calls.load(Ordering::SeqCst), 3);
        assert_eq!(ping_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_success_does_not_advance() {
        let http = ScriptedMethod::new("http", &[None, Some(30.0), None]);
        let tcp = ScriptedMethod::constant("tcp", 1.0);
        let tcp_calls = tcp.calls.clone();

        let methods: Vec<Box<dyn ProbeMethod>> = vec![Box::new(http), Box::new(tcp)];
        assert_eq!(run_fallback_chain(&methods, "h", 80).await, Some(30.0));
        assert_eq!(tcp_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_methods_failing_is_down() {
        let methods: Vec<Box<dyn ProbeMethod>> = vec![
            Box::new(ScriptedMethod::failing("http")),
            Box::new(ScriptedMethod::failing("tcp")),
            Box::new(ScriptedMethod::failing("ping")),
        ];
        assert_eq!(run_fallback_chain(&methods, "h", 443).await, None);
    }

    #[tokio::test]
    async fn test_prober_dispatches_on_target_kind() {
        let prober = Prober::with_methods(
            vec![Box::new(ScriptedMethod::constant("http", 7.0))],
            443,
            false,
        );
        assert_eq!(prober.port(), 443);
        assert!(!prober.database_enabled());

        let host = Target::Host("example.com".to_string());
        assert_eq!(prober.probe(&host).await, Some(7.0));

        let db = Target::Database {
            name: "db1".to_string(),
            target: DatabaseTarget {
                host: "db.local".to_string(),
                port: 1521,
                service: "ORCL".to_string(),
                user: "scott".to_string(),
                password: "tiger".to_string(),
            },
        };
        assert_eq!(prober.probe(&db).await, None);
    }
}
