//! Scheduler module: the single background poll loop.

use crate::probe::Prober;
use crate::store::{ProbeSample, Store};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Upper bound on probes running at the same time within one cycle.
const MAX_CONCURRENT_PROBES: usize = 16;

/// Drives poll cycles at a fixed interval.
pub struct Scheduler {
    store: Arc<Store>,
    prober: Arc<Prober>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(store: Arc<Store>, prober: Arc<Prober>, interval: Duration) -> Self {
        Self {
            store,
            prober,
            interval,
        }
    }

    /// Start the poll loop in the background.
    ///
    /// Only the first call on a store spawns the loop; later calls return `false`.
    pub fn start(&self) -> bool {
        if !self.store.mark_started() {
            tracing::debug!("Scheduler already running");
            return false;
        }

        tracing::info!(
            "Starting scheduler: interval {}s, {} samples retained per target",
            self.interval.as_secs(),
            self.store.max_history()
        );

        let store = self.store.clone();
        let prober = self.prober.clone();
        let interval = self.interval;
        tokio::spawn(async move {
            run_poll_loop(store, prober, interval).await;
        });
        true
    }
}

/// Run poll cycles forever, sleeping `interval` after each one.
async fn run_poll_loop(store: Arc<Store>, prober: Arc<Prober>, interval: Duration) {
    loop {
        let recorded = run_cycle(&store, &prober).await;
        tracing::info!(
            "Check complete ({} targets). Sleeping for {} seconds...",
            recorded,
            interval.as_secs()
        );
        tokio::time::sleep(interval).await;
    }
}

/// Probe every target in a fresh registry snapshot and record the results.
///
/// All samples of one cycle share the cycle's start time. Returns the number of
/// samples recorded.
pub async fn run_cycle(store: &Arc<Store>, prober: &Arc<Prober>) -> usize {
    let timestamp = Utc::now();
    let targets = store.snapshot().targets();
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_PROBES));

    let mut tasks = JoinSet::new();
    for target in targets {
        let prober = prober.clone();
        let semaphore = semaphore.clone();

        tasks.spawn(async move {
            // Hold permit until done
            let _permit = semaphore.acquire_owned().await.ok();

            // Add jitter to avoid probing every target in the same instant
            let jitter = rand::random::<u64>() % 100;
            tokio::time::sleep(Duration::from_millis(jitter)).await;

            tracing::debug!("Checking latency for {}...", target.id());
            let latency = prober.probe(&target).await;
            (target, latency)
        });
    }

    let mut recorded = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((target, latency)) => {
                store.record(&target, ProbeSample::new(timestamp, latency));
                recorded += 1;
            }
            Err(e) => tracing::error!("Probe task failed: {}", e),
        }
    }
    recorded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testing::ScriptedMethod;
    use crate::probe::ProbeMethod;
    use crate::store::{DatabaseTarget, SampleStatus, StoreOptions};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn open(dir: &TempDir) -> Arc<Store> {
        Arc::new(Store::open(StoreOptions {
            host_file: dir.path().join("hosts.txt"),
            database_file: dir.path().join("dbs.json"),
            default_hosts: vec![],
            max_history: 1440,
        }))
    }

    fn prober(methods: Vec<Box<dyn ProbeMethod>>) -> Arc<Prober> {
        Arc::new(Prober::with_methods(methods, 443, false))
    }

    #[tokio::test]
    async fn test_add_poll_remove_keeps_history() {
        let dir = tempdir().unwrap();
        let store = open(&dir);
        let prober = prober(vec![Box::new(ScriptedMethod::constant("http", 12.0))]);

        let before = store.list_hosts().len();
        let (_, count) = store.add_host("example.com").unwrap();
        assert_eq!(count, before + 1);
        assert!(fs::read_to_string(dir.path().join("hosts.txt"))
            .unwrap()
            .contains("example.com"));

        assert_eq!(run_cycle(&store, &prober).await, 1);
        let history = store.host_history("example.com").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, SampleStatus::Ok);
        assert_eq!(history[0].latency, Some(12.0));

        let (_, count) = store.remove_host("example.com").unwrap();
        assert_eq!(count, before);
        assert_eq!(store.host_history("example.com").unwrap(), history);

        // Removed targets are no longer probed
        assert_eq!(run_cycle(&store, &prober).await, 0);
        assert_eq!(store.host_history("example.com").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_host_records_down() {
        let dir = tempdir().unwrap();
        let store = open(&dir);
        let prober = prober(vec![
            Box::new(ScriptedMethod::failing("http")),
            Box::new(ScriptedMethod::failing("tcp")),
        ]);

        store.add_host("down.example").unwrap();
        run_cycle(&store, &prober).await;

        let latest = store.current()["down.example"].clone();
        assert_eq!(latest.status, SampleStatus::Down);
        assert_eq!(latest.latency, None);
    }

    #[tokio::test]
    async fn test_database_without_capability_is_down_every_cycle() {
        let dir = tempdir().unwrap();
        let store = open(&dir);
        let prober = prober(vec![Box::new(ScriptedMethod::constant("http", 1.0))]);

        let db = DatabaseTarget {
            host: "db.local".to_string(),
            port: 1521,
            service: "ORCL".to_string(),
            user: "scott".to_string(),
            password: "tiger".to_string(),
        };
        store.add_database("db1", db).unwrap();

        for _ in 0..3 {
            run_cycle(&store, &prober).await;
        }
        let history = store.database_history("db1").unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|s| s.status == SampleStatus::Down));
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_cycle_shares_one_timestamp() {
        let dir = tempdir().unwrap();
        let store = open(&dir);
        let prober = prober(vec![Box::new(ScriptedMethod::constant("http", 3.0))]);

        store.add_host("a.example").unwrap();
        store.add_host("b.example").unwrap();
        store.add_host("c.example").unwrap();
        assert_eq!(run_cycle(&store, &prober).await, 3);

        let current = store.current();
        let stamps: Vec<_> = current.values().map(|s| s.timestamp).collect();
        assert!(stamps[0].is_some());
        assert!(stamps.iter().all(|t| *t == stamps[0]));
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = open(&dir);
        let prober = prober(vec![Box::new(ScriptedMethod::constant("http", 1.0))]);

        let scheduler = Scheduler::new(store.clone(), prober.clone(), Duration::from_secs(3600));
        assert!(scheduler.start());
        assert!(!scheduler.start());

        let again = Scheduler::new(store, prober, Duration::from_secs(3600));
        assert!(!again.start());
    }
}
