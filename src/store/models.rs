//! Target and sample types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default Oracle listener port.
pub const DEFAULT_DATABASE_PORT: u16 = 1521;

fn default_database_port() -> u16 {
    DEFAULT_DATABASE_PORT
}

/// Connection descriptor for a monitored database, as persisted on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseTarget {
    pub host: String,
    #[serde(default = "default_database_port")]
    pub port: u16,
    pub service: String,
    pub user: String,
    pub password: String,
}

impl DatabaseTarget {
    /// Descriptor with the password stripped, safe for read APIs.
    pub fn masked(&self, name: &str) -> MaskedDatabase {
        MaskedDatabase {
            name: name.to_string(),
            host: self.host.clone(),
            port: self.port,
            service: self.service.clone(),
            user: self.user.clone(),
        }
    }

    /// Oracle easy-connect string.
    pub fn connect_string(&self) -> String {
        format!("//{}:{}/{}", self.host, self.port, self.service)
    }
}

/// Database descriptor without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskedDatabase {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub service: String,
    pub user: String,
}

/// A probe subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Hostname or IP address
    Host(String),
    /// Named database endpoint
    Database { name: String, target: DatabaseTarget },
}

impl Target {
    pub fn id(&self) -> &str {
        match self {
            Target::Host(host) => host,
            Target::Database { name, .. } => name,
        }
    }
}

/// Reachability of a target at a sample time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleStatus {
    Ok,
    Down,
    /// No sample recorded yet
    Unknown,
}

/// A single probe result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeSample {
    pub timestamp: DateTime<Utc>,
    /// Latency in milliseconds, absent when the target was down
    pub latency: Option<f64>,
    pub status: SampleStatus,
}

impl ProbeSample {
    /// Build a sample, deriving the status from the latency.
    ///
    /// Negative or non-finite latencies are treated as a failed probe.
    pub fn new(timestamp: DateTime<Utc>, latency: Option<f64>) -> Self {
        let latency = latency.filter(|ms| ms.is_finite() && *ms >= 0.0);
        let status = if latency.is_some() {
            SampleStatus::Ok
        } else {
            SampleStatus::Down
        };
        Self {
            timestamp,
            latency,
            status,
        }
    }
}

/// Most recent sample for a target, or the unknown marker when none exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestSample {
    pub timestamp: Option<DateTime<Utc>>,
    pub latency: Option<f64>,
    pub status: SampleStatus,
}

impl LatestSample {
    pub fn unknown() -> Self {
        Self {
            timestamp: None,
            latency: None,
            status: SampleStatus::Unknown,
        }
    }
}

impl From<ProbeSample> for LatestSample {
    fn from(sample: ProbeSample) -> Self {
        Self {
            timestamp: Some(sample.timestamp),
            latency: sample.latency,
            status: sample.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_latency() {
        let now = Utc::now();
        assert_eq!(ProbeSample::new(now, Some(12.5)).status, SampleStatus::Ok);
        assert_eq!(ProbeSample::new(now, Some(0.0)).status, SampleStatus::Ok);
        assert_eq!(ProbeSample::new(now, None).status, SampleStatus::Down);

        let negative = ProbeSample::new(now, Some(-1.0));
        assert_eq!(negative.status, SampleStatus::Down);
        assert_eq!(negative.latency, None);

        let nan = ProbeSample::new(now, Some(f64::NAN));
        assert_eq!(nan.status, SampleStatus::Down);
    }

    #[test]
    fn test_database_port_defaults() {
        let target: DatabaseTarget = serde_json::from_str(
            r#"{"host":"db.local","service":"ORCL","user":"scott","password":"tiger"}"#,
        )
        .unwrap();
        assert_eq!(target.port, 1521);
        assert_eq!(target.connect_string(), "//db.local:1521/ORCL");
    }

    #[test]
    fn test_masked_hides_password() {
        let target = DatabaseTarget {
            host: "db.local".to_string(),
            port: 1522,
            service: "ORCL".to_string(),
            user: "scott".to_string(),
            password: "tiger".to_string(),
        };
        let json = serde_json::to_string(&target.masked("db1")).unwrap();
        assert!(json.contains("\"name\":\"db1\""));
        assert!(!json.contains("tiger"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_unknown_latest_serializes_nulls() {
        let json = serde_json::to_value(LatestSample::unknown()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"timestamp": null, "latency": null, "status": "unknown"})
        );
    }
}
