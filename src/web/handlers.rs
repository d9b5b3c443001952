//! HTTP request handlers.

use super::AppState;
use crate::probe::{diagnose, ConnectivityReport};
use crate::store::{
    validate_database, DataStatus, DatabaseTarget, DatabaseView, LatestSample, ProbeSample,
    SampleStatus, StoreError, DEFAULT_DATABASE_PORT,
};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn store_error_response(err: &StoreError) -> Response {
    let status = match err {
        StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        StoreError::AlreadyExists(_) => StatusCode::CONFLICT,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::CapabilityUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_response(status, err.to_string())
}

// ============================================================================
// API: Latency
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LatencyResponse {
    pub hosts: Vec<String>,
    pub data: BTreeMap<String, Vec<ProbeSample>>,
    pub check_interval: u64,
    pub max_history_hours: u64,
}

pub async fn handle_get_latency(State(state): State<AppState>) -> impl IntoResponse {
    let overview = state.store.latency_overview();
    Json(LatencyResponse {
        hosts: overview.hosts,
        data: overview.data,
        check_interval: state.config.check_interval,
        max_history_hours: state.config.retention_hours(),
    })
}

#[derive(Debug, Serialize)]
pub struct HostLatencyResponse {
    pub host: String,
    pub data: Vec<ProbeSample>,
    pub check_interval: u64,
}

pub async fn handle_get_host_latency(
    State(state): State<AppState>,
    Path(host): Path<String>,
) -> impl IntoResponse {
    match state.store.host_history(&host) {
        Some(data) => Json(HostLatencyResponse {
            host,
            data,
            check_interval: state.config.check_interval,
        })
        .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Host not found"),
    }
}

pub async fn handle_get_current(State(state): State<AppState>) -> impl IntoResponse {
    let current: BTreeMap<String, LatestSample> = state.store.current();
    Json(current)
}

// ============================================================================
// API: Hosts
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HostsResponse {
    pub hosts: Vec<String>,
    pub count: usize,
}

pub async fn handle_get_hosts(State(state): State<AppState>) -> impl IntoResponse {
    let hosts = state.store.list_hosts();
    let count = hosts.len();
    Json(HostsResponse { hosts, count })
}

#[derive(Debug, Deserialize)]
pub struct HostRequest {
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HostMutationResponse {
    pub success: bool,
    pub host: String,
    pub message: String,
    pub total_hosts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn requested_host(req: Result<Json<HostRequest>, JsonRejection>) -> Result<String, Response> {
    match req {
        Ok(Json(HostRequest { host: Some(host) })) => Ok(host),
        _ => Err(error_response(
            StatusCode::BAD_REQUEST,
            "Missing host parameter",
        )),
    }
}

pub async fn handle_add_host(
    State(state): State<AppState>,
    req: Result<Json<HostRequest>, JsonRejection>,
) -> impl IntoResponse {
    let host = match requested_host(req) {
        Ok(h) => h,
        Err(resp) => return resp,
    };

    match state.store.add_host(&host) {
        Ok((host, total_hosts)) => Json(HostMutationResponse {
            success: true,
            message: format!("Now monitoring {}", host),
            host,
            total_hosts,
            note: None,
        })
        .into_response(),
        Err(e) => store_error_response(&e),
    }
}

pub async fn handle_remove_host(
    State(state): State<AppState>,
    req: Result<Json<HostRequest>, JsonRejection>,
) -> impl IntoResponse {
    let host = match requested_host(req) {
        Ok(h) => h,
        Err(resp) => return resp,
    };

    match state.store.remove_host(&host) {
        Ok((host, total_hosts)) => Json(HostMutationResponse {
            success: true,
            message: format!("Stopped monitoring {}", host),
            host,
            total_hosts,
            note: Some("Historical data preserved".to_string()),
        })
        .into_response(),
        Err(e) => store_error_response(&e),
    }
}

// ============================================================================
// API: Databases
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DatabasesResponse {
    pub databases: Vec<DatabaseView>,
    pub available: bool,
    pub check_interval: u64,
}

pub async fn handle_get_databases(State(state): State<AppState>) -> impl IntoResponse {
    Json(DatabasesResponse {
        databases: state.store.database_overview(),
        available: state.prober.database_enabled(),
        check_interval: state.config.check_interval,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct DatabaseRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl DatabaseRequest {
    /// Connection descriptor; missing fields are left empty for validation to reject.
    fn target(&self) -> DatabaseTarget {
        DatabaseTarget {
            host: self.host.clone().unwrap_or_default(),
            port: self.port.unwrap_or(DEFAULT_DATABASE_PORT),
            service: self.service.clone().unwrap_or_default(),
            user: self.user.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DatabaseMutationResponse {
    pub success: bool,
    pub name: String,
    pub message: String,
    pub total_databases: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn requested_database(
    req: Result<Json<DatabaseRequest>, JsonRejection>,
) -> Result<DatabaseRequest, Response> {
    req.map(|Json(r)| r)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))
}

pub async fn handle_add_database(
    State(state): State<AppState>,
    req: Result<Json<DatabaseRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match requested_database(req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let Some(name) = req.name.clone() else {
        return error_response(StatusCode::BAD_REQUEST, "Missing name parameter");
    };

    match state.store.add_database(&name, req.target()) {
        Ok((name, total_databases)) => Json(DatabaseMutationResponse {
            success: true,
            message: format!("Now monitoring database {}", name),
            name,
            total_databases,
            note: None,
        })
        .into_response(),
        Err(e) => store_error_response(&e),
    }
}

pub async fn handle_remove_database(
    State(state): State<AppState>,
    req: Result<Json<DatabaseRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match requested_database(req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let Some(name) = req.name else {
        return error_response(StatusCode::BAD_REQUEST, "Missing name parameter");
    };

    match state.store.remove_database(&name) {
        Ok((name, total_databases)) => Json(DatabaseMutationResponse {
            success: true,
            message: format!("Stopped monitoring database {}", name),
            name,
            total_databases,
            note: Some("Historical data preserved".to_string()),
        })
        .into_response(),
        Err(e) => store_error_response(&e),
    }
}

#[derive(Debug, Serialize)]
pub struct DatabaseTestResponse {
    pub success: bool,
    pub latency: Option<f64>,
    pub status: SampleStatus,
}

/// Probe a database once without registering it.
pub async fn handle_test_database(
    State(state): State<AppState>,
    req: Result<Json<DatabaseRequest>, JsonRejection>,
) -> impl IntoResponse {
    if !state.prober.database_enabled() {
        return store_error_response(&StoreError::CapabilityUnavailable);
    }

    let req = match requested_database(req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let target = match validate_database(req.target()) {
        Ok(t) => t,
        Err(e) => return store_error_response(&e),
    };

    let sample = ProbeSample::new(Utc::now(), state.prober.probe_database(&target).await);
    Json(DatabaseTestResponse {
        success: sample.latency.is_some(),
        latency: sample.latency,
        status: sample.status,
    })
    .into_response()
}

// ============================================================================
// Operations
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
    })
}

#[derive(Debug, Serialize)]
pub struct DebugResponse {
    pub timestamp: DateTime<Utc>,
    pub monitored_hosts: Vec<String>,
    pub tcp_port: u16,
    pub check_interval: u64,
    pub max_history: usize,
    pub database_available: bool,
    pub connectivity_tests: BTreeMap<String, ConnectivityReport>,
    pub data_status: BTreeMap<String, DataStatus>,
}

/// Run connectivity checks against every monitored host.
pub async fn handle_debug(State(state): State<AppState>) -> impl IntoResponse {
    let hosts = state.store.snapshot().hosts;
    let port = state.prober.port();

    let mut connectivity_tests = BTreeMap::new();
    for host in &hosts {
        connectivity_tests.insert(host.clone(), diagnose(host, port).await);
    }

    Json(DebugResponse {
        timestamp: Utc::now(),
        monitored_hosts: hosts,
        tcp_port: port,
        check_interval: state.config.check_interval,
        max_history: state.store.max_history(),
        database_available: state.prober.database_enabled(),
        connectivity_tests,
        data_status: state.store.data_status(),
    })
}
