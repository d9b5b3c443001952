//! One-shot connectivity checks for troubleshooting.

use serde::Serialize;

use super::{HttpProbe, TcpProbe, HTTP_TIMEOUT, TCP_TIMEOUT};

/// Outcome of each connectivity check, as human-readable `OK - ...` / `FAILED - ...` lines.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityReport {
    pub dns_test: String,
    pub http_test: String,
    pub tcp_test: String,
}

/// Check DNS resolution, an HTTP HEAD request and a TCP connect to `host`.
pub async fn diagnose(host: &str, port: u16) -> ConnectivityReport {
    let dns_test = match tokio::net::lookup_host((host, 0)).await {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => format!("OK - Resolved to {}", addr.ip()),
            None => "FAILED - No addresses found".to_string(),
        },
        Err(e) => format!("FAILED - {}", e),
    };

    let http_test = match HttpProbe::new(HTTP_TIMEOUT) {
        Ok(probe) => match probe.head(host, port).await {
            Ok((status, _)) => format!("OK - Status {}", status),
            Err(e) => format!("FAILED - {}", e),
        },
        Err(e) => format!("FAILED - {}", e),
    };

    let tcp_test = match TcpProbe::new(TCP_TIMEOUT).connect(host, port).await {
        Ok(_) => format!("OK - Connected to port {}", port),
        Err(e) => format!("FAILED - {}", e),
    };

    ConnectivityReport {
        dns_test,
        http_test,
        tcp_test,
    }
}
