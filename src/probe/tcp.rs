//! TCP connect probe implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{ProbeError, ProbeMethod};

/// Connect timeout for the TCP probe.
pub const TCP_TIMEOUT: Duration = Duration::from_secs(3);

/// Measures the time to open a TCP connection. The connection is closed immediately.
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Open and drop one connection, returning connect time in milliseconds.
    pub async fn connect(&self, host: &str, port: u16) -> Result<f64, ProbeError> {
        let start = Instant::now();

        let stream = timeout(self.timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
            .map_err(|e| ProbeError::Network(format!("connect to {}:{} failed: {}", host, port, e)))?;

        let elapsed = start.elapsed().as_secs_f64() * 1000.0;
        drop(stream);
        Ok(elapsed)
    }
}

#[async_trait]
impl ProbeMethod for TcpProbe {
    fn name(&self) -> &'static str {
        "TCP"
    }

    async fn measure(&self, host: &str, port: u16) -> Result<f64, ProbeError> {
        self.connect(host, port).await
    }
}
