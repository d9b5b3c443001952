//! HTTP probe implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{ProbeError, ProbeMethod};

/// Per-request timeout for the HTTP probe.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// URL probed for a host: HTTPS when the probe port is 443, plain HTTP otherwise.
pub fn probe_url(host: &str, port: u16) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        return host.to_string();
    }
    let scheme = if port == 443 { "https" } else { "http" };
    format!("{}://{}", scheme, host)
}

/// HEAD request probe. Certificates are not validated: this measures reachability only.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(Self { client })
    }

    /// Send one HEAD request. Returns the status code and round-trip time in milliseconds.
    pub async fn head(&self, host: &str, port: u16) -> Result<(u16, f64), ProbeError> {
        let url = probe_url(host, port);
        let start = Instant::now();

        let response = self.client.head(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(HTTP_TIMEOUT)
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;

        let elapsed = start.elapsed().as_secs_f64() * 1000.0;
        Ok((response.status().as_u16(), elapsed))
    }
}

#[async_trait]
impl ProbeMethod for HttpProbe {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn measure(&self, host: &str, port: u16) -> Result<f64, ProbeError> {
        let (status, elapsed) = self.head(host, port).await?;
        // Error statuses count as a failed attempt
        if status >= 400 {
            return Err(ProbeError::Status(status));
        }
        Ok(elapsed)
    }
}
