//! ICMP ping probe using the system `ping` command.
//!
//! Last resort in the fallback chain: covers networks where outbound HTTP and TCP are
//! filtered but echo requests pass.

use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use super::{mean, ProbeError, ProbeMethod};

/// ICMP ping probe.
///
/// One attempt sends `count` echo requests and reports their average.
pub struct PingProbe {
    count: u32,
    reply_timeout: Duration,
    overall_timeout: Duration,
}

impl Default for PingProbe {
    fn default() -> Self {
        Self {
            count: 3,
            reply_timeout: Duration::from_secs(2),
            overall_timeout: Duration::from_secs(10),
        }
    }
}

impl PingProbe {
    /// Command-line arguments for one run. `--` keeps the host from being read as an option.
    fn args(&self, host: &str) -> Vec<String> {
        vec![
            "-c".to_string(),
            self.count.to_string(),
            "-W".to_string(),
            self.reply_timeout.as_secs().max(1).to_string(),
            "--".to_string(),
            host.to_string(),
        ]
    }
}

#[async_trait]
impl ProbeMethod for PingProbe {
    fn name(&self) -> &'static str {
        "ICMP"
    }

    fn attempts(&self) -> usize {
        1
    }

    async fn measure(&self, host: &str, _port: u16) -> Result<f64, ProbeError> {
        let mut command = Command::new("ping");
        command
            .args(self.args(host))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.overall_timeout, command.output())
            .await
            .map_err(|_| ProbeError::Timeout(self.overall_timeout))?
            .map_err(|e| ProbeError::Command(format!("failed to execute ping: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(ProbeError::Command(format!(
                "ping exited with {}: {}",
                output.status,
                stdout.trim()
            )));
        }

        parse_ping_output(&stdout)
            .ok_or_else(|| ProbeError::Parse(format!("no round-trip times in: {}", stdout.trim())))
    }
}

/// Extract the mean round-trip time in milliseconds from `ping` output.
///
/// The summary average is preferred. When no summary is printed, the per-reply
/// `time=` values are averaged instead.
pub fn parse_ping_output(output: &str) -> Option<f64> {
    // "rtt min/avg/max/mdev = a/b/c/d ms" (Linux), "round-trip min/avg/max/stddev = ..." (macOS, BSD)
    static SUMMARY: OnceLock<Regex> = OnceLock::new();
    let summary = SUMMARY.get_or_init(|| {
        Regex::new(r"avg[^=\n]*=\s*([0-9.]+)/([0-9.]+)").expect("summary pattern is valid")
    });

    if let Some(ms) = summary
        .captures(output)
        .and_then(|caps| caps.get(2))
        .and_then(|avg| avg.as_str().parse::<f64>().ok())
    {
        return Some(ms);
    }

    // "Average = 12ms" (Windows)
    static AVERAGE: OnceLock<Regex> = OnceLock::new();
    let average = AVERAGE.get_or_init(|| {
        Regex::new(r"Average\s*=\s*([0-9.]+)\s*ms").expect("average pattern is valid")
    });

    if let Some(ms) = average
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|avg| avg.as_str().parse::<f64>().ok())
    {
        return Some(ms);
    }

    // Per-reply "time=12.3 ms"
    static REPLY: OnceLock<Regex> = OnceLock::new();
    let reply = REPLY.get_or_init(|| {
        Regex::new(r"time[=<](?P<val>[0-9.]+)\s*ms").expect("reply pattern is valid")
    });

    let times: Vec<f64> = reply
        .captures_iter(output)
        .filter_map(|caps| caps.name("val"))
        .filter_map(|val| val.as_str().parse::<f64>().ok())
        .collect();

    mean(&times)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_end_options_before_host() {
        let args = PingProbe::default().args("-f");
        assert_eq!(args, vec!["-c", "3", "-W", "2", "--", "-f"]);
    }

    #[test]
    fn test_parse_linux_summary() {
        let output = r#"PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.
64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=12.3 ms
64 bytes from 8.8.8.8: icmp_seq=2 ttl=117 time=14.1 ms
64 bytes from 8.8.8.8: icmp_seq=3 ttl=117 time=13.0 ms

--- 8.8.8.8 ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
rtt min/avg/max/mdev = 12.300/13.133/14.100/0.740 ms"#;
        let latency = parse_ping_output(output).unwrap();
        assert!((latency - 13.133).abs() < 1e-9);
    }

    #[test]
    fn test_parse_macos_summary() {
        let output = r#"PING google.com (142.250.69.174): 56 data bytes

--- google.com ping statistics ---
3 packets transmitted, 3 packets received, 0.0% packet loss
round-trip min/avg/max/stddev = 17.906/18.250/18.700/0.300 ms"#;
        let latency = parse_ping_output(output).unwrap();
        assert!((latency - 18.25).abs() < 1e-9);
    }

    #[test]
    fn test_parse_windows_average() {
        let output = r#"Reply from 1.1.1.1: bytes=32 time=9ms TTL=57
Reply from 1.1.1.1: bytes=32 time=11ms TTL=57

Approximate round trip times in milli-seconds:
    Minimum = 9ms, Maximum = 11ms, Average = 10ms"#;
        assert_eq!(parse_ping_output(output), Some(10.0));
    }

    #[test]
    fn test_parse_falls_back_to_reply_times() {
        let output = r#"PING host (10.0.0.1) 56(84) bytes of data.
64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=10.0 ms
64 bytes from 10.0.0.1: icmp_seq=2 ttl=64 time=20.0 ms
64 bytes from 10.0.0.1: icmp_seq=3 ttl=64 time<1 ms"#;
        let latency = parse_ping_output(output).unwrap();
        assert!((latency - 31.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_without_times() {
        assert_eq!(parse_ping_output(""), None);
        assert_eq!(
            parse_ping_output("3 packets transmitted, 0 received, 100% packet loss"),
            None
        );
    }
}
