use crate::error::{Result, TelemetryError};
use reqwest::Client;
use std::net::IpAddr;
use std::time::Duration;
use steer_core::{ProberConfig, ScoreVector};
use tracing::debug;

/// Client for the per-node probe daemon's score endpoint
pub struct ProbeClient {
    http: Client,
    cfg: ProberConfig,
}

impl ProbeClient {
    pub fn new(cfg: ProberConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| TelemetryError::client_build(e.to_string()))?;
        Ok(Self { http, cfg })
    }

    /// Fetch the score vectors published by the probe running on `node`.
    ///
    /// The probe on any one node reports scores for every node it has
    /// measured, so a single fetch covers the cluster. Scores are clamped
    /// into [0, 1] on ingestion.
    pub async fn fetch_scores(&self, node: &str) -> Result<Vec<ScoreVector>> {
        let addr = self.resolve_node_addr(node).await;
        let url = format!(
            "http://{}:{}/{}",
            addr,
            self.cfg.port,
            self.cfg.endpoint.trim_start_matches('/')
        );
        debug!("Fetching probe scores from {} ({})", url, node);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| TelemetryError::request_failed(&url, e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TelemetryError::unexpected_status(&url, status, body));
        }

        let scores = resp
            .json::<Vec<ScoreVector>>()
            .await
            .map_err(|e| TelemetryError::schema_invalid(&url, e.to_string()))?;

        let scores: Vec<ScoreVector> = scores.into_iter().map(ScoreVector::clamped).collect();

        for s in &scores {
            debug!(
                "Probe score for {}: lat={:.3} cpu={:.3} mem={:.3}",
                s.hostname, s.latency, s.cpu, s.memory
            );
        }

        Ok(scores)
    }

    /// Resolve a node hostname to an IP, falling back to the raw name when
    /// resolution fails (the name may already be routable)
    async fn resolve_node_addr(&self, node: &str) -> String {
        if node.parse::<IpAddr>().is_ok() {
            return node.to_string();
        }

        match tokio::net::lookup_host((node, self.cfg.port)).await {
            Ok(mut addrs) => match addrs.next() {
                Some(addr) => addr.ip().to_string(),
                None => node.to_string(),
            },
            Err(_) => node.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> ProbeClient {
        ProbeClient::new(ProberConfig {
            endpoint: "scores".to_string(),
            port: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_ip_passthrough() {
        let client = test_client();
        assert_eq!(client.resolve_node_addr("10.0.0.7").await, "10.0.0.7");
    }

    #[tokio::test]
    async fn test_resolve_unknown_host_falls_back_to_name() {
        let client = test_client();
        let addr = client
            .resolve_node_addr("steer-test-no-such-host.invalid")
            .await;
        assert_eq!(addr, "steer-test-no-such-host.invalid");
    }

    #[tokio::test]
    async fn test_fetch_scores_unreachable_probe_errors() {
        let client = test_client();

        // No probe listening on port 1; the caller is expected to treat this
        // as a warning and keep its previous cache
        let result = client.fetch_scores("127.0.0.1").await;
        assert!(result.is_err());
    }
}
