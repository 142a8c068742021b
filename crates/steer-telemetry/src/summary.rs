use crate::error::{Result, TelemetryError};
use reqwest::{Certificate, Client};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Subset of the kubelet `/stats/summary` schema that eviction needs:
/// pod identity plus per-container CPU and working-set usage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub pods: Vec<PodStats>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PodStats {
    #[serde(rename = "podRef")]
    pub pod_ref: PodRef,
    #[serde(default)]
    pub containers: Vec<ContainerStats>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PodRef {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerStats {
    #[serde(default)]
    pub cpu: Option<CpuStats>,
    #[serde(default)]
    pub memory: Option<MemoryStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuStats {
    #[serde(default, rename = "usageNanoCores")]
    pub usage_nano_cores: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryStats {
    #[serde(default, rename = "workingSetBytes")]
    pub working_set_bytes: u64,
}

/// Authenticated HTTPS client for a node's kubelet summary endpoint
pub struct KubeletSummaryClient {
    http: Client,
    token: String,
}

impl KubeletSummaryClient {
    /// Build the client with the ambient service-account token and, when
    /// available, the cluster CA so the kubelet serving cert verifies
    pub fn new(token: String, ca_pem: Option<&[u8]>) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(5));

        if let Some(pem) = ca_pem {
            let cert = Certificate::from_pem(pem)
                .map_err(|e| TelemetryError::client_build(e.to_string()))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| TelemetryError::client_build(e.to_string()))?;

        Ok(Self { http, token })
    }

    /// GET `https://<node_ip>:10250/stats/summary`
    pub async fn fetch(&self, node_ip: &str) -> Result<Summary> {
        let url = format!("https://{}:10250/stats/summary", node_ip);
        debug!("GET {}", url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| TelemetryError::request_failed(&url, e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TelemetryError::unexpected_status(&url, status, body));
        }

        resp.json::<Summary>()
            .await
            .map_err(|e| TelemetryError::schema_invalid(&url, e.to_string()))
    }
}

/// Total CPU (millicores) and working set (MiB) of a pod, summed over its
/// containers. `None` when the summary has no entry for the pod.
pub fn pod_usage(summary: &Summary, name: &str, namespace: &str) -> Option<(f64, f64)> {
    let pod = summary
        .pods
        .iter()
        .find(|p| p.pod_ref.name == name && p.pod_ref.namespace == namespace)?;

    let mut cpu_nano: u64 = 0;
    let mut mem_bytes: u64 = 0;
    for c in &pod.containers {
        cpu_nano += c.cpu.as_ref().map_or(0, |s| s.usage_nano_cores);
        mem_bytes += c.memory.as_ref().map_or(0, |s| s.working_set_bytes);
    }

    let cpu_milli = cpu_nano as f64 / 1_000_000.0;
    let mem_mib = mem_bytes as f64 / (1024.0 * 1024.0);

    Some((cpu_milli, mem_mib))
}
