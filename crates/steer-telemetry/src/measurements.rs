use crate::error::{Result, TelemetryError};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use steer_core::MeasurementsConfig;
use tracing::{debug, info, warn};

/// Client for the measurements store (InfluxDB 2.x query API).
///
/// All three queries derive a per-minute request rate per node from the
/// monotonic `http_packet.counter` series over the last two minutes.
pub struct MeasurementsClient {
    http: Client,
    cfg: MeasurementsConfig,
}

impl MeasurementsClient {
    pub fn new(cfg: MeasurementsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TelemetryError::client_build(e.to_string()))?;
        Ok(Self { http, cfg })
    }

    /// Node with the highest derived request rate over the window, or `None`
    /// when the store has no usable rows
    pub async fn top_node(&self) -> Result<Option<(String, f64)>> {
        let flux = format!(
            r#"from(bucket: "{bucket}")
  |> range(start: -2m)
  |> filter(fn: (r) => r["_measurement"] == "http_packet")
  |> filter(fn: (r) => r["_field"] == "counter")
  |> aggregateWindow(every: 1m, fn: last, createEmpty: false)
  |> derivative(unit: 1m, nonNegative: true)
  |> group(columns: ["node_name"])
  |> sum(column: "_value")
  |> group()
  |> sort(columns: ["_value"], desc: true)
  |> limit(n: 1)
"#,
            bucket = self.cfg.bucket
        );

        let rows = self.query(flux).await?;

        let mut top: Option<(String, f64)> = None;
        for row in rows {
            let (Some(node), Some(value)) = (row.node, row.value) else {
                continue;
            };
            if node.is_empty() || !value.is_finite() || value == 0.0 {
                debug!("Skipping top-node row {}: invalid or zero rate", node);
                continue;
            }
            top = Some((node, value));
        }

        match &top {
            Some((node, rate)) => info!("Top node = {} ({:.2} req/min)", node, rate),
            None => warn!("No traffic rows in the recent window"),
        }

        Ok(top)
    }

    /// Per-node request rate (req/min). Rows with an empty node name or a
    /// non-finite, negative or zero rate are discarded at ingestion.
    pub async fn traffic_by_node(&self) -> Result<HashMap<String, f64>> {
        let flux = format!(
            r#"from(bucket: "{bucket}")
  |> range(start: -2m)
  |> filter(fn: (r) => r["_measurement"] == "http_packet")
  |> filter(fn: (r) => r["_field"] == "counter")
  |> aggregateWindow(every: 1m, fn: last, createEmpty: false)
  |> derivative(unit: 1m, nonNegative: true)
  |> group(columns: ["node_name"])
"#,
            bucket = self.cfg.bucket
        );

        let rows = self.query(flux).await?;

        let mut traffic = HashMap::new();
        for row in rows {
            let (Some(node), Some(value)) = (row.node, row.value) else {
                continue;
            };
            if node.is_empty() || !value.is_finite() || value <= 0.0 {
                debug!("Skipping traffic row {}: unusable rate {:?}", node, value);
                continue;
            }
            traffic.insert(node, value);
        }

        if traffic.is_empty() {
            warn!("No traffic data found; idle cluster or empty measurement");
        } else {
            debug!("Traffic map covers {} nodes", traffic.len());
        }

        Ok(traffic)
    }

    /// Per-node rate divided by the cluster-wide maximum, in [0, 1]
    pub async fn normalized_traffic(&self) -> Result<HashMap<String, f64>> {
        Ok(normalize(self.traffic_by_node().await?))
    }

    /// POST a Flux script to the v2 query API and decode the annotated CSV
    async fn query(&self, flux: String) -> Result<Vec<FluxRow>> {
        let url = format!("{}/api/v2/query", self.cfg.host.trim_end_matches('/'));
        debug!("POST {} (org {})", url, self.cfg.org);

        let resp = self
            .http
            .post(&url)
            .query(&[("org", self.cfg.org.as_str())])
            .header("Authorization", format!("Token {}", self.cfg.token))
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "application/csv")
            .body(flux)
            .send()
            .await
            .map_err(|e| TelemetryError::request_failed(&url, e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TelemetryError::unexpected_status(&url, status, body));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| TelemetryError::request_failed(&url, e.to_string()))?;

        Ok(parse_annotated_csv(&body))
    }
}

/// Normalise a traffic map against its maximum; empty in, empty out
pub fn normalize(traffic: HashMap<String, f64>) -> HashMap<String, f64> {
    let max = traffic.values().copied().fold(0.0_f64, f64::max);
    if max == 0.0 {
        return HashMap::new();
    }

    traffic
        .into_iter()
        .map(|(node, value)| {
            let mut n = value / max;
            if !n.is_finite() {
                n = 0.0;
            }
            (node, n.clamp(0.0, 1.0))
        })
        .collect()
}

/// One decoded result row: the node tag and the `_value` column
#[derive(Debug, Clone, PartialEq)]
struct FluxRow {
    node: Option<String>,
    value: Option<f64>,
}

/// Decode InfluxDB's annotated CSV.
///
/// Annotation lines start with `#`; each table is preceded by a header row
/// naming its columns (always including `_value`). The node tag may appear
/// as `node_name`, `node` or `host` depending on the telegraf config.
fn parse_annotated_csv(body: &str) -> Vec<FluxRow> {
    let mut rows = Vec::new();
    let mut header: Option<Vec<String>> = None;

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            // table boundary; the next non-annotation line is a header
            header = None;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();

        match &header {
            None => {
                header = Some(fields.iter().map(|f| f.to_string()).collect());
            }
            Some(cols) => {
                let lookup = |name: &str| -> Option<&str> {
                    cols.iter()
                        .position(|c| c == name)
                        .and_then(|i| fields.get(i).copied())
                        .filter(|v| !v.is_empty())
                };

                let node = lookup("node_name")
                    .or_else(|| lookup("node"))
                    .or_else(|| lookup("host"))
                    .map(|s| s.to_string());
                let value = lookup("_value").and_then(|v| v.parse::<f64>().ok());

                rows.push(FluxRow { node, value });
            }
        }
    }

    rows
}
