use crate::controller::Rebalancer;
use std::collections::HashMap;
use steer_core::{score_node, ScoreVector, ScoringConfig};
use tracing::{debug, info, warn};

/// A node and its placement score, used for ascending eviction ranking
#[derive(Debug, Clone, PartialEq)]
pub struct NodeScore {
    pub name: String,
    pub score: i64,
}

/// Outcome of comparing the current top-traffic node with the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShiftDecision {
    /// Same hotspot as last cycle; nothing to rebalance
    Unchanged,
    /// First successful observation ever; seed the state, do not evict
    FirstObservation,
    /// The hotspot moved; run the eviction walk
    Shifted,
}

pub(crate) fn detect_shift(prev: Option<&str>, current: &str) -> ShiftDecision {
    match prev {
        None => ShiftDecision::FirstObservation,
        Some(p) if p == current => ShiftDecision::Unchanged,
        Some(_) => ShiftDecision::Shifted,
    }
}

/// Score every probed node and sort ascending, worst candidate first
pub fn rank_nodes(
    scores: &[ScoreVector],
    traffic_norm: &HashMap<String, f64>,
    cfg: &ScoringConfig,
) -> Vec<NodeScore> {
    let score_map: HashMap<String, ScoreVector> = scores
        .iter()
        .map(|s| (s.hostname.clone(), s.clone()))
        .collect();

    let mut ranked: Vec<NodeScore> = scores
        .iter()
        .map(|s| {
            let score = score_node(&s.hostname, &score_map, traffic_norm, cfg);
            debug!(
                "Node {} score={} (lat={:.3} cpu={:.3} mem={:.3} traffic={:.3})",
                s.hostname,
                score,
                s.latency,
                s.cpu,
                s.memory,
                traffic_norm.get(&s.hostname).copied().unwrap_or(0.0)
            );
            NodeScore {
                name: s.hostname.clone(),
                score,
            }
        })
        .collect();

    ranked.sort_by(|a, b| a.score.cmp(&b.score));
    ranked
}

impl Rebalancer {
    /// One evaluation cycle: detect a traffic shift, rank the nodes, evict
    /// one idle pod from the worst-ranked node that has one.
    ///
    /// Every upstream failure skips the cycle; `prev_top` only advances
    /// once the eviction walk has been reached, so a failed probe fetch
    /// after a detected shift is retried next tick.
    pub(crate) async fn evaluate_cycle(&mut self) {
        let (top, rate) = match self.measurements.top_node().await {
            Ok(Some(top)) => top,
            Ok(None) => {
                info!("No traffic data available, skipping rebalancing");
                return;
            }
            Err(e) => {
                warn!("Failed to query top node: {}", e);
                return;
            }
        };

        match detect_shift(self.prev_top.as_deref(), &top) {
            ShiftDecision::Unchanged => {
                info!(
                    "Top node unchanged: {} ({:.2} req/min), no action needed",
                    top, rate
                );
                return;
            }
            ShiftDecision::FirstObservation => {
                info!("First observed top node: {} ({:.2} req/min)", top, rate);
                self.prev_top = Some(top);
                return;
            }
            ShiftDecision::Shifted => {
                warn!(
                    "Traffic shift detected: {} -> {}",
                    self.prev_top.as_deref().unwrap_or(""),
                    top
                );
            }
        }

        let scores = match self.prober.fetch_scores(&top).await {
            Ok(scores) if !scores.is_empty() => scores,
            Ok(_) => {
                warn!("Probe on {} returned no scores, retrying next cycle", top);
                return;
            }
            Err(e) => {
                warn!("Failed to fetch prober data from {}: {}", top, e);
                return;
            }
        };

        let traffic_norm = match self.measurements.normalized_traffic().await {
            Ok(map) => map,
            Err(e) => {
                warn!("Failed to fetch normalised traffic: {}", e);
                HashMap::new()
            }
        };

        let ranked = rank_nodes(&scores, &traffic_norm, &self.scoring);

        info!("Node ranking (ascending by score):");
        for ns in &ranked {
            info!("  - {}: score={}", ns.name, ns.score);
        }

        let mut evicted = false;
        for ns in &ranked {
            debug!("Trying candidate node for eviction: {} (score={})", ns.name, ns.score);

            match self.evict_idle_pod(&ns.name).await {
                Ok(true) => {
                    info!("Evicted idle pod from node {}", ns.name);
                    evicted = true;
                    break;
                }
                Ok(false) => {
                    info!("No idle pod to evict on node {}, trying next candidate", ns.name);
                }
                Err(e) => {
                    warn!(
                        "Eviction attempt failed on node {}, trying next candidate: {}",
                        ns.name, e
                    );
                }
            }
        }

        if !evicted {
            warn!("No idle pod found on any low-score node, skipping this cycle");
        }

        // The shift has been handled, eviction or not
        self.prev_top = Some(top);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use steer_cluster::{ClusterAuth, ClusterClient};
    use steer_core::{MeasurementsConfig, ProberConfig, RebalancerConfig};
    use steer_telemetry::{KubeletSummaryClient, MeasurementsClient, ProbeClient};

    fn test_scoring() -> ScoringConfig {
        ScoringConfig {
            weight_latency: 0.4,
            weight_cpu: 0.3,
            weight_memory: 0.2,
            weight_traffic: 0.1,
            latency_threshold: 0.3,
            cpu_threshold: 0.2,
            mem_threshold: 0.2,
            penalty_ttl: Duration::from_secs(15),
            vm_penalty_cpu: 0.1,
            rpi_penalty_cpu: 0.05,
            vm_penalty_mem: 0.1,
            rpi_penalty_mem: 0.05,
        }
    }

    fn test_rebalancer() -> Rebalancer {
        let cluster =
            ClusterClient::new(&ClusterAuth::from_parts("https://127.0.0.1:1", "tok", None))
                .unwrap();
        let measurements = MeasurementsClient::new(MeasurementsConfig {
            host: "http://127.0.0.1:1".to_string(),
            token: "t".to_string(),
            org: "o".to_string(),
            bucket: "b".to_string(),
        })
        .unwrap();
        let prober = ProbeClient::new(ProberConfig {
            endpoint: "scores".to_string(),
            port: 1,
        })
        .unwrap();
        let kubelet = KubeletSummaryClient::new("tok".to_string(), None).unwrap();

        Rebalancer::new(
            cluster,
            measurements,
            prober,
            kubelet,
            "default".to_string(),
            test_scoring(),
            RebalancerConfig {
                interval: Duration::from_secs(30),
                idle_cpu_millis: 50.0,
                idle_mem_mib: 100.0,
            },
        )
    }

    #[test]
    fn test_detect_shift() {
        assert_eq!(detect_shift(None, "rpi-1"), ShiftDecision::FirstObservation);
        assert_eq!(detect_shift(Some("rpi-1"), "rpi-1"), ShiftDecision::Unchanged);
        assert_eq!(detect_shift(Some("rpi-1"), "rpi-2"), ShiftDecision::Shifted);
    }

    #[test]
    fn test_rank_nodes_ascending() {
        let scores = vec![
            ScoreVector::new("rpi-1", 0.9, 0.2, 0.2),
            ScoreVector::new("rpi-2", 0.1, 0.9, 0.9),
        ];
        let mut traffic_norm = HashMap::new();
        traffic_norm.insert("rpi-1".to_string(), 1.0);
        traffic_norm.insert("rpi-2".to_string(), 0.3);

        let ranked = rank_nodes(&scores, &traffic_norm, &test_scoring());

        // rpi-2: 0.4*0.1 + 0.3*0.9 + 0.2*0.9 + 0.1*0.3 = 0.52 -> 52
        // rpi-1: 0.4*0.9 + 0.3*0.2 + 0.2*0.2 + 0.1*1.0 = 0.56 -> 56
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].name, "rpi-2");
        assert_eq!(ranked[0].score, 52);
        assert_eq!(ranked[1].name, "rpi-1");
        assert_eq!(ranked[1].score, 56);
    }

    #[test]
    fn test_rank_nodes_empty() {
        let ranked = rank_nodes(&[], &HashMap::new(), &test_scoring());
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn test_cycle_with_unreachable_store_keeps_state() {
        let mut rebalancer = test_rebalancer();

        // The top-node query fails; the cycle must be a no-op
        rebalancer.evaluate_cycle().await;
        assert!(rebalancer.prev_top.is_none());
    }

    #[tokio::test]
    async fn test_cycle_keeps_prev_top_when_probe_unreachable() {
        let mut rebalancer = test_rebalancer();
        rebalancer.prev_top = Some("rpi-1".to_string());

        // Even if a shift were detected, the probe fetch would fail and the
        // cycle must not advance the previous top. Here the measurements
        // query itself fails first; either way the state is untouched.
        rebalancer.evaluate_cycle().await;
        assert_eq!(rebalancer.prev_top.as_deref(), Some("rpi-1"));
    }
}
