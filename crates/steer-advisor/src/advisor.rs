use crate::cache::ScoredNodeCache;
use steer_cluster::ClusterClient;
use steer_core::ScoringConfig;
use steer_telemetry::{MeasurementsClient, ProbeClient};
use tracing::{info, warn};

/// The placement advisor: one per process, handed as shared state to every
/// HTTP route registration.
///
/// Owns the scored-node cache; all refreshes run outside the cache lock and
/// every failure degrades to the previously cached data.
pub struct Advisor {
    pub(crate) cluster: ClusterClient,
    pub(crate) measurements: MeasurementsClient,
    pub(crate) prober: ProbeClient,
    pub(crate) cfg: ScoringConfig,
    pub(crate) cache: ScoredNodeCache,
}

impl Advisor {
    pub fn new(
        cluster: ClusterClient,
        measurements: MeasurementsClient,
        prober: ProbeClient,
        cfg: ScoringConfig,
    ) -> Self {
        let cache = ScoredNodeCache::new(cfg.penalty_ttl);
        Self {
            cluster,
            measurements,
            prober,
            cfg,
            cache,
        }
    }

    pub fn cache(&self) -> &ScoredNodeCache {
        &self.cache
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.cfg
    }

    /// Refresh the scored-node cache from the probe on the current top
    /// node. Best-effort: every failure is a warning and the cache keeps
    /// its previous values.
    pub async fn refresh_prober_data(&self) {
        let top = match self.measurements.top_node().await {
            Ok(Some((node, rate))) => {
                info!("Refreshing prober data from {} ({:.2} req/min)", node, rate);
                node
            }
            Ok(None) => {
                warn!("No top node in measurements; keeping cached prober data");
                return;
            }
            Err(e) => {
                warn!("Failed to query top node: {}", e);
                return;
            }
        };

        let scores = match self.prober.fetch_scores(&top).await {
            Ok(scores) => scores,
            Err(e) => {
                warn!("Failed to fetch prober data from {}: {}", top, e);
                return;
            }
        };

        let count = scores.len();
        self.cache.upsert_scores(scores);
        info!("Updated prober data from {} ({} nodes)", top, count);
    }

    /// Refresh the raw and normalised traffic maps. Both queries must
    /// succeed before either cached map changes.
    pub async fn refresh_traffic_data(&self) {
        let traffic = match self.measurements.traffic_by_node().await {
            Ok(map) => map,
            Err(e) => {
                warn!("Failed to query traffic map: {}", e);
                return;
            }
        };

        let norm = match self.measurements.normalized_traffic().await {
            Ok(map) => map,
            Err(e) => {
                warn!("Failed to query normalised traffic: {}", e);
                return;
            }
        };

        let entries = traffic.len();
        self.cache.replace_traffic(traffic, norm);
        info!("Updated traffic map ({} entries) + normalised traffic", entries);
    }

    /// Penalise the prioritize winner so the next placement burst does not
    /// pile onto the same node
    pub(crate) fn penalize_winner(&self, node: &str) {
        match self.cache.apply_penalty(node, &self.cfg) {
            Some((cpu, memory)) => {
                info!(
                    "Penalised winner {} (cpu -> {:.2}, memory -> {:.2})",
                    node, cpu, memory
                );
            }
            None => {
                warn!("Cannot apply penalty, node {} not in cache", node);
            }
        }
    }
}
