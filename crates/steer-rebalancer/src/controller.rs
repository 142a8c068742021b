use crate::Result;
use steer_cluster::ClusterClient;
use steer_core::{RebalancerConfig, ScoringConfig};
use steer_telemetry::{KubeletSummaryClient, MeasurementsClient, ProbeClient};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Traffic-shift driven eviction controller.
///
/// Keeps no state besides the previously observed top-traffic node; every
/// cycle re-queries the measurements store and the probe directly instead
/// of sharing the advisor's cache.
pub struct Rebalancer {
    pub(crate) cluster: ClusterClient,
    pub(crate) measurements: MeasurementsClient,
    pub(crate) prober: ProbeClient,
    pub(crate) kubelet: KubeletSummaryClient,
    pub(crate) namespace: String,
    pub(crate) scoring: ScoringConfig,
    pub(crate) cfg: RebalancerConfig,
    pub(crate) prev_top: Option<String>,
}

impl Rebalancer {
    /// Create a new rebalancer
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cluster: ClusterClient,
        measurements: MeasurementsClient,
        prober: ProbeClient,
        kubelet: KubeletSummaryClient,
        namespace: String,
        scoring: ScoringConfig,
        cfg: RebalancerConfig,
    ) -> Self {
        Self {
            cluster,
            measurements,
            prober,
            kubelet,
            namespace,
            scoring,
            cfg,
            prev_top: None,
        }
    }

    /// Run the evaluation loop until the token is cancelled
    pub async fn run(mut self, token: CancellationToken) -> Result<()> {
        info!("Starting rebalancer (interval: {:?})", self.cfg.interval);

        let mut interval = tokio::time::interval(self.cfg.interval);
        // Consume the first immediate tick — give traffic a full window
        interval.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Rebalancer shutting down");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.evaluate_cycle().await;
                }
            }
        }
    }
}
